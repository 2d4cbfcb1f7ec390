//! The "TIME" Engine - deferred one-shot effects.
//!
//! Timer callbacks never hold a reference into the grid. A deferred effect is
//! plain data: the cell it targets plus the id it expects to find there. When
//! it fires, the propagation engine re-validates it against the current store
//! and drops it if the world has moved on.
//!
//! ```text
//!   tick N                          tick N + latency
//!   repeater sees back=on  ──push──►  EffectQueue  ──pop──►  apply_effect
//!                                   (due, seq) min-heap       (re-validate)
//! ```

use crate::gridlogic_space::{Coord, InstanceId};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Duration;

/// A state change scheduled to happen after a fixed latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeferredEffect {
    /// End of a switch's settle delay
    InitializeSwitch { id: InstanceId },

    /// A repeater's output reaching its front cell
    RepeaterPulse {
        /// Repeater that emitted the pulse
        source: InstanceId,
        /// Front cell at scheduling time
        target: Coord,
        /// Occupant of `target` at scheduling time, if any
        expected: Option<InstanceId>,
    },
}

/// Which configured latency an effect waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectDelay {
    SwitchInit,
    Repeater,
}

impl DeferredEffect {
    pub fn delay(&self) -> EffectDelay {
        match self {
            DeferredEffect::InitializeSwitch { .. } => EffectDelay::SwitchInit,
            DeferredEffect::RepeaterPulse { .. } => EffectDelay::Repeater,
        }
    }
}

/// Result of firing an effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectOutcome {
    /// The effect changed (or re-asserted) state
    Applied,
    /// Target gone or replaced since scheduling
    Stale,
    /// Target exists but does not react to this effect
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Scheduled {
    due: Duration,
    seq: u64,
    effect: DeferredEffect,
}

// Reversed so the BinaryHeap pops the earliest (due, seq) first.
impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Pending deferred effects ordered by deadline.
///
/// Effects with equal deadlines fire in the order they were pushed.
#[derive(Debug, Default)]
pub struct EffectQueue {
    heap: BinaryHeap<Scheduled>,
    next_seq: u64,
}

impl EffectQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, due: Duration, effect: DeferredEffect) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Scheduled { due, seq, effect });
    }

    /// Deadline of the earliest pending effect.
    pub fn peek_due(&self) -> Option<Duration> {
        self.heap.peek().map(|s| s.due)
    }

    /// Pops the earliest effect if it is due at `now`.
    pub fn pop_due(&mut self, now: Duration) -> Option<(Duration, DeferredEffect)> {
        if self.peek_due()? > now {
            return None;
        }
        self.heap.pop().map(|s| (s.due, s.effect))
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init(id: u64) -> DeferredEffect {
        DeferredEffect::InitializeSwitch { id: InstanceId(id) }
    }

    #[test]
    fn test_pops_in_deadline_order() {
        let mut queue = EffectQueue::new();
        queue.push(Duration::from_millis(300), init(3));
        queue.push(Duration::from_millis(100), init(1));
        queue.push(Duration::from_millis(200), init(2));

        let now = Duration::from_secs(1);
        let order: Vec<_> = std::iter::from_fn(|| queue.pop_due(now))
            .map(|(_, effect)| effect)
            .collect();

        assert_eq!(order, vec![init(1), init(2), init(3)]);
    }

    #[test]
    fn test_ties_fire_in_push_order() {
        let mut queue = EffectQueue::new();
        let due = Duration::from_millis(50);
        for id in 0..5 {
            queue.push(due, init(id));
        }

        for id in 0..5 {
            assert_eq!(queue.pop_due(due), Some((due, init(id))));
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn test_not_due_yet() {
        let mut queue = EffectQueue::new();
        queue.push(Duration::from_millis(150), init(0));

        assert_eq!(queue.pop_due(Duration::from_millis(149)), None);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.peek_due(), Some(Duration::from_millis(150)));
        assert!(queue.pop_due(Duration::from_millis(150)).is_some());
    }

    #[test]
    fn test_effect_delay_mapping() {
        let pulse = DeferredEffect::RepeaterPulse {
            source: InstanceId(0),
            target: Coord::new(1, 0),
            expected: None,
        };
        assert_eq!(pulse.delay(), EffectDelay::Repeater);
        assert_eq!(init(0).delay(), EffectDelay::SwitchInit);
    }
}
