//! The Propagation Engine - one tick of the logic sandbox.
//!
//! A tick runs one pass per component kind, always in [`KIND_ORDER`]:
//!
//! ```text
//!   Switch ──► Cable ──► LED ──► Comparator ──► Repeater
//!   (inverters   (flood fill   (sense     (inhibit /      (latch + schedule
//!    settle)      from sources) settled)   inject cable)   delayed pulse)
//! ```
//!
//! Inside a pass every new value is computed from the state as it stood when
//! the pass began and then committed in one go, so the result never depends
//! on store iteration order.

use crate::gridlogic_kinds::{ComponentKind, Part};
use crate::gridlogic_space::{Coord, Direction, GridStore, InstanceId};
use crate::gridlogic_time::{DeferredEffect, EffectOutcome};
use crate::metrics::TickReport;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{debug, trace, warn};

/// Order in which kinds are evaluated within a tick.
///
/// Switches settle before cables flood from them, LEDs sense the settled
/// network, comparators and repeaters read it last.
pub const KIND_ORDER: [ComponentKind; 5] = [
    ComponentKind::Switch,
    ComponentKind::Cable,
    ComponentKind::Led,
    ComponentKind::Comparator,
    ComponentKind::Repeater,
];

/// Tick-driven activation engine.
#[derive(Debug, Default)]
pub struct PropagationEngine {
    /// Cables a repeater pulse landed on since the last flood fill, keyed by
    /// cell with the id that was hit. Each seeds the next fill only while the
    /// same cable still sits there.
    injected: HashMap<Coord, InstanceId>,

    /// Passes run so far
    tick: u64,
}

impl PropagationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of passes run so far.
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Pulsed cables waiting to seed the next flood fill.
    pub fn injected(&self) -> &HashMap<Coord, InstanceId> {
        &self.injected
    }

    /// Drops any pending seed held by `id` (deleted or moved).
    pub fn forget(&mut self, id: InstanceId) {
        self.injected.retain(|_, hit| *hit != id);
    }

    /// Forgets pending injections (grid reset).
    pub fn clear(&mut self) {
        self.injected.clear();
    }

    /// Runs one full pass over the store.
    ///
    /// Returns the report and the deferred effects the pass scheduled.
    pub fn tick(&mut self, store: &mut GridStore) -> (TickReport, Vec<DeferredEffect>) {
        self.tick += 1;
        store.latch_previous();

        let mut effects = Vec::new();
        for kind in KIND_ORDER {
            match kind {
                ComponentKind::Switch => self.update_switches(store),
                ComponentKind::Cable => self.update_cables(store),
                ComponentKind::Led => self.update_leds(store),
                ComponentKind::Comparator => self.update_comparators(store),
                ComponentKind::Repeater => self.update_repeaters(store, &mut effects),
                // buttons only change through toggle
                ComponentKind::Button => {}
            }
        }

        let report = TickReport::collect(self.tick, store, effects.len());
        debug!(
            tick = report.tick,
            changed = report.changed,
            effects = report.effects_scheduled,
            "propagation pass"
        );
        (report, effects)
    }

    /// Switch: on unless the west neighbor is on. Uninitialized switches hold.
    fn update_switches(&mut self, store: &mut GridStore) {
        let updates: Vec<(InstanceId, bool)> = store
            .iter()
            .filter(|s| s.kind() == ComponentKind::Switch && s.is_initialized())
            .map(|s| (s.id(), !store.is_active_toward(s.position(), Direction::West)))
            .collect();

        commit(store, &updates);
    }

    /// Cable: breadth-first reachability from every active source, the
    /// front cable of every active comparator and still-valid pulse seeds.
    fn update_cables(&mut self, store: &mut GridStore) {
        let cables = store.positions_of(ComponentKind::Cable);
        let mut reachable: HashSet<Coord> = HashSet::new();
        let mut frontier: VecDeque<Coord> = VecDeque::new();

        for source in store.iter().filter(|i| i.is_active()) {
            for dir in source.kind().source_directions() {
                if let Some(next) = source.position().step(*dir) {
                    if cables.contains(&next) && reachable.insert(next) {
                        frontier.push_back(next);
                    }
                }
            }
        }

        let driven = store
            .iter()
            .filter(|c| c.kind() == ComponentKind::Comparator && c.is_active())
            .filter_map(|c| c.position().step(Direction::East));
        for front in driven {
            if cables.contains(&front) && reachable.insert(front) {
                frontier.push_back(front);
            }
        }

        for (seed, hit) in self.injected.drain() {
            if store.id_at(seed) != Some(hit) {
                trace!(%seed, id = %hit, "stale pulse seed dropped");
                continue;
            }
            if cables.contains(&seed) && reachable.insert(seed) {
                frontier.push_back(seed);
            }
        }

        while let Some(current) = frontier.pop_front() {
            for dir in Direction::ALL {
                if let Some(next) = current.step(dir) {
                    if cables.contains(&next) && reachable.insert(next) {
                        frontier.push_back(next);
                    }
                }
            }
        }

        trace!(cables = cables.len(), reachable = reachable.len(), "flood fill");

        let updates: Vec<(InstanceId, bool)> = store
            .iter()
            .filter(|c| c.kind() == ComponentKind::Cable)
            .map(|c| (c.id(), reachable.contains(&c.position())))
            .collect();

        commit(store, &updates);
    }

    /// LED: on iff any of the four neighbors is on.
    fn update_leds(&mut self, store: &mut GridStore) {
        let updates: Vec<(InstanceId, bool)> = store
            .iter()
            .filter(|l| l.kind() == ComponentKind::Led)
            .map(|l| {
                let lit = Direction::ALL
                    .iter()
                    .any(|dir| store.is_active_toward(l.position(), *dir));
                (l.id(), lit)
            })
            .collect();

        commit(store, &updates);
    }

    /// Comparator: on iff back is on and neither side is. When on, it drives
    /// a cable in front of it directly; the next cable pass floods from there
    /// for as long as the comparator stays on.
    fn update_comparators(&mut self, store: &mut GridStore) {
        let updates: Vec<(InstanceId, bool)> = store
            .iter()
            .filter(|c| c.kind() == ComponentKind::Comparator)
            .map(|c| {
                let pos = c.position();
                let back = store.is_active_toward(pos, Direction::West);
                let inhibited = store.is_active_toward(pos, Direction::North)
                    || store.is_active_toward(pos, Direction::South);
                (c.id(), back && !inhibited)
            })
            .collect();

        commit(store, &updates);

        for (id, active) in updates {
            if !active {
                continue;
            }
            let Some(front) = store.get(id).and_then(|c| c.position().step(Direction::East)) else {
                continue;
            };
            let Some(target) = store.at(front).filter(|t| t.kind() == ComponentKind::Cable) else {
                continue;
            };
            let target = target.id();
            store.set_active(target, true);
        }
    }

    /// Repeater: mirrors its back input at once and, while on, schedules a
    /// pulse into the front cell.
    fn update_repeaters(&mut self, store: &mut GridStore, effects: &mut Vec<DeferredEffect>) {
        let updates: Vec<(InstanceId, bool)> = store
            .iter()
            .filter(|r| r.kind() == ComponentKind::Repeater)
            .map(|r| (r.id(), store.is_active_toward(r.position(), Direction::West)))
            .collect();

        commit(store, &updates);

        for (source, active) in updates {
            if !active {
                continue;
            }
            let Some(target) = store.get(source).and_then(|r| r.position().step(Direction::East)) else {
                continue;
            };
            effects.push(DeferredEffect::RepeaterPulse {
                source,
                target,
                expected: store.id_at(target),
            });
        }
    }

    /// Applies a deferred effect that has come due.
    ///
    /// The effect is re-validated first: a target that was deleted, replaced,
    /// or never existed is skipped.
    pub fn apply_effect(&mut self, store: &mut GridStore, effect: DeferredEffect) -> EffectOutcome {
        let outcome = match effect {
            DeferredEffect::InitializeSwitch { id } => match store.get_mut(id) {
                Some(instance) => match &mut instance.part {
                    Part::Switch { initialized } => {
                        *initialized = true;
                        EffectOutcome::Applied
                    }
                    _ => EffectOutcome::Ignored,
                },
                None => EffectOutcome::Stale,
            },
            DeferredEffect::RepeaterPulse { target, expected, .. } => {
                self.deliver_pulse(store, target, expected)
            }
        };

        debug!(?effect, ?outcome, "deferred effect fired");
        outcome
    }

    fn deliver_pulse(
        &mut self,
        store: &mut GridStore,
        target: Coord,
        expected: Option<InstanceId>,
    ) -> EffectOutcome {
        let Some(occupant) = store.id_at(target) else {
            return EffectOutcome::Stale;
        };
        if expected.is_some_and(|id| id != occupant) {
            return EffectOutcome::Stale;
        }
        let Some(kind) = store.get(occupant).map(|i| i.kind()) else {
            warn!(%target, id = %occupant, "index entry without instance, pulse skipped");
            return EffectOutcome::Stale;
        };

        match kind {
            ComponentKind::Cable => {
                store.set_active(occupant, true);
                self.injected.insert(target, occupant);
                EffectOutcome::Applied
            }
            ComponentKind::Repeater | ComponentKind::Switch | ComponentKind::Led => {
                store.set_active(occupant, true);
                EffectOutcome::Applied
            }
            ComponentKind::Button | ComponentKind::Comparator => EffectOutcome::Ignored,
        }
    }
}

fn commit(store: &mut GridStore, updates: &[(InstanceId, bool)]) {
    for (id, active) in updates {
        store.set_active(*id, *active);
    }
}
