//! Scheduler - drives a [`Circuit`] against a [`GridContext`] clock.
//!
//! This module is the integration layer between the pure engine (store,
//! passes, deferred effects) and the environment abstraction.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                        Scheduler                          │
//! │  ┌─────────────────────────────────────────────────────┐  │
//! │  │           Context: GridContext                      │  │
//! │  │  • now()   → tick and effect deadlines              │  │
//! │  │  • sleep() → wait for the next deadline             │  │
//! │  └─────────────────────────────────────────────────────┘  │
//! │                           │                               │
//! │  ┌──────────────┐  ┌──────────────┐  ┌────────────────┐   │
//! │  │  next tick   │  │ EffectQueue  │  │    Circuit     │   │
//! │  │  deadline    │  │ (due, seq)   │  │ store + engine │   │
//! │  └──────────────┘  └──────────────┘  └────────────────┘   │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything runs on one logical thread. An edit commits immediately;
//! [`Scheduler::pump`] then fires every tick and deferred effect whose
//! deadline has passed, in deadline order, effects first on ties.
//!
//! # Usage
//!
//! ```ignore
//! use gridlogic_core::{Scheduler, SchedulerConfig, ComponentKind, Coord};
//! use gridlogic_env::TokioContext;
//!
//! let mut scheduler = Scheduler::new(TokioContext::shared(), SchedulerConfig::default())?;
//! scheduler.place(ComponentKind::Button, Coord::new(0, 0))?;
//! scheduler.start(Duration::from_millis(100))?;
//! scheduler.run_for(Duration::from_secs(1)).await;
//! ```

use crate::circuit::Circuit;
use crate::gridlogic_kinds::ComponentKind;
use crate::gridlogic_space::{Coord, EditError, InstanceId};
use crate::gridlogic_time::{DeferredEffect, EffectDelay, EffectOutcome, EffectQueue};
use crate::layout::Layout;
use crate::metrics::{SimMetrics, TickReport};
use gridlogic_env::GridContext;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Timing configuration of a scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Period between regular ticks (default: 100ms)
    #[serde(rename = "tick_interval_ms", with = "millis")]
    pub tick_interval: Duration,

    /// Latency of a repeater pulse (default: 50ms, must stay below the tick)
    #[serde(rename = "repeater_delay_ms", with = "millis")]
    pub repeater_delay: Duration,

    /// Settle delay before a new switch starts evaluating (default: 200ms)
    #[serde(rename = "switch_init_delay_ms", with = "millis")]
    pub switch_init_delay: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(100),
            repeater_delay: Duration::from_millis(50),
            switch_init_delay: Duration::from_millis(200),
        }
    }
}

impl SchedulerConfig {
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn with_repeater_delay(mut self, delay: Duration) -> Self {
        self.repeater_delay = delay;
        self
    }

    pub fn with_switch_init_delay(mut self, delay: Duration) -> Self {
        self.switch_init_delay = delay;
        self
    }

    /// Checks the timing constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval.is_zero() {
            return Err(ConfigError::ZeroTickInterval);
        }
        if self.repeater_delay.is_zero() || self.repeater_delay >= self.tick_interval {
            return Err(ConfigError::RepeaterDelayOutOfRange {
                repeater_ms: self.repeater_delay.as_millis() as u64,
                tick_ms: self.tick_interval.as_millis() as u64,
            });
        }
        Ok(())
    }

    fn latency(&self, delay: EffectDelay) -> Duration {
        match delay {
            EffectDelay::SwitchInit => self.switch_init_delay,
            EffectDelay::Repeater => self.repeater_delay,
        }
    }
}

/// Rejected timing configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Tick interval must be non-zero")]
    ZeroTickInterval,

    #[error("Repeater delay {repeater_ms}ms must be non-zero and shorter than the {tick_ms}ms tick")]
    RepeaterDelayOutOfRange { repeater_ms: u64, tick_ms: u64 },
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Drives a circuit's ticks and deferred effects from a clock.
///
/// Generic over the context so the same scheduler runs in real time
/// (`TokioContext`) or virtual time (`SimContext`).
pub struct Scheduler<Ctx>
where
    Ctx: GridContext,
{
    /// Environment context
    context: Arc<Ctx>,

    /// Timing configuration
    config: SchedulerConfig,

    /// Store, engine and edit interface
    circuit: Circuit,

    /// Pending deferred effects
    queue: EffectQueue,

    /// Deadline of the next regular tick; `None` while stopped
    next_tick_at: Option<Duration>,

    /// Running totals
    metrics: SimMetrics,

    /// Report of the most recent pass
    last_report: Option<TickReport>,

    /// Effects fired by the most recent `pump`, with their outcomes
    last_fired: Vec<(DeferredEffect, EffectOutcome)>,
}

impl<Ctx> Scheduler<Ctx>
where
    Ctx: GridContext,
{
    /// Creates a stopped scheduler over an empty circuit.
    pub fn new(context: Arc<Ctx>, config: SchedulerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            context,
            config,
            circuit: Circuit::new(),
            queue: EffectQueue::new(),
            next_tick_at: None,
            metrics: SimMetrics::default(),
            last_report: None,
            last_fired: Vec::new(),
        })
    }

    /// Starts ticking every `tick_interval`; the first tick is one interval out.
    pub fn start(&mut self, tick_interval: Duration) -> Result<(), ConfigError> {
        let config = self.config.clone().with_tick_interval(tick_interval);
        config.validate()?;
        self.config = config;

        let first = self.context.now() + tick_interval;
        self.next_tick_at = Some(first);
        info!(interval_ms = tick_interval.as_millis() as u64, "scheduler started");
        Ok(())
    }

    /// Stops regular ticks. Pending deferred effects still fire.
    pub fn stop(&mut self) {
        if self.next_tick_at.take().is_some() {
            info!(ticks = self.metrics.ticks, "scheduler stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.next_tick_at.is_some()
    }

    /// Runs one pass right now, outside the regular cadence.
    ///
    /// Also serves as the corrective pass an editor may ask for after a move.
    pub fn step_once(&mut self) -> TickReport {
        let now = self.context.now();
        self.run_tick(now)
    }

    /// Earliest pending deadline, tick or effect.
    pub fn next_deadline(&self) -> Option<Duration> {
        match (self.queue.peek_due(), self.next_tick_at) {
            (Some(effect), Some(tick)) => Some(effect.min(tick)),
            (effect, tick) => effect.or(tick),
        }
    }

    /// Fires every tick and effect due at the current time.
    ///
    /// Returns how many events fired.
    pub fn pump(&mut self) -> usize {
        let now = self.context.now();
        let mut fired = 0;
        self.last_fired.clear();

        loop {
            let effect_due = self.queue.peek_due().filter(|due| *due <= now);
            let tick_due = self.next_tick_at.filter(|due| *due <= now);

            let effect_first = match (effect_due, tick_due) {
                (None, None) => break,
                (Some(effect), Some(tick)) => effect <= tick,
                (Some(_), None) => true,
                (None, Some(_)) => false,
            };

            if effect_first {
                if let Some((_, effect)) = self.queue.pop_due(now) {
                    let outcome = self.circuit.apply_effect(effect);
                    self.metrics.record_effect(outcome);
                    self.last_fired.push((effect, outcome));
                }
            } else if let Some(tick) = tick_due {
                self.run_tick(tick);
                self.next_tick_at = Some(tick + self.config.tick_interval);
            }
            fired += 1;
        }

        fired
    }

    /// Runs the scheduler for `duration` of context time.
    ///
    /// Sleeps through the context between deadlines, so with a virtual clock
    /// this returns without real waiting.
    pub async fn run_for(&mut self, duration: Duration) -> usize {
        let deadline = self.context.now() + duration;
        let mut fired = 0;

        loop {
            fired += self.pump();

            let now = self.context.now();
            if now >= deadline {
                break;
            }

            let wake = self
                .next_deadline()
                .map_or(deadline, |next| next.min(deadline));
            self.context.sleep(wake.saturating_sub(now)).await;
        }

        debug!(fired, "run_for finished");
        fired
    }

    pub fn place(&mut self, kind: ComponentKind, pos: Coord) -> Result<InstanceId, EditError> {
        let id = self.circuit.place(kind, pos)?;
        self.flush_requests(self.context.now());
        Ok(id)
    }

    pub fn move_to(&mut self, id: InstanceId, pos: Coord) -> Result<(), EditError> {
        self.circuit.move_to(id, pos)
    }

    pub fn delete(&mut self, id: InstanceId) -> bool {
        self.circuit.delete(id)
    }

    pub fn toggle(&mut self, id: InstanceId) -> Result<bool, EditError> {
        self.circuit.toggle(id)
    }

    pub fn import_layout(&mut self, layout: &Layout, origin: Coord) -> Result<Vec<InstanceId>, EditError> {
        let ids = self.circuit.import_layout(layout, origin)?;
        self.flush_requests(self.context.now());
        Ok(ids)
    }

    /// Clears the grid and discards every pending effect.
    pub fn reset(&mut self) {
        self.circuit.reset();
        self.queue.clear();
        self.last_fired.clear();
    }

    pub fn circuit(&self) -> &Circuit {
        &self.circuit
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn context(&self) -> &Arc<Ctx> {
        &self.context
    }

    pub fn metrics(&self) -> &SimMetrics {
        &self.metrics
    }

    pub fn last_report(&self) -> Option<&TickReport> {
        self.last_report.as_ref()
    }

    /// Number of passes run so far.
    pub fn tick_count(&self) -> u64 {
        self.metrics.ticks
    }

    /// Deferred effects the most recent [`pump`](Self::pump) fired, in order.
    pub fn last_fired(&self) -> &[(DeferredEffect, EffectOutcome)] {
        &self.last_fired
    }

    pub fn pending_effects(&self) -> usize {
        self.queue.len()
    }

    fn run_tick(&mut self, at: Duration) -> TickReport {
        let report = self.circuit.tick();
        self.metrics.record_tick(&report);
        self.flush_requests(at);
        self.last_report = Some(report.clone());
        report
    }

    fn flush_requests(&mut self, at: Duration) {
        for effect in self.circuit.take_requests() {
            let due = at + self.config.latency(effect.delay());
            self.queue.push(due, effect);
        }
    }

    /// Schedules an effect by hand.
    pub fn schedule(&mut self, due: Duration, effect: DeferredEffect) {
        self.queue.push(due, effect);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Hand-cranked clock; `sleep` jumps forward.
    #[derive(Default)]
    struct StepClock {
        now: Mutex<Duration>,
    }

    impl StepClock {
        fn set(&self, t: Duration) {
            *self.now.lock().unwrap() = t;
        }
    }

    #[async_trait]
    impl GridContext for StepClock {
        fn now(&self) -> Duration {
            *self.now.lock().unwrap()
        }

        async fn sleep(&self, duration: Duration) {
            *self.now.lock().unwrap() += duration;
        }
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn scheduler() -> (Arc<StepClock>, Scheduler<StepClock>) {
        let clock = Arc::new(StepClock::default());
        let scheduler = Scheduler::new(clock.clone(), SchedulerConfig::default()).unwrap();
        (clock, scheduler)
    }

    #[test]
    fn test_config_defaults() {
        let config = SchedulerConfig::default();
        assert_eq!(config.tick_interval, ms(100));
        assert_eq!(config.repeater_delay, ms(50));
        assert_eq!(config.switch_init_delay, ms(200));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let zero = SchedulerConfig::default().with_tick_interval(Duration::ZERO);
        assert_eq!(zero.validate(), Err(ConfigError::ZeroTickInterval));

        let slow = SchedulerConfig::default().with_repeater_delay(ms(100));
        assert_eq!(
            slow.validate(),
            Err(ConfigError::RepeaterDelayOutOfRange { repeater_ms: 100, tick_ms: 100 })
        );
    }

    #[test]
    fn test_config_from_json_millis() {
        let config: SchedulerConfig =
            serde_json::from_str(r#"{ "tick_interval_ms": 250, "repeater_delay_ms": 120 }"#).unwrap();
        assert_eq!(config.tick_interval, ms(250));
        assert_eq!(config.repeater_delay, ms(120));
        assert_eq!(config.switch_init_delay, ms(200));
    }

    #[test]
    fn test_start_rejects_short_tick() {
        let (_, mut scheduler) = scheduler();
        assert!(scheduler.start(ms(40)).is_err());
        assert!(!scheduler.is_running());
    }

    #[test]
    fn test_ticks_follow_interval() {
        let (clock, mut scheduler) = scheduler();
        scheduler.start(ms(100)).unwrap();

        clock.set(ms(99));
        assert_eq!(scheduler.pump(), 0);

        clock.set(ms(350));
        assert_eq!(scheduler.pump(), 3);
        assert_eq!(scheduler.tick_count(), 3);
        assert_eq!(scheduler.next_deadline(), Some(ms(400)));

        scheduler.stop();
        clock.set(ms(1000));
        assert_eq!(scheduler.pump(), 0);
        assert_eq!(scheduler.next_deadline(), None);
    }

    #[test]
    fn test_switch_initializes_after_delay() {
        let (clock, mut scheduler) = scheduler();
        let switch = scheduler.place(ComponentKind::Switch, Coord::new(0, 0)).unwrap();

        clock.set(ms(100));
        scheduler.step_once();
        assert_eq!(scheduler.circuit().is_active(switch), Some(false));

        clock.set(ms(200));
        scheduler.pump();
        assert!(scheduler.circuit().instance(switch).unwrap().is_initialized());

        scheduler.step_once();
        assert_eq!(scheduler.circuit().is_active(switch), Some(true));
    }

    #[test]
    fn test_repeater_front_waits_for_latency() {
        let (clock, mut scheduler) = scheduler();
        scheduler.place(ComponentKind::Button, Coord::new(0, 0)).unwrap();
        let repeater = scheduler.place(ComponentKind::Repeater, Coord::new(1, 0)).unwrap();
        let led = scheduler.place(ComponentKind::Led, Coord::new(2, 0)).unwrap();

        scheduler.step_once();
        assert_eq!(scheduler.circuit().is_active(repeater), Some(true));
        assert_eq!(scheduler.circuit().is_active(led), Some(false));
        assert_eq!(scheduler.pending_effects(), 1);

        clock.set(ms(49));
        scheduler.pump();
        assert_eq!(scheduler.circuit().is_active(led), Some(false));

        clock.set(ms(50));
        scheduler.pump();
        assert_eq!(scheduler.circuit().is_active(led), Some(true));
        assert_eq!(scheduler.metrics().effects_applied, 1);
    }

    #[test]
    fn test_deleting_target_drops_pending_pulse() {
        let (clock, mut scheduler) = scheduler();
        scheduler.place(ComponentKind::Button, Coord::new(0, 0)).unwrap();
        scheduler.place(ComponentKind::Repeater, Coord::new(1, 0)).unwrap();
        let cable = scheduler.place(ComponentKind::Cable, Coord::new(2, 0)).unwrap();

        scheduler.step_once();
        assert!(scheduler.delete(cable));

        clock.set(ms(60));
        scheduler.pump();

        assert!(scheduler.circuit().occupant(Coord::new(2, 0)).is_none());
        assert_eq!(scheduler.metrics().effects_dropped, 1);
        assert_eq!(scheduler.pending_effects(), 0);
    }

    #[test]
    fn test_effects_fire_before_tie_tick() {
        let (clock, mut scheduler) = scheduler();
        scheduler.start(ms(100)).unwrap();
        let led = scheduler.place(ComponentKind::Led, Coord::new(5, 5)).unwrap();

        // a pulse into an LED due exactly at the tick: the tick then re-evaluates it
        scheduler.schedule(
            ms(100),
            DeferredEffect::RepeaterPulse {
                source: InstanceId(999),
                target: Coord::new(5, 5),
                expected: Some(led),
            },
        );

        clock.set(ms(100));
        assert_eq!(scheduler.pump(), 2);
        assert_eq!(scheduler.circuit().is_active(led), Some(false));
        assert_eq!(scheduler.metrics().effects_applied, 1);
        assert_eq!(scheduler.last_fired().len(), 1);
        assert_eq!(scheduler.last_fired()[0].1, EffectOutcome::Applied);

        clock.set(ms(150));
        assert_eq!(scheduler.pump(), 0);
        assert!(scheduler.last_fired().is_empty());
    }

    #[test]
    fn test_reset_discards_pending_effects() {
        let (_, mut scheduler) = scheduler();
        scheduler.place(ComponentKind::Switch, Coord::new(0, 0)).unwrap();
        assert_eq!(scheduler.pending_effects(), 1);

        scheduler.reset();
        assert_eq!(scheduler.pending_effects(), 0);
        assert!(scheduler.circuit().is_empty());
    }

    #[tokio::test]
    async fn test_run_for_advances_through_deadlines() {
        let (clock, mut scheduler) = scheduler();
        scheduler.place(ComponentKind::Button, Coord::new(0, 0)).unwrap();
        let cable = scheduler.place(ComponentKind::Cable, Coord::new(1, 0)).unwrap();
        scheduler.start(ms(100)).unwrap();

        let fired = scheduler.run_for(ms(1000)).await;

        assert_eq!(clock.now(), ms(1000));
        assert_eq!(fired, 10);
        assert_eq!(scheduler.tick_count(), 10);
        assert_eq!(scheduler.circuit().is_active(cable), Some(true));
    }
}
