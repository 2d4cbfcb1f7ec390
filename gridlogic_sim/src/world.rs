//! SimWorld - The simulation harness container.

use crate::context::SimContext;
use crate::error::SimError;
use crate::exporter::{SimExport, TraceFrame};

use gridlogic_core::{Scheduler, SchedulerConfig};
use gridlogic_env::GridContext;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Configuration for a simulation run.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Master seed for determinism
    pub seed: u64,

    /// Tick and delay timing
    pub scheduler: SchedulerConfig,

    /// Tick budget for the whole run (0 = unlimited)
    pub max_ticks: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            scheduler: SchedulerConfig::default(),
            max_ticks: 100_000,
        }
    }
}

/// The SimWorld - a scheduler running on a virtual clock.
///
/// Ticking starts at construction; the first pass is due one tick interval
/// after time zero.
pub struct SimWorld {
    /// Configuration
    pub config: SimConfig,

    /// Shared simulation context (virtual clock)
    pub context: Arc<SimContext>,

    scheduler: Scheduler<SimContext>,

    /// Per-tick frames, when tracing is on
    trace: Option<SimExport>,
}

impl SimWorld {
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        let context = SimContext::shared(config.seed);
        let mut scheduler = Scheduler::new(context.clone(), config.scheduler.clone())?;
        scheduler.start(config.scheduler.tick_interval)?;

        Ok(Self {
            config,
            context,
            scheduler,
            trace: None,
        })
    }

    /// Records a frame after every pass from now on.
    pub fn enable_trace(&mut self, scenario: &str) {
        self.trace = Some(SimExport::new(
            scenario,
            self.context.seed(),
            self.config.scheduler.clone(),
        ));
    }

    pub fn take_trace(&mut self) -> Option<SimExport> {
        self.trace.take()
    }

    /// Jumps to the next deadline and fires everything due there.
    ///
    /// Returns the new time.
    pub fn step_event(&mut self) -> Result<Duration, SimError> {
        if self.config.max_ticks > 0 && self.scheduler.tick_count() >= self.config.max_ticks {
            return Err(SimError::TickLimit(self.config.max_ticks));
        }

        let now = self.context.now();
        let next = self.scheduler.next_deadline().unwrap_or(now).max(now);
        self.context.set_time(next)?;
        self.fire_due();
        Ok(next)
    }

    /// Advances virtual time by `duration`, deadline by deadline.
    pub fn advance(&mut self, duration: Duration) -> Result<(), SimError> {
        let target = self.context.now() + duration;
        self.fire_due();

        while let Some(next) = self.scheduler.next_deadline() {
            if next > target {
                break;
            }
            self.step_event()?;
        }

        self.context.set_time(target)?;
        self.fire_due();
        Ok(())
    }

    /// Advances exactly one tick interval.
    pub fn tick(&mut self) -> Result<(), SimError> {
        self.advance(self.config.scheduler.tick_interval)
    }

    /// Advances `ticks` tick intervals.
    pub fn settle(&mut self, ticks: u32) -> Result<(), SimError> {
        for _ in 0..ticks {
            self.tick()?;
        }
        Ok(())
    }

    pub fn scheduler(&self) -> &Scheduler<SimContext> {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut Scheduler<SimContext> {
        &mut self.scheduler
    }

    /// Returns the current simulation time.
    pub fn time(&self) -> Duration {
        self.context.now()
    }

    pub fn tick_count(&self) -> u64 {
        self.scheduler.tick_count()
    }

    fn fire_due(&mut self) {
        let before = self.scheduler.tick_count();
        let fired = self.scheduler.pump();
        if fired > 0 {
            debug!(time_ms = self.context.now().as_millis() as u64, fired, "events fired");
        }

        if self.scheduler.tick_count() > before {
            if let (Some(trace), Some(report)) = (self.trace.as_mut(), self.scheduler.last_report()) {
                let frame = TraceFrame::new(
                    self.context.now().as_millis() as u64,
                    report,
                    self.scheduler.circuit().snapshot(),
                );
                trace.add_frame(frame);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridlogic_core::{ComponentKind, Coord};

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_sim_world_tick() {
        let mut world = SimWorld::new(SimConfig::default()).unwrap();

        assert_eq!(world.tick_count(), 0);
        assert_eq!(world.time(), Duration::ZERO);

        world.tick().unwrap();

        assert_eq!(world.tick_count(), 1);
        assert_eq!(world.time(), ms(100));
    }

    #[test]
    fn test_advance_fires_effects_between_ticks() {
        let mut world = SimWorld::new(SimConfig::default()).unwrap();
        let scheduler = world.scheduler_mut();
        scheduler.place(ComponentKind::Button, Coord::new(0, 0)).unwrap();
        scheduler.place(ComponentKind::Repeater, Coord::new(1, 0)).unwrap();
        let cable = scheduler.place(ComponentKind::Cable, Coord::new(2, 0)).unwrap();

        world.advance(ms(149)).unwrap();
        assert_eq!(world.scheduler().circuit().is_active(cable), Some(false));

        world.advance(ms(1)).unwrap();
        assert_eq!(world.scheduler().circuit().is_active(cable), Some(true));
        assert_eq!(world.tick_count(), 1);
    }

    #[test]
    fn test_landed_pulse_does_not_power_replacement() {
        let mut world = SimWorld::new(SimConfig::default()).unwrap();
        let scheduler = world.scheduler_mut();
        scheduler.place(ComponentKind::Button, Coord::new(0, 0)).unwrap();
        let repeater = scheduler.place(ComponentKind::Repeater, Coord::new(1, 0)).unwrap();
        let cable = scheduler.place(ComponentKind::Cable, Coord::new(2, 0)).unwrap();

        world.advance(ms(150)).unwrap();
        assert_eq!(world.scheduler().circuit().is_active(cable), Some(true));

        let scheduler = world.scheduler_mut();
        scheduler.delete(repeater);
        scheduler.delete(cable);
        let fresh = scheduler.place(ComponentKind::Cable, Coord::new(2, 0)).unwrap();

        world.advance(ms(50)).unwrap();
        assert_eq!(world.tick_count(), 2);
        assert_eq!(world.scheduler().circuit().is_active(fresh), Some(false));
    }

    #[test]
    fn test_step_event_walks_deadlines() {
        let mut world = SimWorld::new(SimConfig::default()).unwrap();
        world
            .scheduler_mut()
            .place(ComponentKind::Switch, Coord::new(0, 0))
            .unwrap();

        assert_eq!(world.step_event().unwrap(), ms(100));
        assert_eq!(world.step_event().unwrap(), ms(200));
        assert_eq!(world.scheduler().pending_effects(), 0);
        assert_eq!(world.tick_count(), 2);
    }

    #[test]
    fn test_tick_limit() {
        let config = SimConfig {
            max_ticks: 3,
            ..Default::default()
        };
        let mut world = SimWorld::new(config).unwrap();

        let err = world.settle(5).unwrap_err();
        assert!(matches!(err, SimError::TickLimit(3)));
        assert_eq!(world.tick_count(), 3);
    }

    #[test]
    fn test_trace_records_each_pass() {
        let mut world = SimWorld::new(SimConfig::default()).unwrap();
        world.enable_trace("test");
        world
            .scheduler_mut()
            .place(ComponentKind::Led, Coord::new(0, 0))
            .unwrap();

        world.settle(3).unwrap();

        let trace = world.take_trace().unwrap();
        assert_eq!(trace.seed, 42);
        assert_eq!(trace.frames.len(), 3);
        assert_eq!(trace.duration_ms, 300);
        assert_eq!(trace.frames[0].instances.len(), 1);
    }

    #[test]
    fn test_same_seed_same_run() {
        let run = |seed| {
            let config = SimConfig {
                seed,
                ..Default::default()
            };
            let mut world = SimWorld::new(config).unwrap();
            world
                .scheduler_mut()
                .import_layout(&gridlogic_core::LayoutId::NorGate.layout(), Coord::new(0, 0))
                .unwrap();
            world.settle(10).unwrap();
            world.scheduler().circuit().snapshot()
        };

        assert_eq!(run(7), run(7));
    }
}
