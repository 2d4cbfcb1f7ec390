//! Scenario runner - executes circuit scenarios on a virtual clock.

use crate::error::SimError;
use crate::exporter::SimExport;
use crate::oracle;
use crate::scenarios::ScenarioId;
use crate::world::{SimConfig, SimWorld};

use gridlogic_core::{
    audit, ComponentKind, Coord, DeferredEffect, EditError, EffectOutcome, InstanceId, LayoutId, SchedulerConfig,
    SimMetrics,
};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Ticks allowed for a gate output to follow its inputs.
const GATE_SETTLE_TICKS: u32 = 6;

/// Edge length of the square the churn scenario edits in.
const CHURN_SPAN: i64 = 8;

/// Results from running a scenario.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Total passes executed
    pub total_ticks: u64,

    /// Final simulation time in milliseconds
    pub final_time_ms: u64,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Scheduler totals at the end of the run
    pub metrics: SimMetrics,
}

/// Runs circuit scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    /// Timing for every world this runner builds
    scheduler: SchedulerConfig,

    /// Edits performed by the churn scenario
    churn_steps: usize,

    /// Record a per-pass trace
    trace: bool,
}

impl ScenarioRunner {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            scheduler: SchedulerConfig::default(),
            churn_steps: 200,
            trace: false,
        }
    }

    pub fn with_scheduler(mut self, config: SchedulerConfig) -> Self {
        self.scheduler = config;
        self
    }

    pub fn with_churn_steps(mut self, steps: usize) -> Self {
        self.churn_steps = steps;
        self
    }

    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        self.run_traced(scenario).0
    }

    /// Runs a scenario, also returning its trace when tracing is on.
    pub fn run_traced(&self, scenario: ScenarioId) -> (ScenarioResult, Option<SimExport>) {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);

        let config = SimConfig {
            seed: self.seed,
            scheduler: self.scheduler.clone(),
            ..Default::default()
        };
        let mut world = match SimWorld::new(config) {
            Ok(world) => world,
            Err(e) => {
                let result = ScenarioResult {
                    scenario,
                    seed: self.seed,
                    passed: false,
                    total_ticks: 0,
                    final_time_ms: 0,
                    failure_reason: Some(e.to_string()),
                    metrics: SimMetrics::default(),
                };
                return (result, None);
            }
        };
        if self.trace {
            world.enable_trace(scenario.name());
        }

        let outcome = match scenario {
            ScenarioId::AndGate
            | ScenarioId::OrGate
            | ScenarioId::NandGate
            | ScenarioId::NorGate
            | ScenarioId::NotGate => match scenario.layout() {
                Some(gate) => self.run_gate(&mut world, gate),
                None => Err(SimError::check("gate scenario without a layout")),
            },
            ScenarioId::CableChain => self.run_cable_chain(&mut world),
            ScenarioId::Comparator => self.run_comparator(&mut world),
            ScenarioId::RepeaterDelay => self.run_repeater_delay(&mut world),
            ScenarioId::DeleteUnderDelay => self.run_delete_under_delay(&mut world),
            ScenarioId::EditChurn => self.run_edit_churn(&mut world),
        };

        if let Err(e) = &outcome {
            warn!("{} failed at t={}ms: {}", scenario.name(), world.time().as_millis(), e);
        }

        let passed = outcome.is_ok();
        let metrics = world.scheduler().metrics().clone();
        let mut trace = world.take_trace();
        if let Some(trace) = trace.as_mut() {
            trace.finalize(passed, metrics.clone());
        }

        let result = ScenarioResult {
            scenario,
            seed: self.seed,
            passed,
            total_ticks: world.tick_count(),
            final_time_ms: world.time().as_millis() as u64,
            failure_reason: outcome.err().map(|e| e.to_string()),
            metrics,
        };
        (result, trace)
    }

    /// Drives a preset through every input combination.
    fn run_gate(&self, world: &mut SimWorld, gate: LayoutId) -> Result<(), SimError> {
        world
            .scheduler_mut()
            .import_layout(&gate.layout(), Coord::new(0, 0))?;

        // switches hold until initialized
        world.advance(self.scheduler.switch_init_delay + self.scheduler.tick_interval)?;

        let inputs = gate.inputs();
        for combo in 0..(1u32 << inputs.len()) {
            let values: Vec<bool> = (0..inputs.len()).map(|i| combo & (1 << i) != 0).collect();
            for (pos, on) in inputs.iter().zip(&values) {
                set_button(world, *pos, *on)?;
            }
            world.settle(GATE_SETTLE_TICKS)?;

            let lit = active_at(world, gate.output())?;
            let want = gate.expected(&values);
            debug!(gate = %gate, ?values, lit, "gate output");
            expect(
                lit == want,
                format!("{} inputs {:?}: LED {}, expected {}", gate, values, lit, want),
            )?;
        }
        Ok(())
    }

    fn run_cable_chain(&self, world: &mut SimWorld) -> Result<(), SimError> {
        let scheduler = world.scheduler_mut();
        let button = scheduler.place(ComponentKind::Button, Coord::new(0, 0))?;
        let a = scheduler.place(ComponentKind::Cable, Coord::new(1, 0))?;
        let b = scheduler.place(ComponentKind::Cable, Coord::new(2, 0))?;

        world.tick()?;
        for id in [a, b] {
            expect(is_active(world, id)?, format!("{} should be on", id))?;
            expect(color_of(world, id)? == "lime", format!("{} should render lime", id))?;
        }

        world.scheduler_mut().toggle(button)?;
        world.tick()?;
        for id in [a, b] {
            expect(!is_active(world, id)?, format!("{} should be off", id))?;
            expect(
                color_of(world, id)? == "forestgreen",
                format!("{} should render forestgreen", id),
            )?;
        }
        Ok(())
    }

    fn run_comparator(&self, world: &mut SimWorld) -> Result<(), SimError> {
        let back = Coord::new(-1, 0);
        let north = Coord::new(0, -1);
        let south = Coord::new(0, 1);

        let scheduler = world.scheduler_mut();
        for pos in [back, north, south] {
            scheduler.place(ComponentKind::Button, pos)?;
        }
        let comparator = scheduler.place(ComponentKind::Comparator, Coord::new(0, 0))?;
        let front = scheduler.place(ComponentKind::Cable, Coord::new(1, 0))?;

        for combo in 0..8u32 {
            let (b, n, s) = (combo & 1 != 0, combo & 2 != 0, combo & 4 != 0);
            set_button(world, back, b)?;
            set_button(world, north, n)?;
            set_button(world, south, s)?;
            world.settle(3)?;

            let want = b && !n && !s;
            let label = format!("back={} north={} south={}", b, n, s);
            expect(is_active(world, comparator)? == want, format!("comparator wrong for {}", label))?;
            expect(is_active(world, front)? == want, format!("front cable wrong for {}", label))?;
        }
        Ok(())
    }

    fn run_repeater_delay(&self, world: &mut SimWorld) -> Result<(), SimError> {
        let delay = self.scheduler.repeater_delay;
        let scheduler = world.scheduler_mut();
        scheduler.place(ComponentKind::Button, Coord::new(0, 0))?;
        let repeater = scheduler.place(ComponentKind::Repeater, Coord::new(1, 0))?;
        let front = scheduler.place(ComponentKind::Cable, Coord::new(2, 0))?;
        let further = scheduler.place(ComponentKind::Cable, Coord::new(3, 0))?;

        world.tick()?;
        let pass_at = world.time();
        expect(is_active(world, repeater)?, "repeater should latch its back input")?;
        expect(!is_active(world, front)?, "front cable powered before the delay")?;

        world.advance(delay.saturating_sub(Duration::from_millis(1)))?;
        expect(!is_active(world, front)?, "front cable powered before the delay")?;

        world.advance((pass_at + delay).saturating_sub(world.time()))?;
        expect(is_active(world, front)?, "front cable not powered after the delay")?;
        expect(!is_active(world, further)?, "pulse spread before the next pass")?;

        world.advance(self.scheduler.tick_interval - delay)?;
        expect(is_active(world, further)?, "pulse did not seed the next flood fill")?;
        Ok(())
    }

    fn run_delete_under_delay(&self, world: &mut SimWorld) -> Result<(), SimError> {
        let delay = self.scheduler.repeater_delay;
        let target = Coord::new(2, 0);
        let scheduler = world.scheduler_mut();
        scheduler.place(ComponentKind::Button, Coord::new(0, 0))?;
        scheduler.place(ComponentKind::Repeater, Coord::new(1, 0))?;
        let cable = scheduler.place(ComponentKind::Cable, target)?;

        // deleted while the pulse is pending
        world.tick()?;
        world.scheduler_mut().delete(cable);
        world.advance(delay)?;
        expect(world.scheduler().circuit().occupant(target).is_none(), "pulse resurrected a deleted cell")?;
        expect(world.scheduler().metrics().effects_dropped == 1, "stale pulse was not dropped")?;

        // replaced while the pulse is pending
        let led = world.scheduler_mut().place(ComponentKind::Led, target)?;
        world.advance(self.scheduler.tick_interval - delay)?;
        world.scheduler_mut().delete(led);
        let replacement = world.scheduler_mut().place(ComponentKind::Cable, target)?;
        world.advance(delay)?;
        expect(!is_active(world, replacement)?, "pulse hit the replacement")?;
        expect(world.scheduler().metrics().effects_dropped == 2, "stale pulse was not dropped")?;

        let report = audit(world.scheduler().circuit().store());
        expect(report.is_consistent(), report.to_string())
    }

    /// Random edits, each followed by one pass and the full set of checks.
    fn run_edit_churn(&self, world: &mut SimWorld) -> Result<(), SimError> {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut rejected = 0usize;

        for step in 0..self.churn_steps {
            let pos = Coord::new(rng.gen_range(0..CHURN_SPAN), rng.gen_range(0..CHURN_SPAN));
            let live: Vec<InstanceId> = world.scheduler().circuit().snapshot().iter().map(|v| v.id).collect();

            let edit = match rng.gen_range(0..10) {
                0..=4 => {
                    let kind = *ComponentKind::ALL.choose(&mut rng).unwrap_or(&ComponentKind::Cable);
                    world.scheduler_mut().place(kind, pos).map(|_| ())
                }
                5 | 6 => match live.choose(&mut rng) {
                    Some(id) => world.scheduler_mut().move_to(*id, pos),
                    None => Ok(()),
                },
                7 => {
                    if let Some(id) = live.choose(&mut rng) {
                        world.scheduler_mut().delete(*id);
                    }
                    Ok(())
                }
                _ => {
                    let buttons = world.scheduler().circuit().store().ids_of(ComponentKind::Button);
                    match buttons.choose(&mut rng) {
                        Some(id) => world.scheduler_mut().toggle(*id).map(|_| ()),
                        None => Ok(()),
                    }
                }
            };

            match edit {
                Ok(()) => {}
                Err(EditError::OccupiedCell(_)) => rejected += 1,
                Err(e) => return Err(e.into()),
            }

            self.step_and_check(world, step)?;
        }

        debug!(steps = self.churn_steps, rejected, "churn finished");
        Ok(())
    }

    /// Steps events until one pass has run, then audits the store and
    /// checks cable reachability against the oracle.
    ///
    /// The oracle is fed the pulses seen landing on the way, never the
    /// engine's own seed set.
    fn step_and_check(&self, world: &mut SimWorld, step: usize) -> Result<(), SimError> {
        let mut pulsed: HashMap<Coord, InstanceId> = HashMap::new();
        loop {
            let before = world.tick_count();
            world.step_event()?;

            let scheduler = world.scheduler();
            for (effect, outcome) in scheduler.last_fired() {
                if let (DeferredEffect::RepeaterPulse { target, .. }, EffectOutcome::Applied) = (effect, outcome) {
                    if let Some(hit) = scheduler.circuit().store().id_at(*target) {
                        pulsed.insert(*target, hit);
                    }
                }
            }

            if world.tick_count() == before {
                continue;
            }

            let circuit = world.scheduler().circuit();
            let report = audit(circuit.store());
            expect(report.is_consistent(), format!("step {}: {}", step, report))?;

            return oracle::check_cables(circuit.store(), &pulsed)
                .map_err(|e| SimError::check(format!("step {}: {}", step, e)));
        }
    }
}

fn expect(condition: bool, msg: impl Into<String>) -> Result<(), SimError> {
    if condition {
        Ok(())
    } else {
        Err(SimError::check(msg))
    }
}

fn is_active(world: &SimWorld, id: InstanceId) -> Result<bool, SimError> {
    world
        .scheduler()
        .circuit()
        .is_active(id)
        .ok_or_else(|| SimError::check(format!("{} is gone", id)))
}

fn active_at(world: &SimWorld, pos: Coord) -> Result<bool, SimError> {
    world
        .scheduler()
        .circuit()
        .occupant(pos)
        .map(|i| i.is_active())
        .ok_or_else(|| SimError::check(format!("nothing at {}", pos)))
}

fn color_of(world: &SimWorld, id: InstanceId) -> Result<&'static str, SimError> {
    world
        .scheduler()
        .circuit()
        .instance(id)
        .map(|i| i.color())
        .ok_or_else(|| SimError::check(format!("{} is gone", id)))
}

/// Toggles the button at `pos` until it reads `on`.
fn set_button(world: &mut SimWorld, pos: Coord, on: bool) -> Result<(), SimError> {
    let (id, active) = world
        .scheduler()
        .circuit()
        .occupant(pos)
        .map(|i| (i.id(), i.is_active()))
        .ok_or_else(|| SimError::check(format!("no button at {}", pos)))?;
    if active != on {
        world.scheduler_mut().toggle(id)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_scenario_passes() {
        let runner = ScenarioRunner::new(42);
        for scenario in ScenarioId::all() {
            let result = runner.run(scenario);
            assert!(result.passed, "{}: {:?}", scenario, result.failure_reason);
            assert!(result.total_ticks > 0, "{}", scenario);
        }
    }

    #[test]
    fn test_churn_across_seeds() {
        for seed in 0..5 {
            let result = ScenarioRunner::new(seed).with_churn_steps(100).run(ScenarioId::EditChurn);
            assert!(result.passed, "seed {}: {:?}", seed, result.failure_reason);
            assert_eq!(result.total_ticks, 100);
        }
    }

    #[test]
    fn test_gates_with_custom_timing() {
        let config = SchedulerConfig::default()
            .with_tick_interval(Duration::from_millis(40))
            .with_repeater_delay(Duration::from_millis(15))
            .with_switch_init_delay(Duration::from_millis(90));
        let runner = ScenarioRunner::new(1).with_scheduler(config);

        for scenario in [ScenarioId::AndGate, ScenarioId::NorGate, ScenarioId::RepeaterDelay] {
            let result = runner.run(scenario);
            assert!(result.passed, "{}: {:?}", scenario, result.failure_reason);
        }
    }

    #[test]
    fn test_invalid_timing_fails_cleanly() {
        let config = SchedulerConfig::default().with_repeater_delay(Duration::from_millis(500));
        let result = ScenarioRunner::new(1).with_scheduler(config).run(ScenarioId::CableChain);

        assert!(!result.passed);
        assert_eq!(result.total_ticks, 0);
        assert!(result.failure_reason.unwrap().contains("Repeater delay"));
    }

    #[test]
    fn test_trace_is_finalized() {
        let runner = ScenarioRunner::new(3).with_trace(true);
        let (result, trace) = runner.run_traced(ScenarioId::CableChain);

        let trace = trace.unwrap();
        assert!(result.passed);
        assert!(trace.passed);
        assert_eq!(trace.frames.len() as u64, result.total_ticks);
        assert_eq!(trace.scenario, "cable_chain");
    }
}
