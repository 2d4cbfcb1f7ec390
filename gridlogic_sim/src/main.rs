//! gridlogic Simulator CLI
//!
//! Run deterministic circuit scenarios on a virtual clock, or drive a preset
//! gate against the real clock.

use clap::Parser;
use gridlogic_core::{Coord, LayoutId, Scheduler, SchedulerConfig};
use gridlogic_env::TokioContext;
use gridlogic_sim::scenarios::ScenarioId;
use gridlogic_sim::{ScenarioResult, ScenarioRunner, SimError};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// gridlogic deterministic simulation CLI
#[derive(Parser, Debug)]
#[command(name = "gridlogic-sim")]
#[command(about = "Run deterministic circuit scenarios for gridlogic", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Scenario to run (and_gate, or_gate, nand_gate, nor_gate, not_gate,
    /// cable_chain, comparator, repeater_delay, delete_under_delay, edit_churn, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Number of consecutive seeds to test (for CI mode)
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// JSON file with scheduler timing (tick_interval_ms, repeater_delay_ms, switch_init_delay_ms)
    #[arg(long)]
    config: Option<String>,

    /// Tick interval override in milliseconds
    #[arg(long)]
    tick_ms: Option<u64>,

    /// Repeater delay override in milliseconds
    #[arg(long)]
    repeater_ms: Option<u64>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Export a per-tick JSON trace of a single scenario
    #[arg(long)]
    export: Option<String>,

    /// Drive a preset gate on the real clock instead of running scenarios
    #[arg(long)]
    realtime: Option<String>,

    /// Real-time run length in seconds
    #[arg(short, long, default_value = "2")]
    duration: f64,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // RUST_LOG wins over --verbose
    let level = if args.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return ExitCode::FAILURE;
    }

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<bool, SimError> {
    let config = load_config(args)?;

    if let Some(layout) = &args.realtime {
        let layout: LayoutId = layout.parse().map_err(SimError::Check)?;
        return run_realtime(layout, config, args.duration);
    }

    if !args.json {
        info!("gridlogic Simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        vec![args.scenario.parse().map_err(SimError::Check)?]
    };

    let base_seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(42)
    } else {
        args.seed
    };

    if let Some(export_path) = &args.export {
        let [scenario] = scenarios.as_slice() else {
            return Err(SimError::check("--export only supports a single scenario, not 'all'"));
        };
        return run_with_export(*scenario, base_seed, config, export_path);
    }

    let mut all_results: Vec<ScenarioResult> = Vec::new();

    for seed_offset in 0..args.seeds {
        let seed = base_seed.wrapping_add(seed_offset as u64);
        let runner = ScenarioRunner::new(seed).with_scheduler(config.clone());

        for scenario in &scenarios {
            let result = runner.run(*scenario);

            if !args.json {
                if result.passed {
                    info!("✓ {} (seed={}) PASSED", scenario.name(), seed);
                } else {
                    error!(
                        "✗ {} (seed={}) FAILED: {}",
                        scenario.name(),
                        seed,
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                }
            }

            all_results.push(result);
        }
    }

    let total = all_results.len();
    let failed: Vec<&ScenarioResult> = all_results.iter().filter(|r| !r.passed).collect();

    if args.json {
        let summary = serde_json::json!({
            "total": total,
            "passed": total - failed.len(),
            "failed": failed.len(),
            "config": config,
            "results": all_results,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        if failed.is_empty() {
            info!("✅ All {} scenario runs passed!", total);
        } else {
            error!("❌ {}/{} scenario runs failed!", failed.len(), total);
            for result in &failed {
                error!(
                    "  - {} seed={}: {}",
                    result.scenario.name(),
                    result.seed,
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }
    }

    Ok(failed.is_empty())
}

/// Scheduler timing from `--config`, then the per-flag overrides.
fn load_config(args: &Args) -> Result<SchedulerConfig, SimError> {
    let mut config = match &args.config {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => SchedulerConfig::default(),
    };

    if let Some(ms) = args.tick_ms {
        config = config.with_tick_interval(Duration::from_millis(ms));
    }
    if let Some(ms) = args.repeater_ms {
        config = config.with_repeater_delay(Duration::from_millis(ms));
    }

    config.validate()?;
    Ok(config)
}

/// Runs one scenario with tracing on and writes the trace.
fn run_with_export(
    scenario: ScenarioId,
    seed: u64,
    config: SchedulerConfig,
    export_path: &str,
) -> Result<bool, SimError> {
    info!("Running with export to: {}", export_path);

    let runner = ScenarioRunner::new(seed)
        .with_scheduler(config)
        .with_trace(true);
    let (result, trace) = runner.run_traced(scenario);

    if let Some(trace) = trace {
        trace.write_to_file(export_path)?;
        info!("Exported {} frames to {}", trace.frames.len(), export_path);
    }

    if result.passed {
        info!("✓ {} (seed={}) PASSED - exported to {}", scenario.name(), seed, export_path);
    } else {
        error!(
            "✗ {} FAILED: {}",
            scenario.name(),
            result.failure_reason.as_deref().unwrap_or("unknown")
        );
    }
    Ok(result.passed)
}

/// Parses `--duration`: positive and small enough for a `Duration`.
fn realtime_duration(secs: f64) -> Result<Duration, SimError> {
    if secs <= 0.0 {
        return Err(SimError::check(format!("invalid duration: {}", secs)));
    }
    Duration::try_from_secs_f64(secs).map_err(|e| SimError::check(format!("invalid duration {}: {}", secs, e)))
}

/// Drives a preset gate on the tokio clock and reports its output.
fn run_realtime(layout: LayoutId, config: SchedulerConfig, duration_secs: f64) -> Result<bool, SimError> {
    let duration = realtime_duration(duration_secs)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;

    runtime.block_on(async {
        let mut scheduler = Scheduler::new(TokioContext::shared(), config.clone())?;
        scheduler.import_layout(&layout.layout(), Coord::new(0, 0))?;
        scheduler.start(config.tick_interval)?;

        info!("Driving {} for {:.1}s in real time", layout, duration_secs);
        scheduler.run_for(duration).await;

        let circuit = scheduler.circuit();
        let inputs: Vec<bool> = layout
            .inputs()
            .into_iter()
            .map(|pos| circuit.occupant(pos).is_some_and(|i| i.is_active()))
            .collect();
        let lit = circuit
            .occupant(layout.output())
            .is_some_and(|i| i.is_active());
        let want = layout.expected(&inputs);

        info!("{} inputs {:?} -> LED {} (expected {})", layout, inputs, lit, want);
        info!("{}", scheduler.metrics());
        Ok::<bool, SimError>(lit == want)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_realtime_duration_bounds() {
        assert_eq!(realtime_duration(1.5).unwrap(), Duration::from_millis(1500));
        assert!(realtime_duration(0.0).is_err());
        assert!(realtime_duration(-2.0).is_err());
        assert!(realtime_duration(f64::NAN).is_err());
        assert!(realtime_duration(f64::INFINITY).is_err());
        assert!(realtime_duration(1e30).is_err());
    }
}
