//! JSON trace exporter.
//!
//! Writes one frame per propagation pass so an external viewer can replay a
//! run. This is a simulation trace, not a circuit save format.

use gridlogic_core::{InstanceView, SchedulerConfig, SimMetrics, TickReport};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// State of the grid right after one pass.
#[derive(Debug, Clone, Serialize)]
pub struct TraceFrame {
    /// Virtual time of the pass in milliseconds
    pub time_ms: u64,

    /// Pass number
    pub tick: u64,

    /// Instances whose activation changed during the pass
    pub changed: usize,

    /// Every live instance, sorted by id
    pub instances: Vec<InstanceView>,
}

impl TraceFrame {
    pub fn new(time_ms: u64, report: &TickReport, instances: Vec<InstanceView>) -> Self {
        Self {
            time_ms,
            tick: report.tick,
            changed: report.changed,
            instances,
        }
    }
}

/// Complete trace of a run.
#[derive(Debug, Clone, Serialize)]
pub struct SimExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Timing the run used
    pub config: SchedulerConfig,

    /// Time of the last frame in milliseconds
    pub duration_ms: u64,

    /// All frames
    pub frames: Vec<TraceFrame>,

    /// Final results
    pub passed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<SimMetrics>,
}

impl SimExport {
    pub fn new(scenario: &str, seed: u64, config: SchedulerConfig) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            config,
            duration_ms: 0,
            frames: Vec::new(),
            passed: false,
            metrics: None,
        }
    }

    pub fn add_frame(&mut self, frame: TraceFrame) {
        self.duration_ms = frame.time_ms;
        self.frames.push(frame);
    }

    pub fn finalize(&mut self, passed: bool, metrics: SimMetrics) {
        self.passed = passed;
        self.metrics = Some(metrics);
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = self.to_json()?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridlogic_core::{Circuit, ComponentKind, Coord};

    #[test]
    fn test_frame_lists_instances() {
        let mut circuit = Circuit::new();
        circuit.place(ComponentKind::Button, Coord::new(0, 0)).unwrap();
        circuit.place(ComponentKind::Cable, Coord::new(1, 0)).unwrap();
        let report = circuit.tick();

        let mut export = SimExport::new("cable_chain", 42, SchedulerConfig::default());
        export.add_frame(TraceFrame::new(100, &report, circuit.snapshot()));
        export.finalize(true, SimMetrics::default());

        let json: serde_json::Value = serde_json::from_str(&export.to_json().unwrap()).unwrap();
        assert_eq!(json["duration_ms"], 100);
        assert_eq!(json["config"]["tick_interval_ms"], 100);
        assert_eq!(json["frames"][0]["tick"], 1);

        let cable = &json["frames"][0]["instances"][1];
        assert_eq!(cable["kind"], "cable");
        assert_eq!(cable["position"]["x"], 1);
        assert_eq!(cable["active"], true);
        assert_eq!(cable["color"], "lime");
    }
}
