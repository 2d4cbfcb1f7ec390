//! gridlogic Deterministic Simulation Harness
//!
//! Runs the gridlogic scheduler on a virtual clock so every tick and every
//! deferred effect happens at an exact, reproducible instant.
//!
//! # Core Principle
//!
//! All sources of non-determinism are controlled:
//! - **Time**: the virtual clock jumps from deadline to deadline
//! - **Randomness**: random edit sequences derive from a single 64-bit seed
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                      SimWorld                        │
//! │  ┌────────────────────────────────────────────────┐  │
//! │  │ SimContext (virtual clock)                     │  │
//! │  └────────────────────────────────────────────────┘  │
//! │                        │                             │
//! │  ┌─────────────────────▼──────────────────────────┐  │
//! │  │ Scheduler<SimContext>                          │  │
//! │  │   ticks + deferred effects over a Circuit      │  │
//! │  └────────────────────────────────────────────────┘  │
//! │                        ▲                             │
//! │  ┌─────────────────────┴──────────────────────────┐  │
//! │  │ Oracle + audit (checked after every pass)      │  │
//! │  └────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use gridlogic_sim::{ScenarioRunner, scenarios::ScenarioId};
//!
//! let result = ScenarioRunner::new(42).run(ScenarioId::AndGate);
//! assert!(result.passed);
//! ```

mod context;
mod error;
mod exporter;
pub mod oracle;
mod runner;
pub mod scenarios;
mod world;

pub use context::SimContext;
pub use error::SimError;
pub use exporter::{SimExport, TraceFrame};
pub use runner::{ScenarioResult, ScenarioRunner};
pub use world::{SimConfig, SimWorld};
