//! gridlogic Core - Tick-Driven Digital Logic Sandbox
//!
//! A sparse grid of components (buttons, cables, switches, LEDs,
//! comparators, repeaters) whose on/off state is recomputed by a periodic
//! propagation pass:
//! 1. **Store**: O(1) cell lookup via a position index over an id-keyed table
//! 2. **Engine**: per-kind passes in a fixed order, each computed from a
//!    snapshot and committed at once
//! 3. **Deferred effects**: switch settling and repeater pulses as plain data,
//!    re-validated when their deadline fires

pub mod circuit;
pub mod gridlogic_engine;
pub mod gridlogic_kinds;
pub mod gridlogic_space;
pub mod gridlogic_time;
pub mod layout;
pub mod metrics;
pub mod sim_runtime;
pub mod validation;

// Re-export key types for convenience
pub use circuit::Circuit;
pub use gridlogic_engine::{PropagationEngine, KIND_ORDER};
pub use gridlogic_kinds::{ComponentKind, Instance, InstanceView, Palette, Part};
pub use gridlogic_space::{Coord, Direction, EditError, GridStore, InstanceId};
pub use gridlogic_time::{DeferredEffect, EffectDelay, EffectOutcome, EffectQueue};
pub use layout::{Layout, LayoutCell, LayoutId};
pub use metrics::{SimMetrics, TickReport};
pub use sim_runtime::{ConfigError, Scheduler, SchedulerConfig};
pub use validation::{audit, ConsistencyIssue, ConsistencyReport};
