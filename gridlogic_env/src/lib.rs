//! gridlogic Environment Abstraction Layer
//!
//! This crate provides the "Sans-IO" abstraction that lets the gridlogic
//! scheduler run against both **real time** (tokio) and **virtual time**
//! (the deterministic harness in `gridlogic_sim`).
//!
//! # Core Concept
//!
//! The simulation core never reads a clock or sleeps directly. Every
//! time-related call goes through [`GridContext`]:
//! - `now()` stamps tick and delayed-effect deadlines
//! - `sleep()` waits for the next deadline
//!
//! In simulation `sleep()` simply advances the virtual clock, so a run is
//! reproducible tick for tick.
//!
//! # Example
//!
//! ```ignore
//! use gridlogic_env::{GridContext, TokioContext};
//!
//! async fn drive<Ctx: GridContext>(ctx: &Ctx) {
//!     loop {
//!         ctx.sleep(Duration::from_millis(100)).await;
//!         tick();
//!     }
//! }
//! ```

mod context;
mod error;
mod tokio_impl;

pub use context::GridContext;
pub use error::EnvError;
pub use tokio_impl::TokioContext;
