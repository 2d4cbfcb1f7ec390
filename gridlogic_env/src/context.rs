//! Core environment context trait for the gridlogic scheduler.

use async_trait::async_trait;
use std::time::Duration;

/// The clock the scheduler runs against.
///
/// # Implementations
///
/// - **Production**: `TokioContext` - wraps `tokio::time`
/// - **Simulation**: `SimContext` (in `gridlogic_sim`) - a virtual clock
///
/// # Determinism
///
/// Tick deadlines and delayed-effect deadlines are computed only from
/// `now()`, so a context with a controlled clock yields a reproducible run.
#[async_trait]
pub trait GridContext: Send + Sync + 'static {
    /// Returns the current monotonic time since context creation.
    ///
    /// In simulation, this is the virtual clock time.
    fn now(&self) -> Duration;

    /// Suspends execution for the given duration.
    ///
    /// In production: wraps `tokio::time::sleep`
    /// In simulation: advances the virtual clock
    async fn sleep(&self, duration: Duration);
}
