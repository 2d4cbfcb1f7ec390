//! Simulation context implementing GridContext for deterministic testing.

use async_trait::async_trait;
use gridlogic_env::{EnvError, GridContext};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Simulation context backed by a virtual clock.
///
/// Clones share the clock, so a scheduler and the harness driving it always
/// agree on the time. `sleep` returns at once after advancing the clock.
#[derive(Debug, Clone)]
pub struct SimContext {
    /// Seed of the run this clock belongs to
    seed: u64,

    /// Current virtual time (nanoseconds since simulation start)
    virtual_time_ns: Arc<Mutex<u64>>,
}

impl SimContext {
    /// Creates a new SimContext at time zero.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            virtual_time_ns: Arc::new(Mutex::new(0)),
        }
    }

    /// Creates an Arc-wrapped context for sharing.
    pub fn shared(seed: u64) -> Arc<Self> {
        Arc::new(Self::new(seed))
    }

    /// Advances virtual time by the given duration.
    pub fn advance_time(&self, duration: Duration) {
        let mut time = self.clock();
        *time = time.saturating_add(duration.as_nanos() as u64);
    }

    /// Moves the clock to `target`. The clock never runs backwards.
    pub fn set_time(&self, target: Duration) -> Result<(), EnvError> {
        let mut time = self.clock();
        let now = Duration::from_nanos(*time);
        if target < now {
            return Err(EnvError::regression(now, target));
        }
        *time = target.as_nanos() as u64;
        Ok(())
    }

    /// Returns the current virtual time in nanoseconds.
    pub fn time_ns(&self) -> u64 {
        *self.clock()
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    fn clock(&self) -> MutexGuard<'_, u64> {
        // a poisoned clock still holds a valid u64
        self.virtual_time_ns
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl GridContext for SimContext {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.time_ns())
    }

    async fn sleep(&self, duration: Duration) {
        self.advance_time(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sim_context_time() {
        let ctx = SimContext::new(42);
        assert_eq!(ctx.now(), Duration::ZERO);

        ctx.advance_time(Duration::from_secs(1));
        assert_eq!(ctx.now(), Duration::from_secs(1));

        ctx.advance_time(Duration::from_millis(500));
        assert_eq!(ctx.now(), Duration::from_millis(1500));
    }

    #[test]
    fn test_set_time_refuses_regression() {
        let ctx = SimContext::new(1);
        ctx.set_time(Duration::from_millis(300)).unwrap();

        let err = ctx.set_time(Duration::from_millis(100)).unwrap_err();
        assert_eq!(err, EnvError::ClockRegression { now_ms: 300, requested_ms: 100 });
        assert_eq!(ctx.now(), Duration::from_millis(300));

        assert!(ctx.set_time(Duration::from_millis(300)).is_ok());
    }

    #[test]
    fn test_sim_context_clone_shares_time() {
        let ctx1 = SimContext::new(42);
        let ctx2 = ctx1.clone();

        ctx1.advance_time(Duration::from_secs(5));

        assert_eq!(ctx1.now(), ctx2.now());
        assert_eq!(ctx2.seed(), 42);
    }

    #[tokio::test]
    async fn test_sleep_advances_virtual_time() {
        let ctx = SimContext::new(7);
        ctx.sleep(Duration::from_millis(250)).await;
        assert_eq!(ctx.now(), Duration::from_millis(250));
    }
}
