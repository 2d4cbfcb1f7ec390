//! Error types for the gridlogic environment abstraction.

use thiserror::Error;

/// Errors that can occur in the environment abstraction layer.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvError {
    /// A virtual clock was asked to move backwards
    #[error("Clock regression: now={now_ms}ms, requested={requested_ms}ms")]
    ClockRegression { now_ms: u64, requested_ms: u64 },
}

impl EnvError {
    /// Creates a clock regression error from two durations.
    pub fn regression(now: std::time::Duration, requested: std::time::Duration) -> Self {
        Self::ClockRegression {
            now_ms: now.as_millis() as u64,
            requested_ms: requested.as_millis() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_regression_message() {
        let err = EnvError::regression(Duration::from_millis(300), Duration::from_millis(100));
        assert_eq!(
            err,
            EnvError::ClockRegression { now_ms: 300, requested_ms: 100 }
        );
        assert_eq!(err.to_string(), "Clock regression: now=300ms, requested=100ms");
    }
}
