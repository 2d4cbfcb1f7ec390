//! Error types for the simulation harness.

use gridlogic_core::{ConfigError, EditError};
use gridlogic_env::EnvError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Edit rejected: {0}")]
    Edit(#[from] EditError),

    #[error("Clock error: {0}")]
    Env(#[from] EnvError),

    /// The run hit `max_ticks` before finishing
    #[error("Tick limit of {0} reached")]
    TickLimit(u64),

    /// A scenario check failed
    #[error("{0}")]
    Check(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SimError {
    pub fn check(msg: impl Into<String>) -> Self {
        Self::Check(msg.into())
    }
}
