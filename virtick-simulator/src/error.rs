use thiserror::Error;
use virtick_core::ClockError;

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("Scenario has {steps} steps, limit is {limit}")]
    TooManySteps { steps: usize, limit: usize },

    #[error("Ticker '{name}' would deliver {ticks} ticks in one advance, limit is {limit}")]
    TooManyTicks { name: String, ticks: u64, limit: u64 },

    #[error("Handle '{0}' is defined more than once")]
    DuplicateHandle(String),

    #[error("Unknown handle '{0}'")]
    UnknownHandle(String),

    #[error("Expected {expected} pending sleepers, found {actual}")]
    PendingMismatch { expected: usize, actual: usize },

    #[error("Timeline inconsistency: {0}")]
    Inconsistent(String),

    #[error("Timeline digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },

    #[error("Clock error: {0}")]
    Clock(#[from] ClockError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Scenario format error: {0}")]
    Format(#[from] serde_yaml::Error),

    #[error("Firing consumer exited unexpectedly")]
    ConsumerLost,
}
