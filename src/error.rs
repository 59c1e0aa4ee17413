//! Error types shared by the timer, the history store and the storage ports.

use thiserror::Error;

use crate::timer::TimerStatus;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// An operation was attempted in a state that forbids it
    #[error("cannot {operation} while the timer is {state}")]
    InvalidState {
        operation: &'static str,
        state: TimerStatus,
    },

    /// Requested duration was non-positive or could not be parsed
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Persisted history could not be read back
    #[error("persisted history is corrupt: {0}")]
    PersistenceCorrupt(String),

    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn invalid_state(operation: &'static str, state: TimerStatus) -> Self {
        Self::InvalidState { operation, state }
    }
}
