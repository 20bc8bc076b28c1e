//! Error types for the relay core.

use thiserror::Error;

/// Errors produced while relaying between the chat and the agent.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The chat transport rejected or failed a call.
    #[error("chat transport error: {0}")]
    Transport(String),

    /// A payload could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RelayError {
    /// Build a transport error from anything displayable.
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Convenience alias.
pub type RelayResult<T> = Result<T, RelayError>;
