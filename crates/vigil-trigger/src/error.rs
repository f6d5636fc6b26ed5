//! Error types for the trigger crate.

use thiserror::Error;

/// Result type alias for trigger operations.
pub type Result<T> = std::result::Result<T, TriggerError>;

/// Errors raised by trigger actions.
#[derive(Error, Debug)]
pub enum TriggerError {
    /// The action's install hook failed.
    #[error("trigger installation failed: {reason}")]
    Install {
        /// Failure description.
        reason: String,
    },

    /// The action itself failed.
    #[error("{reason}")]
    Action {
        /// Failure description.
        reason: String,
    },
}

impl TriggerError {
    /// Wraps any displayable error as an action failure.
    #[must_use]
    pub fn action(source: impl std::fmt::Display) -> Self {
        Self::Action {
            reason: source.to_string(),
        }
    }
}
