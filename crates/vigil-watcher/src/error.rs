//! Error types for the watcher crate.

use thiserror::Error;

/// Result type alias for watcher operations.
pub type Result<T> = std::result::Result<T, WatchError>;

/// Errors raised by the container engine adapter.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The engine endpoint cannot be reached.
    #[error("container engine unavailable: {reason}")]
    Unavailable {
        /// Failure description.
        reason: String,
    },

    /// The engine answered with an error.
    #[error("container engine error: {reason}")]
    Api {
        /// Failure description.
        reason: String,
    },

    /// The referenced container or image does not exist.
    #[error("'{reference}' not found on the container engine")]
    NotFound {
        /// Container id or image reference.
        reference: String,
    },
}

/// Errors raised while scanning and resolving updates.
#[derive(Error, Debug)]
pub enum WatchError {
    /// Listing containers failed; the scan cycle is aborted.
    #[error("error when listing containers to watch: {reason}")]
    Scan {
        /// Failure description.
        reason: String,
    },

    /// Version resolution failed for one container.
    #[error("{reason}")]
    Resolution {
        /// Failure description.
        reason: String,
    },

    /// The container references a registry id absent from current state.
    #[error("unsupported registry '{registry}'")]
    UnsupportedRegistry {
        /// Registry component id.
        registry: String,
    },

    /// A per-container include/exclude pattern does not compile.
    #[error("invalid tag pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// Compilation failure.
        reason: String,
    },

    /// An engine call failed.
    #[error(transparent)]
    Engine(#[from] EngineError),
}
