//! Error types shared by the component registry and the store.

use thiserror::Error;

use crate::component::ComponentKind;

/// Result type alias for component registry operations.
pub type Result<T> = std::result::Result<T, ComponentError>;

/// Errors raised while registering or deregistering components.
#[derive(Error, Debug)]
pub enum ComponentError {
    /// No provider implementation exists for the requested type.
    #[error(
        "unknown {kind} provider '{provider}' (available {kind} providers: {}; see {docs})",
        available.join(", ")
    )]
    UnknownProvider {
        /// Component kind being registered.
        kind: ComponentKind,
        /// Requested provider type.
        provider: String,
        /// Sorted list of known provider types for this kind.
        available: Vec<String>,
        /// Documentation pointer for the kind.
        docs: &'static str,
    },

    /// Configuration failed schema validation.
    #[error("invalid configuration for component '{component}': {reason}")]
    Configuration {
        /// Component id (`provider.name`).
        component: String,
        /// Validation failure.
        reason: String,
    },

    /// The component's init hook failed.
    #[error("error when initializing component '{component}': {reason}")]
    Init {
        /// Component id.
        component: String,
        /// Failure description.
        reason: String,
    },

    /// The component's deregistration hook failed.
    #[error("error when deregistering component '{component}': {reason}")]
    Deregistration {
        /// Component id.
        component: String,
        /// Failure description.
        reason: String,
    },
}

/// Errors raised by container store implementations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The requested container does not exist.
    #[error("container '{id}' not found")]
    NotFound {
        /// Container id.
        id: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_provider_names_alternatives() {
        let err = ComponentError::UnknownProvider {
            kind: ComponentKind::Trigger,
            provider: "slak".to_string(),
            available: vec!["log".to_string(), "slack".to_string()],
            docs: "https://example.com/docs/triggers",
        };
        let message = err.to_string();
        assert!(message.contains("slak"));
        assert!(message.contains("log, slack"));
        assert!(message.contains("docs/triggers"));
    }

    #[test]
    fn test_deregistration_names_component() {
        let err = ComponentError::Deregistration {
            component: "docker.local".to_string(),
            reason: "socket closed".to_string(),
        };
        assert!(err.to_string().contains("docker.local"));
    }
}
