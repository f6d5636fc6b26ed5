//! Error types for registry backends.

use thiserror::Error;

use vigil_core::ProviderError;

/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

/// Errors that can occur while talking to a registry.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// The registry answered with a non-success status.
    #[error("registry error {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body or status text.
        message: String,
    },

    /// The request itself failed (connect, timeout, TLS).
    #[error("registry request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Authentication against the registry failed.
    #[error("registry authentication failed: {message}")]
    AuthenticationFailed {
        /// Failure description.
        message: String,
    },

    /// The manifest response could not be interpreted.
    #[error("invalid manifest for '{reference}': {message}")]
    InvalidManifest {
        /// Manifest reference (tag or digest).
        reference: String,
        /// Failure description.
        message: String,
    },
}

impl From<RegistryError> for ProviderError {
    fn from(error: RegistryError) -> Self {
        Self::new(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_display() {
        let err = RegistryError::Http {
            status: 404,
            message: "repository unknown".to_string(),
        };
        assert!(err.to_string().contains("404"));
        assert!(err.to_string().contains("repository unknown"));
    }

    #[test]
    fn test_provider_error_conversion() {
        let err = RegistryError::AuthenticationFailed {
            message: "bad token".to_string(),
        };
        let provider: ProviderError = err.into();
        assert!(provider.to_string().contains("bad token"));
    }
}
