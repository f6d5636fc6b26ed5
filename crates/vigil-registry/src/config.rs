//! Authentication schemes for registry backends.

use std::time::Duration;

use base64::Engine as _;

/// Default request timeout for registry calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// How a backend authenticates registry API calls.
#[derive(Debug, Clone)]
pub enum AuthScheme {
    /// Anonymous access.
    None,

    /// Basic authentication with pre-encoded credentials.
    Basic {
        /// `base64(login:password)`.
        credentials: String,
    },

    /// Static bearer token.
    Bearer {
        /// Token value.
        token: String,
    },

    /// Token-service flow: fetch a short-lived bearer token scoped to the
    /// repository before each call.
    TokenService {
        /// Token endpoint URL.
        auth_url: String,
        /// `service` query parameter, when the endpoint requires one.
        service: Option<String>,
        /// Optional `base64(login:password)` presented to the endpoint.
        credentials: Option<String>,
    },
}

impl AuthScheme {
    /// Encodes login and password for basic authentication.
    #[must_use]
    pub fn encode_credentials(login: &str, password: &str) -> String {
        base64::engine::general_purpose::STANDARD.encode(format!("{login}:{password}"))
    }

    /// Builds a basic scheme from login and password.
    #[must_use]
    pub fn basic(login: &str, password: &str) -> Self {
        Self::Basic {
            credentials: Self::encode_credentials(login, password),
        }
    }

    /// Builds a token-service scheme.
    #[must_use]
    pub fn token_service(
        auth_url: impl Into<String>,
        service: Option<&str>,
        credentials: Option<String>,
    ) -> Self {
        Self::TokenService {
            auth_url: auth_url.into(),
            service: service.map(str::to_string),
            credentials,
        }
    }
}

/// Resolves the optional credential pair of a provider configuration.
///
/// Providers accept either `login` + `password` or a pre-encoded `auth`
/// string; both at once is rejected at validation time, so here the
/// pre-encoded value simply wins.
#[must_use]
pub fn resolve_credentials(
    login: Option<&str>,
    password: Option<&str>,
    auth: Option<&str>,
) -> Option<String> {
    if let Some(auth) = auth {
        if auth.is_empty() {
            return None;
        }
        return Some(auth.to_string());
    }
    match (login, password) {
        (Some(login), Some(password)) => Some(AuthScheme::encode_credentials(login, password)),
        _ => None,
    }
}

/// Validates the `login`/`password`/`auth` exclusivity rules shared by
/// provider configurations.
///
/// # Errors
///
/// Returns a description of the violated rule.
pub fn validate_credentials(
    login: Option<&str>,
    password: Option<&str>,
    auth: Option<&str>,
) -> Result<(), String> {
    if login.is_some() != password.is_some() {
        return Err("login and password must be provided together".to_string());
    }
    if login.is_some() && auth.is_some() {
        return Err("auth is forbidden when login/password are set".to_string());
    }
    if let Some(auth) = auth {
        if !auth.is_empty()
            && base64::engine::general_purpose::STANDARD
                .decode(auth)
                .is_err()
        {
            return Err("auth must be base64 encoded".to_string());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_credentials() {
        assert_eq!(
            AuthScheme::encode_credentials("user", "pass"),
            "dXNlcjpwYXNz"
        );
    }

    #[test]
    fn test_resolve_credentials_prefers_auth() {
        let resolved = resolve_credentials(Some("u"), Some("p"), Some("abcd"));
        assert_eq!(resolved.as_deref(), Some("abcd"));
    }

    #[test]
    fn test_resolve_credentials_from_login_password() {
        let resolved = resolve_credentials(Some("user"), Some("pass"), None);
        assert_eq!(resolved.as_deref(), Some("dXNlcjpwYXNz"));
    }

    #[test]
    fn test_resolve_credentials_empty_auth_is_anonymous() {
        assert!(resolve_credentials(None, None, Some("")).is_none());
        assert!(resolve_credentials(None, None, None).is_none());
    }

    #[test]
    fn test_validate_credentials() {
        assert!(validate_credentials(Some("u"), Some("p"), None).is_ok());
        assert!(validate_credentials(Some("u"), None, None).is_err());
        assert!(validate_credentials(Some("u"), Some("p"), Some("x")).is_err());
        assert!(validate_credentials(None, None, Some("dXNlcg==")).is_ok());
        assert!(validate_credentials(None, None, Some("!!!")).is_err());
    }
}
