//! Authentication capability contract and built-in strategies.

use async_trait::async_trait;
use serde::Deserialize;

use crate::component::{Component, ComponentConfig, ComponentMeta};

/// An authenticated API user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// User name.
    pub username: String,
}

/// Capability contract for authentication strategies.
#[async_trait]
pub trait Authentication: Component {
    /// Strategy name exposed to the hosting layer.
    fn strategy(&self) -> &'static str;

    /// Checks credentials, returning the user on success.
    fn authenticate(&self, username: &str, password: &str) -> Option<AuthenticatedUser>;
}

/// Anonymous strategy: every request is allowed.
pub struct AnonymousAuth {
    meta: ComponentMeta,
}

/// Anonymous strategy configuration (empty).
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnonymousAuthConfig {}

impl ComponentConfig for AnonymousAuthConfig {}

impl AnonymousAuth {
    /// Creates the anonymous strategy.
    #[must_use]
    pub fn new(meta: ComponentMeta) -> Self {
        Self { meta }
    }
}

impl Component for AnonymousAuth {
    fn meta(&self) -> &ComponentMeta {
        &self.meta
    }
}

impl Authentication for AnonymousAuth {
    fn strategy(&self) -> &'static str {
        "anonymous"
    }

    fn authenticate(&self, username: &str, _password: &str) -> Option<AuthenticatedUser> {
        Some(AuthenticatedUser {
            username: username.to_string(),
        })
    }
}

/// Basic strategy configuration: a user/hash table.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BasicAuthConfig {
    /// Map of username to password.
    pub users: std::collections::HashMap<String, String>,
}

impl ComponentConfig for BasicAuthConfig {
    fn validate(&self) -> Result<(), String> {
        if self.users.is_empty() {
            return Err("at least one user is required".to_string());
        }
        Ok(())
    }
}

/// Basic strategy: username/password lookup.
pub struct BasicAuth {
    meta: ComponentMeta,
    config: BasicAuthConfig,
}

impl BasicAuth {
    /// Creates the basic strategy.
    #[must_use]
    pub fn new(meta: ComponentMeta, config: BasicAuthConfig) -> Self {
        Self { meta, config }
    }
}

impl Component for BasicAuth {
    fn meta(&self) -> &ComponentMeta {
        &self.meta
    }
}

impl Authentication for BasicAuth {
    fn strategy(&self) -> &'static str {
        "basic"
    }

    fn authenticate(&self, username: &str, password: &str) -> Option<AuthenticatedUser> {
        match self.config.users.get(username) {
            Some(expected) if expected == password => Some(AuthenticatedUser {
                username: username.to_string(),
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ComponentKind;

    fn meta(provider: &str) -> ComponentMeta {
        ComponentMeta::new(ComponentKind::Authentication, provider, "test")
    }

    #[test]
    fn test_anonymous_allows_everyone() {
        let auth = AnonymousAuth::new(meta("anonymous"));
        assert!(auth.authenticate("anyone", "anything").is_some());
    }

    #[test]
    fn test_basic_checks_credentials() {
        let config = BasicAuthConfig {
            users: std::collections::HashMap::from([("john".to_string(), "secret".to_string())]),
        };
        let auth = BasicAuth::new(meta("basic"), config);
        assert!(auth.authenticate("john", "secret").is_some());
        assert!(auth.authenticate("john", "wrong").is_none());
        assert!(auth.authenticate("jane", "secret").is_none());
    }

    #[test]
    fn test_basic_config_requires_users() {
        let config = BasicAuthConfig {
            users: std::collections::HashMap::new(),
        };
        assert!(config.validate().is_err());
    }
}
