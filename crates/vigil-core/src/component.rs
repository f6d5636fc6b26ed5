//! Component identity and lifecycle contract.
//!
//! Every pluggable capability instance (watcher, registry, trigger,
//! authentication) is a component: it carries a kind, a provider type, an
//! instance name, and a derived id, and it participates in the registry
//! lifecycle through async init/deregister hooks. Capability behavior is
//! expressed through per-kind traits extending [`Component`]; there is no
//! inheritance hierarchy beyond that.

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::error::ComponentError;

/// The four pluggable capability families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    /// Watches a container engine and produces reports.
    Watcher,

    /// Resolves tags and digests for one registry backend.
    Registry,

    /// Reacts to reports by firing an action.
    Trigger,

    /// Authenticates API users.
    Authentication,
}

impl ComponentKind {
    /// Returns the lowercase kind name used in ids and configuration keys.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Watcher => "watcher",
            Self::Registry => "registry",
            Self::Trigger => "trigger",
            Self::Authentication => "authentication",
        }
    }

    /// Returns the documentation pointer for this kind.
    #[must_use]
    pub const fn docs(&self) -> &'static str {
        match self {
            Self::Watcher => "https://github.com/vigil-dev/vigil/tree/main/docs/configuration/watchers",
            Self::Registry => "https://github.com/vigil-dev/vigil/tree/main/docs/configuration/registries",
            Self::Trigger => "https://github.com/vigil-dev/vigil/tree/main/docs/configuration/triggers",
            Self::Authentication => {
                "https://github.com/vigil-dev/vigil/tree/main/docs/configuration/authentications"
            }
        }
    }
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identity shared by every component instance.
///
/// Provider type and instance name are lowercased at construction; the id
/// is derived as `provider.name` and is unique within a kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentMeta {
    kind: ComponentKind,
    provider: String,
    name: String,
    id: String,
}

impl ComponentMeta {
    /// Creates the identity for a component instance.
    #[must_use]
    pub fn new(kind: ComponentKind, provider: &str, name: &str) -> Self {
        let provider = provider.to_lowercase();
        let name = name.to_lowercase();
        let id = format!("{provider}.{name}");
        Self {
            kind,
            provider,
            name,
            id,
        }
    }

    /// Component kind.
    #[must_use]
    pub const fn kind(&self) -> ComponentKind {
        self.kind
    }

    /// Provider type (e.g. `docker`, `hub`).
    #[must_use]
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Instance name (e.g. `local`, `public`).
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Derived id, `provider.name`.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl std::fmt::Debug for dyn Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Component").field("id", &self.meta().id()).finish()
    }
}

/// Lifecycle contract implemented by every capability instance.
#[async_trait]
pub trait Component: Send + Sync {
    /// Returns the component identity.
    fn meta(&self) -> &ComponentMeta;

    /// Called once after successful registration.
    async fn init(&self) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Called on deregistration to release resources.
    async fn deregister(&self) -> Result<(), ComponentError> {
        Ok(())
    }
}

/// Configuration contract for component config types.
///
/// Deserialization handles shape and defaults; `validate` covers the
/// cross-field rules serde cannot express.
pub trait ComponentConfig: DeserializeOwned {
    /// Validates cross-field constraints.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// Deserializes and validates a component configuration value.
///
/// # Errors
///
/// Returns [`ComponentError::Configuration`] naming the component when the
/// value does not match the schema or fails validation.
pub fn parse_config<C: ComponentConfig>(
    meta: &ComponentMeta,
    value: serde_json::Value,
) -> Result<C, ComponentError> {
    let config: C =
        serde_json::from_value(value).map_err(|e| ComponentError::Configuration {
            component: meta.id().to_string(),
            reason: e.to_string(),
        })?;
    config.validate().map_err(|reason| ComponentError::Configuration {
        component: meta.id().to_string(),
        reason,
    })?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct DummyConfig {
        #[serde(default = "default_port")]
        port: u16,
        host: Option<String>,
    }

    fn default_port() -> u16 {
        2375
    }

    impl ComponentConfig for DummyConfig {
        fn validate(&self) -> Result<(), String> {
            if self.port == 0 {
                return Err("port must be non-zero".to_string());
            }
            Ok(())
        }
    }

    #[test]
    fn test_meta_lowercases_and_derives_id() {
        let meta = ComponentMeta::new(ComponentKind::Trigger, "Slack", "MyTeam");
        assert_eq!(meta.provider(), "slack");
        assert_eq!(meta.name(), "myteam");
        assert_eq!(meta.id(), "slack.myteam");
    }

    #[test]
    fn test_parse_config_applies_defaults() {
        let meta = ComponentMeta::new(ComponentKind::Watcher, "docker", "local");
        let config: DummyConfig = parse_config(&meta, serde_json::json!({})).unwrap();
        assert_eq!(config.port, 2375);
        assert!(config.host.is_none());
    }

    #[test]
    fn test_parse_config_rejects_unknown_fields() {
        let meta = ComponentMeta::new(ComponentKind::Watcher, "docker", "local");
        let result: Result<DummyConfig, _> =
            parse_config(&meta, serde_json::json!({"bogus": true}));
        let err = result.unwrap_err();
        assert!(err.to_string().contains("docker.local"));
    }

    #[test]
    fn test_parse_config_runs_validate_hook() {
        let meta = ComponentMeta::new(ComponentKind::Watcher, "docker", "local");
        let result: Result<DummyConfig, _> =
            parse_config(&meta, serde_json::json!({"port": 0}));
        assert!(result.unwrap_err().to_string().contains("non-zero"));
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ComponentKind::Authentication.to_string(), "authentication");
    }
}
