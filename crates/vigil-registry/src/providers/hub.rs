//! Docker Hub.
//!
//! Hub is the implicit registry of images with no domain; pulls always go
//! through the token service, anonymously unless credentials are
//! configured. Official images live under the `library/` namespace,
//! which stays hidden in user-facing names.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use vigil_core::component::{parse_config, Component, ComponentConfig, ComponentMeta};
use vigil_core::container::ContainerImage;
use vigil_core::error::ComponentError;
use vigil_core::registry::{ManifestDigest, ProviderError, RegistryProvider};

use crate::client::OciClient;
use crate::config::{resolve_credentials, validate_credentials, AuthScheme};
use crate::providers::manifest_digest;

const REGISTRY_URL: &str = "https://registry-1.docker.io/v2";
const AUTH_URL: &str = "https://auth.docker.io/token";
const AUTH_SERVICE: &str = "registry.docker.io";

/// Configuration of a Docker Hub instance.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HubConfig {
    /// Hub login.
    pub login: Option<String>,

    /// Hub password or personal access token.
    pub password: Option<String>,

    /// Legacy alias for `password`.
    pub token: Option<String>,

    /// Pre-encoded `base64(login:password)` alternative.
    pub auth: Option<String>,
}

impl ComponentConfig for HubConfig {
    fn validate(&self) -> Result<(), String> {
        if self.password.is_some() && self.token.is_some() {
            return Err("password and token are mutually exclusive".to_string());
        }
        validate_credentials(
            self.login.as_deref(),
            self.password.as_deref().or(self.token.as_deref()),
            self.auth.as_deref(),
        )
    }
}

/// Docker Hub registry provider.
pub struct HubRegistry {
    meta: ComponentMeta,
    client: OciClient,
}

impl HubRegistry {
    /// Builds the component from its validated configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the HTTP client cannot be
    /// built.
    pub fn new(meta: ComponentMeta, config: &HubConfig) -> Result<Self, ComponentError> {
        let credentials = resolve_credentials(
            config.login.as_deref(),
            config.password.as_deref().or(config.token.as_deref()),
            config.auth.as_deref(),
        );
        let auth = AuthScheme::token_service(AUTH_URL, Some(AUTH_SERVICE), credentials);
        let client = OciClient::new(auth).map_err(|e| ComponentError::Configuration {
            component: meta.id().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { meta, client })
    }

    /// Returns true for the docker.io domain family (including the empty
    /// domain of unqualified image references).
    #[must_use]
    pub fn is_hub_domain(domain: &str) -> bool {
        domain.is_empty() || domain == "docker.io" || domain.ends_with(".docker.io")
    }
}

/// Factory for `hub` instances.
pub(crate) fn factory(
    meta: ComponentMeta,
    value: serde_json::Value,
) -> Result<Arc<dyn RegistryProvider>, ComponentError> {
    let config: HubConfig = parse_config(&meta, value)?;
    Ok(Arc::new(HubRegistry::new(meta, &config)?))
}

impl Component for HubRegistry {
    fn meta(&self) -> &ComponentMeta {
        &self.meta
    }
}

#[async_trait]
impl RegistryProvider for HubRegistry {
    fn match_image(&self, image: &ContainerImage) -> bool {
        Self::is_hub_domain(&crate::providers::domain_of(&image.registry.url))
    }

    fn normalize_image(&self, mut image: ContainerImage) -> ContainerImage {
        if !image.name.contains('/') {
            image.name = format!("library/{}", image.name);
        }
        image.registry.url = REGISTRY_URL.to_string();
        image
    }

    fn image_full_name(&self, image: &ContainerImage, tag_value: &str) -> String {
        let name = image.name.strip_prefix("library/").unwrap_or(&image.name);
        format!("{name}:{tag_value}")
    }

    async fn get_tags(&self, image: &ContainerImage) -> Result<Vec<String>, ProviderError> {
        self.client.get_tags(image).await.map_err(Into::into)
    }

    async fn get_image_manifest_digest(
        &self,
        image: &ContainerImage,
        digest_scope: Option<&str>,
    ) -> Result<ManifestDigest, ProviderError> {
        manifest_digest(&self.client, image, digest_scope).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::tests::raw_image;
    use vigil_core::component::ComponentKind;

    fn registry() -> HubRegistry {
        let meta = ComponentMeta::new(ComponentKind::Registry, "hub", "public");
        HubRegistry::new(meta, &HubConfig::default()).unwrap()
    }

    #[test]
    fn test_match_hub_domains() {
        let registry = registry();
        assert!(registry.match_image(&raw_image("", "nginx", "1.25")));
        assert!(registry.match_image(&raw_image("docker.io", "nginx", "1.25")));
        assert!(registry.match_image(&raw_image("registry-1.docker.io", "nginx", "1.25")));
        assert!(!registry.match_image(&raw_image("ghcr.io", "nginx", "1.25")));
    }

    #[test]
    fn test_normalize_adds_library_namespace() {
        let registry = registry();
        let image = registry.normalize_image(raw_image("", "nginx", "1.25"));
        assert_eq!(image.name, "library/nginx");
        assert_eq!(image.registry.url, "https://registry-1.docker.io/v2");

        let scoped = registry.normalize_image(raw_image("", "grafana/grafana", "10.0.0"));
        assert_eq!(scoped.name, "grafana/grafana");
    }

    #[test]
    fn test_full_name_hides_library_namespace() {
        let registry = registry();
        let image = registry.normalize_image(raw_image("", "nginx", "1.25"));
        assert_eq!(registry.image_full_name(&image, "1.26"), "nginx:1.26");
    }

    #[test]
    fn test_config_rejects_password_and_token() {
        let config = HubConfig {
            login: Some("me".to_string()),
            password: Some("a".to_string()),
            token: Some("b".to_string()),
            auth: None,
        };
        assert!(config.validate().is_err());
    }
}
