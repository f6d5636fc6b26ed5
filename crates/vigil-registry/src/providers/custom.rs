//! Self-hosted OCI registry with an explicit URL.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use vigil_core::component::{parse_config, Component, ComponentConfig, ComponentMeta};
use vigil_core::container::ContainerImage;
use vigil_core::error::ComponentError;
use vigil_core::registry::{ManifestDigest, ProviderError, RegistryProvider};

use crate::client::OciClient;
use crate::config::{resolve_credentials, validate_credentials, AuthScheme};
use crate::providers::{default_full_name, domain_of, manifest_digest};

/// Configuration of a custom registry instance.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CustomConfig {
    /// Registry URL (scheme optional, https assumed).
    pub url: String,

    /// Login for basic authentication.
    pub login: Option<String>,

    /// Password for basic authentication.
    pub password: Option<String>,

    /// Pre-encoded `base64(login:password)` alternative.
    pub auth: Option<String>,
}

impl ComponentConfig for CustomConfig {
    fn validate(&self) -> Result<(), String> {
        if self.url.trim().is_empty() {
            return Err("url is required".to_string());
        }
        validate_credentials(
            self.login.as_deref(),
            self.password.as_deref(),
            self.auth.as_deref(),
        )
    }
}

/// A registry reachable at a user-configured URL with basic auth.
pub struct CustomRegistry {
    meta: ComponentMeta,
    url: String,
    client: OciClient,
}

impl CustomRegistry {
    /// Builds the component from its validated configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the HTTP client cannot be
    /// built.
    pub fn new(meta: ComponentMeta, config: &CustomConfig) -> Result<Self, ComponentError> {
        let url = ensure_https(&config.url);
        let credentials = resolve_credentials(
            config.login.as_deref(),
            config.password.as_deref(),
            config.auth.as_deref(),
        );
        let auth = match credentials {
            Some(credentials) => AuthScheme::Basic { credentials },
            None => AuthScheme::None,
        };
        let client = OciClient::new(auth).map_err(|e| ComponentError::Configuration {
            component: meta.id().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { meta, url, client })
    }
}

/// Prepends `https://` when the URL has no scheme.
fn ensure_https(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    if trimmed.to_lowercase().starts_with("http") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

/// Factory for `custom` instances.
pub(crate) fn custom_factory(
    meta: ComponentMeta,
    value: serde_json::Value,
) -> Result<Arc<dyn RegistryProvider>, ComponentError> {
    let config: CustomConfig = parse_config(&meta, value)?;
    Ok(Arc::new(CustomRegistry::new(meta, &config)?))
}

impl Component for CustomRegistry {
    fn meta(&self) -> &ComponentMeta {
        &self.meta
    }
}

#[async_trait]
impl RegistryProvider for CustomRegistry {
    fn match_image(&self, image: &ContainerImage) -> bool {
        domain_of(&image.registry.url) == domain_of(&self.url)
    }

    fn normalize_image(&self, mut image: ContainerImage) -> ContainerImage {
        image.registry.url = format!("{}/v2", self.url);
        image
    }

    fn image_full_name(&self, image: &ContainerImage, tag_value: &str) -> String {
        default_full_name(image, tag_value)
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

    fn registry(url: &str) -> CustomRegistry {
        let meta = ComponentMeta::new(ComponentKind::Registry, "custom", "mine");
        let config = CustomConfig {
            url: url.to_string(),
            login: None,
            password: None,
            auth: None,
        };
        CustomRegistry::new(meta, &config).unwrap()
    }

    #[test]
    fn test_match_on_configured_domain() {
        let registry = registry("registry.example.com");
        assert!(registry.match_image(&raw_image("registry.example.com", "app", "1.0.0")));
        assert!(!registry.match_image(&raw_image("other.example.com", "app", "1.0.0")));
    }

    #[test]
    fn test_normalize_sets_v2_url() {
        let registry = registry("registry.example.com");
        let image = registry.normalize_image(raw_image("registry.example.com", "app", "1.0.0"));
        assert_eq!(image.registry.url, "https://registry.example.com/v2");
    }

    #[test]
    fn test_config_requires_url() {
        let config = CustomConfig {
            url: "  ".to_string(),
            login: None,
            password: None,
            auth: None,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_full_name() {
        let registry = registry("registry.example.com");
        let image = registry.normalize_image(raw_image("registry.example.com", "app", "1.0.0"));
        assert_eq!(
            registry.image_full_name(&image, "2.0.0"),
            "registry.example.com/app:2.0.0"
        );
    }
}
