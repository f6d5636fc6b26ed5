//! Gitea-compatible container registries (Gitea, Forgejo, Codeberg).
//!
//! All three speak the same registry dialect: an OCI endpoint under the
//! forge URL with a `container_registry` token service. They differ only
//! in their default URL, so one component type backs the three provider
//! names.

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

const AUTH_SERVICE: &str = "container_registry";

/// Configuration of a Gitea-compatible registry instance.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GiteaConfig {
    /// Forge URL (defaults to the provider's public instance).
    pub url: Option<String>,

    /// Login for the token service.
    pub login: Option<String>,

    /// Password for the token service.
    pub password: Option<String>,

    /// Pre-encoded `base64(login:password)` alternative.
    pub auth: Option<String>,
}

impl ComponentConfig for GiteaConfig {
    fn validate(&self) -> Result<(), String> {
        validate_credentials(
            self.login.as_deref(),
            self.password.as_deref(),
            self.auth.as_deref(),
        )
    }
}

/// Gitea-compatible registry provider.
pub struct GiteaRegistry {
    meta: ComponentMeta,
    url: String,
    client: OciClient,
}

impl GiteaRegistry {
    /// Builds the component from its validated configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the HTTP client cannot be
    /// built.
    pub fn new(
        meta: ComponentMeta,
        config: &GiteaConfig,
        default_url: &str,
    ) -> Result<Self, ComponentError> {
        let url = config.url.as_deref().unwrap_or(default_url);
        let url = if url.to_lowercase().starts_with("http") {
            url.trim_end_matches('/').to_string()
        } else {
            format!("https://{}", url.trim_end_matches('/'))
        };
        let credentials = resolve_credentials(
            config.login.as_deref(),
            config.password.as_deref(),
            config.auth.as_deref(),
        );
        let auth = AuthScheme::token_service(
            format!("{url}/v2/token"),
            Some(AUTH_SERVICE),
            credentials,
        );
        let client = OciClient::new(auth).map_err(|e| ComponentError::Configuration {
            component: meta.id().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { meta, url, client })
    }
}

fn factory_with_default(
    meta: ComponentMeta,
    value: serde_json::Value,
    default_url: &str,
) -> Result<Arc<dyn RegistryProvider>, ComponentError> {
    let config: GiteaConfig = parse_config(&meta, value)?;
    Ok(Arc::new(GiteaRegistry::new(meta, &config, default_url)?))
}

/// Factory for `gitea` instances.
pub(crate) fn gitea_factory(
    meta: ComponentMeta,
    value: serde_json::Value,
) -> Result<Arc<dyn RegistryProvider>, ComponentError> {
    factory_with_default(meta, value, "https://gitea.com")
}

/// Factory for `forgejo` instances.
pub(crate) fn forgejo_factory(
    meta: ComponentMeta,
    value: serde_json::Value,
) -> Result<Arc<dyn RegistryProvider>, ComponentError> {
    factory_with_default(meta, value, "https://codeberg.org")
}

/// Factory for `codeberg` instances.
pub(crate) fn codeberg_factory(
    meta: ComponentMeta,
    value: serde_json::Value,
) -> Result<Arc<dyn RegistryProvider>, ComponentError> {
    factory_with_default(meta, value, "https://codeberg.org")
}

impl Component for GiteaRegistry {
    fn meta(&self) -> &ComponentMeta {
        &self.meta
    }
}

#[async_trait]
impl RegistryProvider for GiteaRegistry {
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
