//! GitHub Container Registry.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use vigil_core::component::{parse_config, Component, ComponentConfig, ComponentMeta};
use vigil_core::container::ContainerImage;
use vigil_core::error::ComponentError;
use vigil_core::registry::{ManifestDigest, ProviderError, RegistryProvider};

use crate::client::OciClient;
use crate::config::AuthScheme;
use crate::providers::{default_full_name, domain_of, manifest_digest};

const DOMAIN: &str = "ghcr.io";
const AUTH_URL: &str = "https://ghcr.io/token";

/// Configuration of a GitHub Container Registry instance.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GhcrConfig {
    /// GitHub username.
    pub username: Option<String>,

    /// GitHub personal access token.
    pub token: Option<String>,
}

impl ComponentConfig for GhcrConfig {
    fn validate(&self) -> Result<(), String> {
        if self.username.is_some() != self.token.is_some() {
            return Err("username and token must be provided together".to_string());
        }
        Ok(())
    }
}

/// GitHub Container Registry provider.
pub struct GhcrRegistry {
    meta: ComponentMeta,
    client: OciClient,
}

impl GhcrRegistry {
    /// Builds the component from its validated configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the HTTP client cannot be
    /// built.
    pub fn new(meta: ComponentMeta, config: &GhcrConfig) -> Result<Self, ComponentError> {
        let credentials = match (&config.username, &config.token) {
            (Some(username), Some(token)) => {
                Some(AuthScheme::encode_credentials(username, token))
            }
            _ => None,
        };
        let auth = AuthScheme::token_service(AUTH_URL, Some(DOMAIN), credentials);
        let client = OciClient::new(auth).map_err(|e| ComponentError::Configuration {
            component: meta.id().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { meta, client })
    }
}

/// Factory for `ghcr` instances.
pub(crate) fn factory(
    meta: ComponentMeta,
    value: serde_json::Value,
) -> Result<Arc<dyn RegistryProvider>, ComponentError> {
    let config: GhcrConfig = parse_config(&meta, value)?;
    Ok(Arc::new(GhcrRegistry::new(meta, &config)?))
}

impl Component for GhcrRegistry {
    fn meta(&self) -> &ComponentMeta {
        &self.meta
    }
}

#[async_trait]
impl RegistryProvider for GhcrRegistry {
    fn match_image(&self, image: &ContainerImage) -> bool {
        domain_of(&image.registry.url) == DOMAIN
    }

    fn normalize_image(&self, mut image: ContainerImage) -> ContainerImage {
        image.registry.url = format!("https://{DOMAIN}/v2");
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
