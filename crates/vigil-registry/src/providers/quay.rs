//! Quay.io.

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

const DOMAIN: &str = "quay.io";
const AUTH_URL: &str = "https://quay.io/v2/auth";

/// Configuration of a Quay instance.
///
/// Robot-account credentials are `namespace+account:token`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuayConfig {
    /// Robot account namespace.
    pub namespace: Option<String>,

    /// Robot account name.
    pub account: Option<String>,

    /// Robot account token.
    pub token: Option<String>,
}

impl ComponentConfig for QuayConfig {
    fn validate(&self) -> Result<(), String> {
        let provided =
            [&self.namespace, &self.account, &self.token].iter().filter(|v| v.is_some()).count();
        if provided != 0 && provided != 3 {
            return Err("namespace, account and token must be provided together".to_string());
        }
        Ok(())
    }
}

/// Quay registry provider.
pub struct QuayRegistry {
    meta: ComponentMeta,
    client: OciClient,
}

impl QuayRegistry {
    /// Builds the component from its validated configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the HTTP client cannot be
    /// built.
    pub fn new(meta: ComponentMeta, config: &QuayConfig) -> Result<Self, ComponentError> {
        let credentials = match (&config.namespace, &config.account, &config.token) {
            (Some(namespace), Some(account), Some(token)) => Some(
                AuthScheme::encode_credentials(&format!("{namespace}+{account}"), token),
            ),
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

/// Factory for `quay` instances.
pub(crate) fn factory(
    meta: ComponentMeta,
    value: serde_json::Value,
) -> Result<Arc<dyn RegistryProvider>, ComponentError> {
    let config: QuayConfig = parse_config(&meta, value)?;
    Ok(Arc::new(QuayRegistry::new(meta, &config)?))
}

impl Component for QuayRegistry {
    fn meta(&self) -> &ComponentMeta {
        &self.meta
    }
}

#[async_trait]
impl RegistryProvider for QuayRegistry {
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
