//! Google Container Registry (gcr.io and its regional subdomains).

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

const DOMAIN: &str = "gcr.io";

/// Configuration of a Google Container Registry instance.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GcrConfig {
    /// Service account client email.
    pub clientemail: Option<String>,

    /// Service account private key.
    pub privatekey: Option<String>,
}

impl ComponentConfig for GcrConfig {
    fn validate(&self) -> Result<(), String> {
        if self.clientemail.is_some() != self.privatekey.is_some() {
            return Err("clientemail and privatekey must be provided together".to_string());
        }
        Ok(())
    }
}

/// Google Container Registry provider.
pub struct GcrRegistry {
    meta: ComponentMeta,
    credentials: Option<String>,
}

impl GcrRegistry {
    /// Builds the component from its validated configuration.
    #[must_use]
    pub fn new(meta: ComponentMeta, config: &GcrConfig) -> Self {
        let credentials = config
            .privatekey
            .as_deref()
            .map(|key| AuthScheme::encode_credentials("_json_key", key));
        Self { meta, credentials }
    }

    /// GCR token endpoints are per-domain, so the client is built per
    /// call against the image's own (possibly regional) domain.
    fn client_for(&self, image: &ContainerImage) -> Result<OciClient, ProviderError> {
        let domain = domain_of(&image.registry.url);
        let auth = AuthScheme::token_service(
            format!("https://{domain}/v2/token"),
            Some(&domain),
            self.credentials.clone(),
        );
        OciClient::new(auth).map_err(ProviderError::new)
    }
}

/// Factory for `gcr` instances.
pub(crate) fn factory(
    meta: ComponentMeta,
    value: serde_json::Value,
) -> Result<Arc<dyn RegistryProvider>, ComponentError> {
    let config: GcrConfig = parse_config(&meta, value)?;
    Ok(Arc::new(GcrRegistry::new(meta, &config)))
}

impl Component for GcrRegistry {
    fn meta(&self) -> &ComponentMeta {
        &self.meta
    }
}

#[async_trait]
impl RegistryProvider for GcrRegistry {
    fn match_image(&self, image: &ContainerImage) -> bool {
        let domain = domain_of(&image.registry.url);
        domain == DOMAIN || domain.ends_with(".gcr.io")
    }

    fn normalize_image(&self, mut image: ContainerImage) -> ContainerImage {
        let domain = domain_of(&image.registry.url);
        image.registry.url = format!("https://{domain}/v2");
        image
    }

    fn image_full_name(&self, image: &ContainerImage, tag_value: &str) -> String {
        default_full_name(image, tag_value)
    }

    async fn get_tags(&self, image: &ContainerImage) -> Result<Vec<String>, ProviderError> {
        self.client_for(image)?
            .get_tags(image)
            .await
            .map_err(Into::into)
    }

    async fn get_image_manifest_digest(
        &self,
        image: &ContainerImage,
        digest_scope: Option<&str>,
    ) -> Result<ManifestDigest, ProviderError> {
        let client = self.client_for(image)?;
        manifest_digest(&client, image, digest_scope).await
    }
}
