//! Amazon ECR (public gallery).
//!
//! The public gallery at `public.ecr.aws` is served anonymously through
//! its token endpoint. Private ECR needs AWS SigV4 request signing, which
//! is out of scope here, so private credentials are rejected at
//! configuration time rather than failing on first use.

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

const PUBLIC_DOMAIN: &str = "public.ecr.aws";
const AUTH_URL: &str = "https://public.ecr.aws/token";

/// Configuration of an ECR instance.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EcrConfig {
    /// AWS access key id (private registries, unsupported).
    pub accesskeyid: Option<String>,

    /// AWS secret access key (private registries, unsupported).
    pub secretaccesskey: Option<String>,

    /// AWS region (private registries, unsupported).
    pub region: Option<String>,
}

impl ComponentConfig for EcrConfig {
    fn validate(&self) -> Result<(), String> {
        if self.accesskeyid.is_some() || self.secretaccesskey.is_some() || self.region.is_some() {
            return Err(
                "private ECR (SigV4) authentication is not supported; only the anonymous \
                 public gallery is available"
                    .to_string(),
            );
        }
        Ok(())
    }
}

/// Amazon ECR public gallery provider.
pub struct EcrRegistry {
    meta: ComponentMeta,
    client: OciClient,
}

impl EcrRegistry {
    /// Builds the component.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the HTTP client cannot be
    /// built.
    pub fn new(meta: ComponentMeta) -> Result<Self, ComponentError> {
        let auth = AuthScheme::token_service(AUTH_URL, None, None);
        let client = OciClient::new(auth).map_err(|e| ComponentError::Configuration {
            component: meta.id().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { meta, client })
    }
}

/// Factory for `ecr` instances.
pub(crate) fn factory(
    meta: ComponentMeta,
    value: serde_json::Value,
) -> Result<Arc<dyn RegistryProvider>, ComponentError> {
    let _config: EcrConfig = parse_config(&meta, value)?;
    Ok(Arc::new(EcrRegistry::new(meta)?))
}

impl Component for EcrRegistry {
    fn meta(&self) -> &ComponentMeta {
        &self.meta
    }
}

#[async_trait]
impl RegistryProvider for EcrRegistry {
    fn match_image(&self, image: &ContainerImage) -> bool {
        domain_of(&image.registry.url) == PUBLIC_DOMAIN
    }

    fn normalize_image(&self, mut image: ContainerImage) -> ContainerImage {
        image.registry.url = format!("https://{PUBLIC_DOMAIN}/v2");
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
