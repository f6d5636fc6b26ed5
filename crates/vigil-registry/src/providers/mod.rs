//! Built-in registry provider presets.
//!
//! Every preset is a thin composition over [`OciClient`](crate::client::OciClient):
//! it decides which images it matches, how their registry URL and
//! repository name normalize, and which authentication scheme the client
//! uses. The heavy lifting (tags, manifests, token flows) is shared.

mod custom;
mod ecr;
mod gcr;
mod ghcr;
mod gitea;
mod hub;
mod quay;

pub use custom::{CustomConfig, CustomRegistry};
pub use ecr::{EcrConfig, EcrRegistry};
pub use gcr::{GcrConfig, GcrRegistry};
pub use ghcr::{GhcrConfig, GhcrRegistry};
pub use gitea::{GiteaConfig, GiteaRegistry};
pub use hub::{HubConfig, HubRegistry};
pub use quay::{QuayConfig, QuayRegistry};

use std::sync::Arc;

use vigil_core::container::ContainerImage;
use vigil_core::registry::{ManifestDigest, ProviderError, RegistryProvider};
use vigil_core::state::KindRegistry;

use crate::client::OciClient;

/// Registers every built-in provider factory.
pub fn install_factories(registry: &KindRegistry<dyn RegistryProvider>) {
    registry.add_factory("custom", Arc::new(custom::custom_factory));
    registry.add_factory("hub", Arc::new(hub::factory));
    registry.add_factory("ghcr", Arc::new(ghcr::factory));
    registry.add_factory("quay", Arc::new(quay::factory));
    registry.add_factory("gcr", Arc::new(gcr::factory));
    registry.add_factory("ecr", Arc::new(ecr::factory));
    registry.add_factory("gitea", Arc::new(gitea::gitea_factory));
    registry.add_factory("forgejo", Arc::new(gitea::forgejo_factory));
    registry.add_factory("codeberg", Arc::new(gitea::codeberg_factory));
}

/// Strips the scheme and `/v2` suffix from a registry URL, yielding the
/// bare lowercase domain used for matching.
#[must_use]
pub fn domain_of(url: &str) -> String {
    let without_scheme = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let without_path = without_scheme
        .strip_suffix("/v2")
        .unwrap_or(without_scheme)
        .trim_end_matches('/');
    without_path.to_lowercase()
}

/// Default full-name rendering: `domain/name:tag` (or `domain/name@digest`
/// when the reference is a digest).
#[must_use]
pub fn default_full_name(image: &ContainerImage, reference: &str) -> String {
    let domain = domain_of(&image.registry.url);
    if reference.starts_with("sha256:") {
        format!("{domain}/{}@{reference}", image.name)
    } else {
        format!("{domain}/{}:{reference}", image.name)
    }
}

/// Shared manifest digest lookup: target the scope digest when given,
/// the current tag otherwise.
pub(crate) async fn manifest_digest(
    client: &OciClient,
    image: &ContainerImage,
    digest_scope: Option<&str>,
) -> Result<ManifestDigest, ProviderError> {
    let reference = digest_scope.unwrap_or(image.tag.value.as_str());
    client
        .get_manifest_digest(image, reference)
        .await
        .map_err(Into::into)
}
