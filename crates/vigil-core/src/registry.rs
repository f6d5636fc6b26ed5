//! Registry-provider capability contract.
//!
//! A registry provider resolves tag lists and manifest digests for the
//! images of one registry backend. The watcher looks providers up by id
//! in the shared registry state and drives them through this trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::component::Component;
use crate::container::ContainerImage;

/// Failure surfaced by a registry backend.
///
/// Backends carry their own richer error types; at the capability
/// boundary only the message matters, because the watcher records it on
/// the failing container and moves on.
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct ProviderError {
    /// Failure description.
    pub message: String,
}

impl ProviderError {
    /// Wraps any displayable error.
    #[must_use]
    pub fn new(source: impl std::fmt::Display) -> Self {
        Self {
            message: source.to_string(),
        }
    }
}

/// Manifest digest lookup result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestDigest {
    /// Content digest (`sha256:...`), when the registry reported one.
    pub digest: Option<String>,

    /// Image creation timestamp, when available.
    pub created: Option<DateTime<Utc>>,

    /// Manifest schema version (1 for legacy manifests, 2 otherwise).
    pub version: u8,
}

/// Capability contract for registry backends.
#[async_trait]
pub trait RegistryProvider: Component {
    /// Returns true when this provider is responsible for the image.
    fn match_image(&self, image: &ContainerImage) -> bool;

    /// Rewrites the image with the canonical registry URL and repository
    /// name for this backend.
    fn normalize_image(&self, image: ContainerImage) -> ContainerImage;

    /// Rebuilds the full image reference (`registry/repository:tag`) as a
    /// user would write it.
    fn image_full_name(&self, image: &ContainerImage, tag_value: &str) -> String;

    /// Lists all tags of the image repository.
    async fn get_tags(&self, image: &ContainerImage) -> Result<Vec<String>, ProviderError>;

    /// Resolves the manifest digest for the image tag.
    ///
    /// When `digest_scope` is given, the lookup targets that digest
    /// reference instead of the tag (the second, scope-qualified lookup
    /// used to obtain the true content digest for comparison).
    async fn get_image_manifest_digest(
        &self,
        image: &ContainerImage,
        digest_scope: Option<&str>,
    ) -> Result<ManifestDigest, ProviderError>;
}
