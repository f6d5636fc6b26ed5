//! Container engine contract.
//!
//! The watcher drives any engine exposing this trait; the production
//! implementation is the Docker adapter in [`crate::docker`], tests use
//! in-memory fakes. Event subscription is byte-oriented on purpose: the
//! engine delivers raw chunks and the watcher reassembles
//! newline-delimited records across partial reads.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;

use crate::error::EngineError;

/// One entry of a container listing.
#[derive(Debug, Clone)]
pub struct ContainerSummary {
    /// Stable container id.
    pub id: String,

    /// Container names, as reported (leading slashes included).
    pub names: Vec<String>,

    /// Image reference the container was created from.
    pub image: String,

    /// Container state (`running`, `exited`, ...).
    pub state: String,

    /// Container labels.
    pub labels: HashMap<String, String>,
}

impl ContainerSummary {
    /// Returns the first name with its leading slash stripped.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.names
            .first()
            .map(|name| name.trim_start_matches('/').to_string())
            .unwrap_or_default()
    }
}

/// Result of a container inspection.
#[derive(Debug, Clone)]
pub struct ContainerInspection {
    /// Current status.
    pub status: String,
}

/// Result of an image inspection.
#[derive(Debug, Clone)]
pub struct ImageInspection {
    /// Image id.
    pub id: String,

    /// Image architecture.
    pub architecture: String,

    /// Image operating system.
    pub os: String,

    /// Optional architecture variant.
    pub variant: Option<String>,

    /// Image creation timestamp.
    pub created: Option<DateTime<Utc>>,

    /// Repo digests (`name@sha256:...`).
    pub repo_digests: Vec<String>,

    /// Repo tags (`name:tag`).
    pub repo_tags: Vec<String>,

    /// Parent image reference of the image configuration; the local
    /// comparison value for legacy v1 manifests.
    pub config_image: Option<String>,
}

impl ImageInspection {
    /// Extracts the digest part of the first repo digest.
    #[must_use]
    pub fn repo_digest(&self) -> Option<String> {
        self.repo_digests
            .first()
            .and_then(|full| full.split('@').nth(1))
            .map(str::to_string)
    }
}

/// Raw event subscription stream: newline-delimited JSON records that
/// may be split across chunks.
pub type EventStream = BoxStream<'static, std::io::Result<Bytes>>;

/// Contract every container engine adapter implements.
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Lists containers (`all` includes non-running ones).
    async fn list_containers(&self, all: bool) -> Result<Vec<ContainerSummary>, EngineError>;

    /// Inspects one container.
    async fn inspect_container(&self, id: &str) -> Result<ContainerInspection, EngineError>;

    /// Inspects an image by reference or id.
    async fn inspect_image(&self, reference: &str) -> Result<ImageInspection, EngineError>;

    /// Subscribes to the container-scoped event stream.
    async fn event_stream(&self) -> Result<EventStream, EngineError>;
}
