//! Container data model.
//!
//! A [`Container`] is the watched unit: one running container enriched
//! with the image metadata needed to resolve updates, the per-container
//! policy overrides read from labels, and the result of the last scan.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::tag::{self, SemverDiff};
use crate::template;

/// Registry coordinates of an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRegistry {
    /// Id of the registry component responsible for this image
    /// (`unknown` when no provider matched).
    pub name: String,

    /// Registry URL (or bare domain before normalization).
    pub url: String,
}

/// Tag the container currently runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageTag {
    /// Raw tag value (e.g. `1.2.0`, `latest`).
    pub value: String,

    /// True when the tag coerces to a semantic version.
    pub semver: bool,
}

/// Digest bookkeeping for an image.
///
/// `watch` is only meaningful when `repo` is present: without a repo
/// digest there is nothing to compare a remote digest against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDigest {
    /// Whether digest changes are watched for this container.
    pub watch: bool,

    /// Repo digest reported by the engine (`sha256:...`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,

    /// Digest used as the local comparison value, resolved during scans.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Image descriptor attached to a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerImage {
    /// Image id from the engine.
    pub id: String,

    /// Registry coordinates.
    pub registry: ImageRegistry,

    /// Repository path (e.g. `library/nginx`).
    pub name: String,

    /// Currently running tag.
    pub tag: ImageTag,

    /// Digest bookkeeping.
    pub digest: ImageDigest,

    /// Image architecture.
    pub architecture: String,

    /// Image operating system.
    pub os: String,

    /// Optional architecture variant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,

    /// Image creation timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
}

/// Result of the last version resolution for a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    /// Best candidate tag (the current tag when no candidate was found).
    pub tag: String,

    /// Remote digest, when digest watching is active.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,

    /// Remote creation timestamp, when the registry reported one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,

    /// Link rendered from the container link template.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// Update classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateType {
    /// A newer tag is available.
    Tag,

    /// The same tag points at a newer digest.
    Digest,

    /// No update detected.
    Unknown,
}

impl UpdateType {
    /// Returns the lowercase string form used in logs and templates.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Tag => "tag",
            Self::Digest => "digest",
            Self::Unknown => "unknown",
        }
    }
}

/// Detected update, with local/remote values for rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateKind {
    /// Update classification.
    pub kind: UpdateType,

    /// Local value (current tag or digest).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_value: Option<String>,

    /// Remote value (candidate tag or digest).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_value: Option<String>,

    /// Severity of a tag update; only set when `kind` is [`UpdateType::Tag`].
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semver_diff: Option<SemverDiff>,
}

impl UpdateKind {
    /// An empty classification (no update detected).
    #[must_use]
    pub const fn unknown() -> Self {
        Self {
            kind: UpdateType::Unknown,
            local_value: None,
            remote_value: None,
            semver_diff: None,
        }
    }
}

impl Default for UpdateKind {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Error recorded on a container when its resolution failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerError {
    /// Human-readable failure description.
    pub message: String,
}

/// A watched container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    /// Stable id from the container engine.
    pub id: String,

    /// Container name.
    pub name: String,

    /// Engine status (`running`, `exited`, ...).
    pub status: String,

    /// Name of the watcher instance owning this container.
    pub watcher: String,

    /// Display name override label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Display icon override label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_icon: Option<String>,

    /// Include-tag regex label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_tags: Option<String>,

    /// Exclude-tag regex label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_tags: Option<String>,

    /// Tag transform label (`pattern => replacement`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transform_tags: Option<String>,

    /// Link template label, expanded against the resolved version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_template: Option<String>,

    /// Link for the currently running version.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,

    /// Trigger include directives label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_include: Option<String>,

    /// Trigger exclude directives label.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trigger_exclude: Option<String>,

    /// Image descriptor.
    pub image: ContainerImage,

    /// Raw engine labels.
    #[serde(default)]
    pub labels: HashMap<String, String>,

    /// Last resolution result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ScanResult>,

    /// Last resolution error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ContainerError>,

    /// True when an update is available.
    #[serde(default)]
    pub update_available: bool,

    /// Update classification.
    #[serde(default)]
    pub update_kind: UpdateKind,
}

impl Container {
    /// Returns the `watcher_name` qualified name used in logs.
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}_{}", self.watcher, self.name)
    }

    /// Recomputes `update_available` and `update_kind` from the scan result.
    ///
    /// A tag change wins over a digest change when both are present (the
    /// candidate tag is the actionable value). `semver_diff` is only
    /// populated for tag updates on semver images.
    pub fn refresh_update_state(&mut self) {
        let Some(result) = &self.result else {
            self.update_available = false;
            self.update_kind = UpdateKind::unknown();
            return;
        };

        let local_tag = &self.image.tag.value;
        if result.tag != *local_tag {
            let semver_diff = if self.image.tag.semver {
                let transform_spec = self.transform_tags.as_deref();
                let local = tag::parse(&tag::transform(transform_spec, local_tag));
                let remote = tag::parse(&tag::transform(transform_spec, &result.tag));
                match (local, remote) {
                    (Some(local), Some(remote)) => tag::diff(&local, &remote),
                    _ => None,
                }
            } else {
                None
            };
            self.update_available = true;
            self.update_kind = UpdateKind {
                kind: UpdateType::Tag,
                local_value: Some(local_tag.clone()),
                remote_value: Some(result.tag.clone()),
                semver_diff,
            };
            return;
        }

        if self.image.digest.watch {
            if let (Some(remote), local) = (&result.digest, &self.image.digest.value) {
                if local.as_ref() != Some(remote) {
                    self.update_available = true;
                    self.update_kind = UpdateKind {
                        kind: UpdateType::Digest,
                        local_value: local.clone(),
                        remote_value: Some(remote.clone()),
                        semver_diff: None,
                    };
                    return;
                }
            }
        }

        self.update_available = false;
        self.update_kind = UpdateKind::unknown();
    }

    /// Renders the link template against a tag value.
    ///
    /// Exposes `raw` plus `major`/`minor`/`patch` when the tag is semver.
    #[must_use]
    pub fn render_link(&self, tag_value: &str) -> Option<String> {
        let template = self.link_template.as_deref()?;
        let mut variables = HashMap::from([("raw".to_string(), tag_value.to_string())]);
        if let Some(version) = tag::parse(&tag::transform(self.transform_tags.as_deref(), tag_value))
        {
            variables.insert("major".to_string(), version.major.to_string());
            variables.insert("minor".to_string(), version.minor.to_string());
            variables.insert("patch".to_string(), version.patch.to_string());
        }
        Some(template::render(template, &variables))
    }

    /// Returns true when the scan result differs from a previous record's.
    #[must_use]
    pub fn result_changed(&self, previous: &Self) -> bool {
        self.result != previous.result
    }
}

/// Per-scan, per-container report published on the event bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerReport {
    /// The container after this scan.
    pub container: Container,

    /// True when the stored record is new or its result actually changed
    /// while an update is available.
    pub changed: bool,
}
