//! OCI Distribution Specification wire types.
//!
//! Only the slices of the distribution API that update detection needs:
//! tag listing, manifest digest headers, and enough of the manifest body
//! to tell schema versions apart.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Accept header value covering every manifest flavor we can interpret.
pub const MANIFEST_ACCEPT: &str = "application/vnd.docker.distribution.manifest.list.v2+json, \
     application/vnd.docker.distribution.manifest.v2+json, \
     application/vnd.oci.image.index.v1+json, \
     application/vnd.oci.image.manifest.v1+json, \
     application/vnd.docker.distribution.manifest.v1+prettyjws, \
     application/vnd.docker.distribution.manifest.v1+json";

/// Header carrying the manifest content digest.
pub const DOCKER_CONTENT_DIGEST: &str = "docker-content-digest";

/// Response from the `/v2/<name>/tags/list` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TagList {
    /// Repository name.
    pub name: Option<String>,

    /// List of tags (absent for unknown repositories on some backends).
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Response from a token-service authentication endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// Bearer token for subsequent registry calls.
    pub token: String,
}

/// The manifest fields needed to classify a response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestResponse {
    /// Manifest schema version (1 for legacy manifests, 2 otherwise).
    pub schema_version: u8,

    /// Media type, when the backend reports one.
    #[serde(default)]
    pub media_type: Option<String>,

    /// Legacy v1 history entries.
    #[serde(default)]
    pub history: Vec<V1History>,
}

/// One legacy v1 history entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct V1History {
    /// Serialized v1 image JSON.
    pub v1_compatibility: String,
}

#[derive(Debug, Deserialize)]
struct V1Compatibility {
    created: Option<DateTime<Utc>>,
}

impl ManifestResponse {
    /// Extracts the creation timestamp from a legacy v1 manifest.
    #[must_use]
    pub fn v1_created(&self) -> Option<DateTime<Utc>> {
        let entry = self.history.first()?;
        serde_json::from_str::<V1Compatibility>(&entry.v1_compatibility)
            .ok()?
            .created
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_list_deserialization() {
        let json = r#"{"name": "library/nginx", "tags": ["1.25.0", "1.25.1", "latest"]}"#;
        let tags: TagList = serde_json::from_str(json).unwrap();
        assert_eq!(tags.tags.len(), 3);
    }

    #[test]
    fn test_tag_list_without_tags_field() {
        let tags: TagList = serde_json::from_str(r#"{"name": "x"}"#).unwrap();
        assert!(tags.tags.is_empty());
    }

    #[test]
    fn test_manifest_schema_v2() {
        let json = r#"{
            "schemaVersion": 2,
            "mediaType": "application/vnd.docker.distribution.manifest.v2+json",
            "config": {"digest": "sha256:abc"}
        }"#;
        let manifest: ManifestResponse = serde_json::from_str(json).unwrap();
        assert_eq!(manifest.schema_version, 2);
        assert!(manifest.history.is_empty());
    }

    #[test]
    fn test_manifest_v1_created() {
        let json = r#"{
            "schemaVersion": 1,
            "history": [
                {"v1Compatibility": "{\"created\": \"2023-06-01T12:00:00Z\"}"}
            ]
        }"#;
        let manifest: ManifestResponse = serde_json::from_str(json).unwrap();
        let created = manifest.v1_created().unwrap();
        assert_eq!(created.to_rfc3339(), "2023-06-01T12:00:00+00:00");
    }
}
