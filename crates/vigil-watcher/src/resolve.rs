//! Tag candidate filtering and digest-watch policy.
//!
//! The candidate pipeline narrows the full remote tag list down to the
//! tags that could be proposed as an update for one container, ordered
//! best first. Non-semver containers never receive tag suggestions;
//! digest watching covers those.

use regex::Regex;
use semver::Version;

use vigil_core::container::Container;
use vigil_core::tag;

use crate::error::WatchError;

/// The docker.io domain family (including the empty domain of
/// unqualified references).
#[must_use]
pub fn is_default_hub_domain(domain: &str) -> bool {
    domain.is_empty() || domain == "docker.io" || domain.ends_with(".docker.io")
}

fn compile(pattern: &str) -> Result<Regex, WatchError> {
    Regex::new(pattern).map_err(|e| WatchError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

/// Filters the remote tag list down to upgrade candidates, best first.
///
/// Pipeline, in order:
/// 1. include regex when configured, otherwise drop tags starting with
///    `sha`;
/// 2. exclude regex when configured;
/// 3. always drop tags ending in `.sig`;
/// 4. non-semver current tag: no candidates at all;
/// 5. without a custom include pattern, keep only tags sharing the
///    current tag's non-numeric prefix (or starting with a digit when
///    there is none);
/// 6. drop tags that do not coerce to semver after the configured
///    transform;
/// 7. drop tags whose numeric segment count differs from the current
///    tag's;
/// 8. drop tags that are not a strict semver upgrade;
/// 9. sort descending.
///
/// # Errors
///
/// Returns [`WatchError::InvalidPattern`] when a configured include or
/// exclude regex does not compile.
pub fn tag_candidates(container: &Container, tags: Vec<String>) -> Result<Vec<String>, WatchError> {
    let container_name = container.full_name();
    let mut filtered = tags;

    if let Some(include) = container.include_tags.as_deref() {
        let include = compile(include)?;
        filtered.retain(|tag| include.is_match(tag));
    } else {
        filtered.retain(|tag| !tag.starts_with("sha"));
    }

    if let Some(exclude) = container.exclude_tags.as_deref() {
        let exclude = compile(exclude)?;
        filtered.retain(|tag| !exclude.is_match(tag));
    }

    filtered.retain(|tag| !tag.ends_with(".sig"));

    if !container.image.tag.semver {
        // Non-semver images only ever get digest suggestions.
        return Ok(Vec::new());
    }

    if filtered.is_empty() {
        tracing::warn!(
            container = %container_name,
            "no tags left after filtering, check the configured tag patterns"
        );
    }

    // Prefixes are almost always load-bearing (`alpine3.18` vs `3.18`),
    // so without a custom include pattern only same-prefix tags survive.
    if container.include_tags.is_none() {
        let current = &container.image.tag.value;
        let prefix = current
            .find(|c: char| c.is_ascii_digit())
            .map_or("", |index| &current[..index]);

        if prefix.is_empty() {
            filtered.retain(|tag| tag.starts_with(|c: char| c.is_ascii_digit()));
            if filtered.is_empty() {
                tracing::warn!(
                    container = %container_name,
                    "no tags starting with a digit found, check the configured tag patterns"
                );
            }
        } else {
            filtered.retain(|tag| tag.starts_with(prefix));
            if filtered.is_empty() {
                tracing::warn!(
                    container = %container_name,
                    prefix = %prefix,
                    "no tags found with the current tag prefix, check the configured tag patterns"
                );
            }
        }
    }

    let transform_spec = container.transform_tags.as_deref();
    let parsed_current = tag::parse(&tag::transform(transform_spec, &container.image.tag.value));
    let Some(current) = parsed_current else {
        return Ok(Vec::new());
    };

    let mut candidates: Vec<(Version, String)> = filtered
        .into_iter()
        .filter_map(|raw| {
            tag::parse(&tag::transform(transform_spec, &raw)).map(|version| (version, raw))
        })
        .collect();

    if let Some(reference_segments) = tag::numeric_segments(&container.image.tag.value) {
        candidates.retain(|(_, raw)| tag::numeric_segments(raw) == Some(reference_segments));
    }

    candidates.retain(|(version, _)| tag::is_upgrade(&current, version));

    candidates.sort_by(|(a, _), (b, _)| b.cmp(a));

    Ok(candidates.into_iter().map(|(_, raw)| raw).collect())
}

/// Decides whether a container's digest must be watched.
///
/// An explicit label always wins; an explicit opt-in against the public
/// hub gets an advisory warning because digest polling is throttled
/// there. Without a label, semver images default to tag watching only,
/// and non-semver images watch their digest unless pulled from the
/// public hub.
#[must_use]
pub fn is_digest_to_watch(label: Option<&str>, domain: &str, is_semver: bool) -> bool {
    let is_hub = is_default_hub_domain(domain);

    if let Some(value) = label {
        if !value.is_empty() {
            let watch = value.eq_ignore_ascii_case("true");
            if watch && is_hub {
                tracing::warn!(
                    domain = %domain,
                    "watching digests on the public hub may result in throttled requests"
                );
            }
            return watch;
        }
    }

    if is_semver {
        return false;
    }

    !is_hub
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use vigil_core::container::{
        ContainerImage, ImageDigest, ImageRegistry, ImageTag, UpdateKind,
    };

    fn semver_container(current_tag: &str) -> Container {
        Container {
            id: "c1".to_string(),
            name: "app".to_string(),
            status: "running".to_string(),
            watcher: "local".to_string(),
            display_name: None,
            display_icon: None,
            include_tags: None,
            exclude_tags: None,
            transform_tags: None,
            link_template: None,
            link: None,
            trigger_include: None,
            trigger_exclude: None,
            image: ContainerImage {
                id: "sha256:image".to_string(),
                registry: ImageRegistry {
                    name: "hub.public".to_string(),
                    url: "https://registry-1.docker.io/v2".to_string(),
                },
                name: "library/app".to_string(),
                tag: ImageTag {
                    value: current_tag.to_string(),
                    semver: tag::is_semver(current_tag),
                },
                digest: ImageDigest {
                    watch: false,
                    repo: None,
                    value: None,
                },
                architecture: "amd64".to_string(),
                os: "linux".to_string(),
                variant: None,
                created: None,
            },
            labels: HashMap::new(),
            result: None,
            error: None,
            update_available: false,
            update_kind: UpdateKind::unknown(),
        }
    }

    fn candidates(container: &Container, tags: &[&str]) -> Vec<String> {
        tag_candidates(container, tags.iter().map(|t| (*t).to_string()).collect()).unwrap()
    }

    #[test]
    fn test_reference_scenario() {
        // Running 1.2.0 against a typical remote tag list.
        let container = semver_container("1.2.0");
        let result = candidates(&container, &["1.2.0", "1.3.0", "1.2.1", "2.0.0-beta"]);
        assert_eq!(result, vec!["1.3.0", "1.2.1"]);
    }

    #[test]
    fn test_candidates_sorted_descending() {
        let container = semver_container("1.0.0");
        let result = candidates(&container, &["1.2.0", "1.10.0", "1.9.0", "2.0.0"]);
        assert_eq!(result, vec!["2.0.0", "1.10.0", "1.9.0", "1.2.0"]);
    }

    #[test]
    fn test_segment_count_must_match() {
        let container = semver_container("1.2");
        let result = candidates(&container, &["1.2.1", "1.3", "1.4.0", "2.0"]);
        assert_eq!(result, vec!["2.0", "1.3"]);
    }

    #[test]
    fn test_non_semver_never_gets_candidates() {
        let container = semver_container("latest");
        let result = candidates(&container, &["1.0.0", "2.0.0", "latest"]);
        assert!(result.is_empty());
    }

    #[test]
    fn test_sha_tags_dropped_without_include() {
        let container = semver_container("1.0.0");
        let result = candidates(&container, &["sha-12345", "1.1.0"]);
        assert_eq!(result, vec!["1.1.0"]);
    }

    #[test]
    fn test_sig_tags_always_dropped() {
        let container = semver_container("1.0.0");
        let result = candidates(&container, &["1.1.0", "1.1.0.sig"]);
        assert_eq!(result, vec!["1.1.0"]);
    }

    #[test]
    fn test_include_pattern() {
        let mut container = semver_container("1.0.0");
        container.include_tags = Some(r"^\d+\.\d+\.\d+$".to_string());
        let result = candidates(&container, &["1.1.0", "1.2.0-rc.1", "nightly"]);
        assert_eq!(result, vec!["1.1.0"]);
    }

    #[test]
    fn test_exclude_pattern() {
        let mut container = semver_container("1.0.0");
        container.exclude_tags = Some("beta".to_string());
        let result = candidates(&container, &["1.1.0", "1.2.0beta1"]);
        assert_eq!(result, vec!["1.1.0"]);
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        let mut container = semver_container("1.0.0");
        container.include_tags = Some("[".to_string());
        assert!(tag_candidates(&container, vec!["1.1.0".to_string()]).is_err());
    }

    #[test]
    fn test_prefix_retained_without_include() {
        let container = semver_container("alpine3.18");
        let result = candidates(
            &container,
            &["alpine3.19", "3.19", "debian3.19", "alpine3.17"],
        );
        assert_eq!(result, vec!["alpine3.19"]);
    }

    #[test]
    fn test_digitless_current_keeps_digit_tags() {
        let container = semver_container("1.2.0");
        let result = candidates(&container, &["v1.3.0", "1.3.0"]);
        // `v` prefixed tags do not share the empty prefix of `1.2.0`.
        assert_eq!(result, vec!["1.3.0"]);
    }

    #[test]
    fn test_transform_applied_before_comparison() {
        let mut container = semver_container("10.2-ls44");
        container.transform_tags = Some(r"^(\d+)\.(\d+)-ls(\d+)$ => $1.$2.$3".to_string());
        let result = candidates(&container, &["10.2-ls45", "10.2-ls43", "10.3-ls1"]);
        assert_eq!(result, vec!["10.3-ls1", "10.2-ls45"]);
    }

    #[test]
    fn test_digest_policy_label_wins() {
        assert!(is_digest_to_watch(Some("true"), "docker.io", true));
        assert!(!is_digest_to_watch(Some("false"), "my.registry", false));
    }

    #[test]
    fn test_digest_policy_empty_label_ignored() {
        assert!(is_digest_to_watch(Some(""), "my.registry", false));
    }

    #[test]
    fn test_digest_policy_defaults() {
        // Semver images default to tag watching only.
        assert!(!is_digest_to_watch(None, "docker.io", true));
        assert!(!is_digest_to_watch(None, "my.registry", true));
        // Non-semver images watch digests, except on the public hub.
        assert!(is_digest_to_watch(None, "my.registry", false));
        assert!(!is_digest_to_watch(None, "docker.io", false));
        assert!(!is_digest_to_watch(None, "", false));
        assert!(!is_digest_to_watch(None, "registry-1.docker.io", false));
    }
}
