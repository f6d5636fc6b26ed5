//! Tag parsing and semantic-version helpers.
//!
//! Image tags are rarely clean semver: `v1.2.3`, `1.2`, `7-alpine`,
//! `nginx-1.25` and similar shapes all occur in the wild. This module
//! coerces such tags into [`semver::Version`] values so that candidate
//! tags can be compared, and classifies upgrades as major/minor/patch.

use std::sync::OnceLock;

use regex::Regex;
use semver::{Prerelease, Version};
use serde::{Deserialize, Serialize};

/// Classification of a tag-to-tag upgrade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemverDiff {
    /// Major version increased.
    Major,

    /// Minor version increased.
    Minor,

    /// Patch version increased.
    Patch,

    /// Only the prerelease component changed.
    Prerelease,
}

impl SemverDiff {
    /// Returns the lowercase string form used in logs and templates.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Major => "major",
            Self::Minor => "minor",
            Self::Patch => "patch",
            Self::Prerelease => "prerelease",
        }
    }
}

impl std::fmt::Display for SemverDiff {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn coerce_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\d+)(?:\.(\d+))?(?:\.(\d+))?(?:-([0-9A-Za-z][0-9A-Za-z.-]*))?")
            .expect("coerce regex is valid")
    })
}

fn numeric_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+(\.\d+)*").expect("numeric regex is valid"))
}

/// Parses a tag into a semantic version, coercing partial versions.
///
/// A leading `v` is stripped and missing minor/patch segments default to
/// zero, so `v2`, `1.2` and `1.2.3-rc.1` all parse. Tags without any
/// numeric run (`latest`, `stable`) return `None`.
///
/// # Examples
///
/// ```
/// use vigil_core::tag;
///
/// assert_eq!(tag::parse("1.2").unwrap().to_string(), "1.2.0");
/// assert_eq!(tag::parse("v1.2.3").unwrap().to_string(), "1.2.3");
/// assert!(tag::parse("latest").is_none());
/// ```
#[must_use]
pub fn parse(raw: &str) -> Option<Version> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);

    if let Ok(version) = Version::parse(trimmed) {
        return Some(version);
    }

    let captures = coerce_regex().captures(trimmed)?;
    let major = captures.get(1)?.as_str().parse().ok()?;
    let minor = captures
        .get(2)
        .map_or(Some(0), |m| m.as_str().parse().ok())?;
    let patch = captures
        .get(3)
        .map_or(Some(0), |m| m.as_str().parse().ok())?;

    let mut version = Version::new(major, minor, patch);
    if let Some(pre) = captures.get(4) {
        version.pre = Prerelease::new(pre.as_str()).ok()?;
    }
    Some(version)
}

/// Returns true when the tag coerces to a semantic version.
#[must_use]
pub fn is_semver(raw: &str) -> bool {
    parse(raw).is_some()
}

/// Applies a `pattern => replacement` transform to a tag.
///
/// The transform lets users map vendor tag schemes onto comparable
/// versions (for example `^(\d+)\.(\d+)-ls(\d+)$ => $1.$2.$3`). A missing
/// or malformed transform leaves the tag untouched.
#[must_use]
pub fn transform(spec: Option<&str>, raw: &str) -> String {
    let Some(spec) = spec else {
        return raw.to_string();
    };
    let Some((pattern, replacement)) = spec.split_once("=>") else {
        tracing::warn!(transform = spec, "tag transform is missing '=>', ignoring");
        return raw.to_string();
    };
    match Regex::new(pattern.trim()) {
        Ok(regex) => regex.replace(raw, replacement.trim()).into_owned(),
        Err(e) => {
            tracing::warn!(transform = spec, error = %e, "invalid tag transform, ignoring");
            raw.to_string()
        }
    }
}

/// Returns true when `candidate` is a strict upgrade over `current`.
///
/// Comparison follows semver ordering with one restriction: a prerelease
/// candidate never upgrades a stable current version, so `2.0.0-beta` is
/// not proposed over `1.2.0`.
#[must_use]
pub fn is_upgrade(current: &Version, candidate: &Version) -> bool {
    if candidate.pre.is_empty() || !current.pre.is_empty() {
        candidate > current
    } else {
        false
    }
}

/// Classifies the difference between two versions.
///
/// Returns `None` when the versions are equal.
#[must_use]
pub fn diff(local: &Version, remote: &Version) -> Option<SemverDiff> {
    if local.major != remote.major {
        Some(SemverDiff::Major)
    } else if local.minor != remote.minor {
        Some(SemverDiff::Minor)
    } else if local.patch != remote.patch {
        Some(SemverDiff::Patch)
    } else if local.pre != remote.pre {
        Some(SemverDiff::Prerelease)
    } else {
        None
    }
}

/// Counts the dot-separated segments of the first numeric run in a tag.
///
/// `1.2` has two segments, `1.2.1` three; `latest` has none.
#[must_use]
pub fn numeric_segments(raw: &str) -> Option<usize> {
    numeric_regex()
        .find(raw)
        .map(|m| m.as_str().split('.').count())
}
