//! Update-severity thresholds and per-container trigger directives.

use std::str::FromStr;

use serde::{Deserialize, Deserializer};

use vigil_core::container::{Container, UpdateType};
use vigil_core::tag::SemverDiff;

/// Minimum severity of change required before an action fires.
///
/// Thresholds constrain only tag updates with a known semver diff;
/// digest and unclassifiable updates always pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Threshold {
    /// Fire on every update.
    #[default]
    All,

    /// Fire on every update (major is the widest severity).
    Major,

    /// Fire on minor and below (never on major).
    Minor,

    /// Fire on patch and below (never on major or minor).
    Patch,

    /// Fire only when the diff is exactly major.
    MajorOnly,

    /// Fire only when the diff is exactly minor.
    MinorOnly,
}

impl Threshold {
    /// Returns true when the container's update reaches this threshold.
    #[must_use]
    pub fn is_reached(&self, container: &Container) -> bool {
        if *self == Self::All {
            return true;
        }
        if container.update_kind.kind != UpdateType::Tag {
            return true;
        }
        let Some(diff) = container.update_kind.semver_diff else {
            return true;
        };
        match self {
            Self::MajorOnly => diff == SemverDiff::Major,
            Self::MinorOnly => diff == SemverDiff::Minor,
            Self::Minor => diff != SemverDiff::Major,
            Self::Patch => diff != SemverDiff::Major && diff != SemverDiff::Minor,
            Self::All | Self::Major => true,
        }
    }

    /// Returns the configuration string form.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Major => "major",
            Self::Minor => "minor",
            Self::Patch => "patch",
            Self::MajorOnly => "major-only",
            Self::MinorOnly => "minor-only",
        }
    }
}

impl FromStr for Threshold {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_lowercase().as_str() {
            "all" => Ok(Self::All),
            "major" => Ok(Self::Major),
            "minor" => Ok(Self::Minor),
            "patch" => Ok(Self::Patch),
            "major-only" => Ok(Self::MajorOnly),
            "minor-only" => Ok(Self::MinorOnly),
            other => Err(format!(
                "unknown threshold '{other}' (expected all, major, minor, patch, major-only or minor-only)"
            )),
        }
    }
}

impl<'de> Deserialize<'de> for Threshold {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One parsed `triggerId[:threshold]` token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerDirective {
    /// Target trigger id (`provider.name`).
    pub id: String,

    /// Threshold the token requires (`all` when absent or unknown).
    pub threshold: Threshold,
}

/// Parses a comma-separated directive list attached to a container.
///
/// Unknown threshold tokens fall back to `all` rather than failing: a
/// mislabeled container should not silence its other directives.
#[must_use]
pub fn parse_directives(raw: &str) -> Vec<TriggerDirective> {
    raw.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| {
            let (id, threshold) = match token.split_once(':') {
                Some((id, threshold)) => (
                    id.trim(),
                    threshold.trim().parse().unwrap_or_default(),
                ),
                None => (token, Threshold::All),
            };
            TriggerDirective {
                id: id.to_lowercase(),
                threshold,
            }
        })
        .collect()
}
