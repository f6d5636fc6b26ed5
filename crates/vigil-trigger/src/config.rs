//! Trigger instance configuration.
//!
//! These are the options common to every trigger provider; a provider's
//! own options live in the same configuration value and are parsed by
//! its factory, so unknown fields are tolerated here.

use serde::Deserialize;

use vigil_core::component::ComponentConfig;

use crate::threshold::Threshold;

/// Subscription mode, fixed per trigger instance at configuration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerMode {
    /// React to individual container reports.
    #[default]
    Simple,

    /// React to the full per-cycle report list.
    Batch,
}

fn default_true() -> bool {
    true
}

fn default_simple_title() -> String {
    "New ${kind} found for container ${name}".to_string()
}

fn default_simple_body() -> String {
    "Container ${name} running with ${kind} ${local} can be updated to ${kind} ${remote}\n${link}"
        .to_string()
}

fn default_batch_title() -> String {
    "${count} updates available".to_string()
}

/// Options common to every trigger instance.
#[derive(Debug, Clone, Deserialize)]
pub struct TriggerConfig {
    /// Subscribe automatically; otherwise the instance only runs when
    /// invoked manually.
    #[serde(default = "default_true")]
    pub auto: bool,

    /// Minimum update severity before the action fires.
    #[serde(default)]
    pub threshold: Threshold,

    /// Simple or batch subscription.
    #[serde(default)]
    pub mode: TriggerMode,

    /// Fire only on changed reports; `false` re-fires every cycle.
    #[serde(default = "default_true")]
    pub once: bool,

    /// Title template for simple mode.
    #[serde(rename = "simpletitle", default = "default_simple_title")]
    pub simple_title: String,

    /// Body template for simple mode.
    #[serde(rename = "simplebody", default = "default_simple_body")]
    pub simple_body: String,

    /// Title template for batch mode.
    #[serde(rename = "batchtitle", default = "default_batch_title")]
    pub batch_title: String,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            auto: true,
            threshold: Threshold::default(),
            mode: TriggerMode::default(),
            once: true,
            simple_title: default_simple_title(),
            simple_body: default_simple_body(),
            batch_title: default_batch_title(),
        }
    }
}

impl ComponentConfig for TriggerConfig {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TriggerConfig::default();
        assert!(config.auto);
        assert!(config.once);
        assert_eq!(config.threshold, Threshold::All);
        assert_eq!(config.mode, TriggerMode::Simple);
        assert!(config.simple_title.contains("${name}"));
    }

    #[test]
    fn test_parse_with_provider_specific_fields() {
        // Provider options share the value; they must not break parsing.
        let config: TriggerConfig = serde_json::from_value(serde_json::json!({
            "mode": "batch",
            "threshold": "Minor",
            "once": false,
            "url": "https://hooks.example.com/xyz"
        }))
        .unwrap();
        assert_eq!(config.mode, TriggerMode::Batch);
        assert_eq!(config.threshold, Threshold::Minor);
        assert!(!config.once);
    }

    #[test]
    fn test_invalid_threshold_rejected() {
        let result: Result<TriggerConfig, _> =
            serde_json::from_value(serde_json::json!({"threshold": "hourly"}));
        assert!(result.is_err());
    }
}
