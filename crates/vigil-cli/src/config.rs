//! Environment-driven configuration loading.
//!
//! Component instances are declared through `VIGIL_*` environment
//! variables:
//!
//! - `VIGIL_WATCHER_{name}_{option}` (the watcher provider is always
//!   `docker`)
//! - `VIGIL_REGISTRY_{provider}_{name}_{option}`
//! - `VIGIL_TRIGGER_{provider}_{name}_{option}`
//! - `VIGIL_AUTH_{provider}_{name}_{option}`
//!
//! Values parse as JSON when they can (`true`, `600`, `{"a":"b"}`) and
//! fall back to plain strings, so typed options work without quoting.

use serde_json::Value;

use vigil_core::state::{ComponentConfigurations, ConfigTree};

const PREFIX: &str = "VIGIL_";

/// Builds the component configuration trees from environment variables.
#[must_use]
pub fn load_from_env(vars: impl Iterator<Item = (String, String)>) -> ComponentConfigurations {
    let mut configs = ComponentConfigurations::default();

    for (key, value) in vars {
        let Some(rest) = key.strip_prefix(PREFIX) else {
            continue;
        };
        let parts: Vec<&str> = rest.split('_').collect();
        let Some((kind, parts)) = parts.split_first() else {
            continue;
        };

        match kind.to_lowercase().as_str() {
            "watcher" => {
                // No provider segment: every watcher is a docker watcher.
                if let [name, option @ ..] = parts {
                    if !option.is_empty() {
                        insert(&mut configs.watcher, "docker", name, &option.join("_"), &value);
                    }
                }
            }
            "registry" => insert_with_provider(&mut configs.registry, parts, &value),
            "trigger" => insert_with_provider(&mut configs.trigger, parts, &value),
            "auth" => insert_with_provider(&mut configs.authentication, parts, &value),
            _ => {}
        }
    }

    configs
}

fn insert_with_provider(tree: &mut ConfigTree, parts: &[&str], value: &str) {
    if let [provider, name, option @ ..] = parts {
        if !option.is_empty() {
            insert(tree, provider, name, &option.join("_"), value);
        }
    }
}

fn insert(tree: &mut ConfigTree, provider: &str, name: &str, option: &str, value: &str) {
    tree.entry(provider.to_lowercase())
        .or_default()
        .entry(name.to_lowercase())
        .or_insert_with(|| Value::Object(serde_json::Map::new()))
        .as_object_mut()
        .expect("instance configurations are objects")
        .insert(option.to_lowercase(), coerce(value));
}

/// Parses a raw value as JSON when possible, keeping it a string
/// otherwise.
fn coerce(value: &str) -> Value {
    serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Iterator<Item = (String, String)> + 'a {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
    }

    #[test]
    fn test_watcher_tree() {
        let configs = load_from_env(vars(&[
            ("VIGIL_WATCHER_LOCAL_INTERVAL", "600"),
            ("VIGIL_WATCHER_LOCAL_WATCHBYDEFAULT", "false"),
        ]));
        let local = &configs.watcher["docker"]["local"];
        assert_eq!(local["interval"], serde_json::json!(600));
        assert_eq!(local["watchbydefault"], serde_json::json!(false));
    }

    #[test]
    fn test_trigger_tree() {
        let configs = load_from_env(vars(&[
            ("VIGIL_TRIGGER_LOG_DEFAULT_MODE", "batch"),
            ("VIGIL_TRIGGER_LOG_DEFAULT_THRESHOLD", "minor"),
        ]));
        let default = &configs.trigger["log"]["default"];
        assert_eq!(default["mode"], serde_json::json!("batch"));
        assert_eq!(default["threshold"], serde_json::json!("minor"));
    }

    #[test]
    fn test_registry_tree() {
        let configs = load_from_env(vars(&[(
            "VIGIL_REGISTRY_HUB_PRIVATE_LOGIN",
            "john",
        )]));
        assert_eq!(
            configs.registry["hub"]["private"]["login"],
            serde_json::json!("john")
        );
    }

    #[test]
    fn test_auth_tree_with_json_value() {
        let configs = load_from_env(vars(&[(
            "VIGIL_AUTH_BASIC_MAIN_USERS",
            r#"{"john":"secret"}"#,
        )]));
        assert_eq!(
            configs.authentication["basic"]["main"]["users"]["john"],
            serde_json::json!("secret")
        );
    }

    #[test]
    fn test_unrelated_vars_ignored() {
        let configs = load_from_env(vars(&[
            ("PATH", "/usr/bin"),
            ("VIGIL_LOG_LEVEL", "debug"),
            ("VIGIL_WATCHER_LOCAL", "incomplete"),
        ]));
        assert!(configs.watcher.is_empty());
        assert!(configs.trigger.is_empty());
    }

    #[test]
    fn test_numeric_string_stays_string_when_quoted() {
        let configs = load_from_env(vars(&[(
            "VIGIL_REGISTRY_HUB_PRIVATE_PASSWORD",
            "\"12345\"",
        )]));
        assert_eq!(
            configs.registry["hub"]["private"]["password"],
            serde_json::json!("12345")
        );
    }
}
