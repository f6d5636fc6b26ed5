//! Watcher instance configuration.

use serde::Deserialize;

use vigil_core::component::ComponentConfig;

fn default_socket() -> String {
    "/var/run/docker.sock".to_string()
}

fn default_port() -> u16 {
    2375
}

fn default_interval() -> u64 {
    3600
}

fn default_jitter() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

/// Configuration of one watcher instance.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WatcherConfig {
    /// Engine unix socket path (used when no host is configured).
    #[serde(default = "default_socket")]
    pub socket: String,

    /// Engine TCP host.
    #[serde(default)]
    pub host: Option<String>,

    /// Engine TCP port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Seconds between two full scans.
    #[serde(default = "default_interval")]
    pub interval: u64,

    /// Upper bound, in seconds, of the random delay added to each scan.
    #[serde(default = "default_jitter")]
    pub jitter: u64,

    /// Watch containers without an explicit watch label.
    #[serde(rename = "watchbydefault", default = "default_true")]
    pub watch_by_default: bool,

    /// List all containers instead of running ones only.
    #[serde(rename = "watchall", default)]
    pub watch_all: bool,

    /// React to engine lifecycle events.
    #[serde(rename = "watchevents", default = "default_true")]
    pub watch_events: bool,

    /// Run a scan at startup when the store is empty.
    #[serde(rename = "watchatstart", default = "default_true")]
    pub watch_at_start: bool,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            socket: default_socket(),
            host: None,
            port: default_port(),
            interval: default_interval(),
            jitter: default_jitter(),
            watch_by_default: true,
            watch_all: false,
            watch_events: true,
            watch_at_start: true,
        }
    }
}

impl ComponentConfig for WatcherConfig {
    fn validate(&self) -> Result<(), String> {
        if self.interval == 0 {
            return Err("interval must be at least one second".to_string());
        }
        Ok(())
    }
}
