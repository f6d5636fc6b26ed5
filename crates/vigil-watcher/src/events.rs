//! Engine event decoding.
//!
//! Engine events arrive as a byte stream of newline-delimited JSON
//! records; a record may span several chunks and a chunk may carry
//! several records. [`EventFramer`] reassembles complete lines,
//! [`parse_event`] interprets them.

use serde::Deserialize;

/// Actions that trigger a debounced rescan (the container set changed).
pub const LIFECYCLE_ACTIONS: &[&str] = &["create", "destroy"];

/// All container actions the watcher subscribes to.
pub const WATCHED_ACTIONS: &[&str] = &[
    "create", "destroy", "start", "stop", "pause", "unpause", "die", "update",
];

/// One decoded engine event.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineEvent {
    /// Event action (`create`, `die`, ...).
    #[serde(rename = "Action")]
    pub action: String,

    /// Subject container id.
    #[serde(rename = "id")]
    pub id: String,
}

impl EngineEvent {
    /// Returns true when this event changes the container set.
    #[must_use]
    pub fn is_lifecycle(&self) -> bool {
        LIFECYCLE_ACTIONS.contains(&self.action.as_str())
    }
}

/// Parses one newline-delimited record.
///
/// # Errors
///
/// Returns the underlying JSON error for malformed records; callers log
/// and skip those without dropping the subscription.
pub fn parse_event(line: &str) -> Result<EngineEvent, serde_json::Error> {
    serde_json::from_str(line)
}

/// Reassembles newline-delimited records across partial reads.
#[derive(Debug, Default)]
pub struct EventFramer {
    buffer: String,
}

impl EventFramer {
    /// Creates an empty framer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one chunk, returning every completed record.
    ///
    /// Blank lines are dropped; the trailing partial line stays buffered
    /// until its newline arrives.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));

        let mut lines: Vec<String> = self.buffer.split('\n').map(str::to_string).collect();
        self.buffer = lines.pop().unwrap_or_default();

        lines
            .into_iter()
            .filter(|line| !line.trim().is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_complete_record() {
        let mut framer = EventFramer::new();
        let lines = framer.push(b"{\"Action\":\"create\",\"id\":\"c1\"}\n");
        assert_eq!(lines.len(), 1);
        let event = parse_event(&lines[0]).unwrap();
        assert_eq!(event.action, "create");
        assert_eq!(event.id, "c1");
    }

    #[test]
    fn test_record_split_across_chunks() {
        let mut framer = EventFramer::new();
        assert!(framer.push(b"{\"Action\":\"crea").is_empty());
        assert!(framer.push(b"te\",\"id\":\"c1\"").is_empty());
        let lines = framer.push(b"}\n");
        assert_eq!(lines, vec!["{\"Action\":\"create\",\"id\":\"c1\"}"]);
    }

    #[test]
    fn test_multiple_records_in_one_chunk() {
        let mut framer = EventFramer::new();
        let lines =
            framer.push(b"{\"Action\":\"create\",\"id\":\"a\"}\n{\"Action\":\"destroy\",\"id\":\"b\"}\n");
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_blank_lines_dropped() {
        let mut framer = EventFramer::new();
        let lines = framer.push(b"\n\n{\"Action\":\"die\",\"id\":\"c\"}\n\n");
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn test_malformed_record_is_parse_error() {
        assert!(parse_event("not json").is_err());
    }

    #[test]
    fn test_lifecycle_classification() {
        let create = EngineEvent {
            action: "create".to_string(),
            id: "c".to_string(),
        };
        let die = EngineEvent {
            action: "die".to_string(),
            id: "c".to_string(),
        };
        assert!(create.is_lifecycle());
        assert!(!die.is_lifecycle());
    }
}
