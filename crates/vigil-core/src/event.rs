//! Event bus decoupling watcher output from trigger input.
//!
//! Two broadcast channels: one carries per-container reports as each
//! container finishes its resolution, the other the full report list at
//! the end of a scan cycle. Subscribers that lag simply miss reports;
//! the next cycle re-publishes current state anyway.

use tokio::sync::broadcast;

use crate::container::ContainerReport;

const DEFAULT_CAPACITY: usize = 256;

/// Pub/sub bus for container reports.
pub struct EventBus {
    report: broadcast::Sender<ContainerReport>,
    reports: broadcast::Sender<Vec<ContainerReport>>,
}

impl EventBus {
    /// Creates a bus with the default channel capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Creates a bus with an explicit channel capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (report, _) = broadcast::channel(capacity);
        let (reports, _) = broadcast::channel(capacity);
        Self { report, reports }
    }

    /// Publishes one container report.
    pub fn publish_report(&self, report: ContainerReport) {
        // A send error only means nobody is subscribed.
        let _ = self.report.send(report);
    }

    /// Publishes the full report list of a scan cycle.
    pub fn publish_reports(&self, reports: Vec<ContainerReport>) {
        let _ = self.reports.send(reports);
    }

    /// Subscribes to per-container reports.
    #[must_use]
    pub fn subscribe_report(&self) -> broadcast::Receiver<ContainerReport> {
        self.report.subscribe()
    }

    /// Subscribes to per-cycle report lists.
    #[must_use]
    pub fn subscribe_reports(&self) -> broadcast::Receiver<Vec<ContainerReport>> {
        self.reports.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::tests::sample_container;

    #[tokio::test]
    async fn test_publish_and_receive_report() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe_report();
        bus.publish_report(ContainerReport {
            container: sample_container(),
            changed: true,
        });
        let received = rx.recv().await.unwrap();
        assert!(received.changed);
        assert_eq!(received.container.name, "nginx");
    }

    #[tokio::test]
    async fn test_publish_and_receive_batch() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe_reports();
        bus.publish_reports(vec![ContainerReport {
            container: sample_container(),
            changed: false,
        }]);
        let received = rx.recv().await.unwrap();
        assert_eq!(received.len(), 1);
    }

    #[test]
    fn test_publish_without_subscriber_is_fine() {
        let bus = EventBus::new();
        bus.publish_report(ContainerReport {
            container: sample_container(),
            changed: false,
        });
    }
}
