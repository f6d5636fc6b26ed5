//! Built-in log trigger: writes notifications to the process log.

use async_trait::async_trait;

use vigil_core::container::Container;

use crate::engine::{Notification, TriggerProvider};
use crate::error::TriggerError;

/// Action writing rendered notifications to the log.
#[derive(Debug, Default)]
pub struct LogTrigger;

impl LogTrigger {
    /// Creates the action.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TriggerProvider for LogTrigger {
    async fn notify(
        &self,
        notification: &Notification,
        container: &Container,
    ) -> Result<(), TriggerError> {
        tracing::info!(
            container = %container.full_name(),
            title = %notification.title,
            "{}",
            notification.body,
        );
        Ok(())
    }

    async fn notify_batch(
        &self,
        notification: &Notification,
        containers: &[Container],
    ) -> Result<(), TriggerError> {
        tracing::info!(
            count = containers.len(),
            title = %notification.title,
            "{}",
            notification.body,
        );
        Ok(())
    }
}
