//! The trigger filtering engine.
//!
//! One engine per configured action. The engine subscribes to watcher
//! output, applies the changed/update/threshold/directive gates, renders
//! the notification templates, and invokes the action. Action failures
//! are recorded as a status outcome and never propagate.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use vigil_core::component::{Component, ComponentMeta};
use vigil_core::container::{Container, ContainerReport};
use vigil_core::context::AppContext;
use vigil_core::error::ComponentError;
use vigil_core::template;

use crate::config::{TriggerConfig, TriggerMode};
use crate::error::TriggerError;
use crate::threshold::parse_directives;

/// A rendered notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Rendered title.
    pub title: String,

    /// Rendered body.
    pub body: String,
}

/// Contract implemented by each concrete action.
#[async_trait]
pub trait TriggerProvider: Send + Sync {
    /// Called once when the owning trigger registers.
    async fn install(&self) -> Result<(), TriggerError> {
        Ok(())
    }

    /// Fires for one container (simple mode).
    async fn notify(
        &self,
        notification: &Notification,
        container: &Container,
    ) -> Result<(), TriggerError>;

    /// Fires once for a cycle's filtered containers (batch mode).
    async fn notify_batch(
        &self,
        notification: &Notification,
        containers: &[Container],
    ) -> Result<(), TriggerError>;
}

/// Success/error counters of one trigger instance.
#[derive(Debug, Default)]
pub struct TriggerStatus {
    success: AtomicU64,
    error: AtomicU64,
}

impl TriggerStatus {
    /// Number of successful invocation rounds.
    #[must_use]
    pub fn success(&self) -> u64 {
        self.success.load(Ordering::Relaxed)
    }

    /// Number of failed invocation rounds.
    #[must_use]
    pub fn error(&self) -> u64 {
        self.error.load(Ordering::Relaxed)
    }

    fn record(&self, outcome: Result<(), TriggerError>, context: &str) {
        match outcome {
            Ok(()) => {
                self.success.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                tracing::warn!(trigger = %context, "trigger action failed ({e})");
                self.error.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

/// Trigger component wrapping one action behind the filtering gates.
pub struct TriggerEngine {
    inner: Arc<TriggerInner>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

struct TriggerInner {
    meta: ComponentMeta,
    config: TriggerConfig,
    ctx: AppContext,
    action: Arc<dyn TriggerProvider>,
    status: TriggerStatus,
}

impl TriggerEngine {
    /// Creates the engine around an action.
    #[must_use]
    pub fn new(
        meta: ComponentMeta,
        config: TriggerConfig,
        ctx: AppContext,
        action: Arc<dyn TriggerProvider>,
    ) -> Self {
        Self {
            inner: Arc::new(TriggerInner {
                meta,
                config,
                ctx,
                action,
                status: TriggerStatus::default(),
            }),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Returns the invocation counters.
    #[must_use]
    pub fn status(&self) -> (u64, u64) {
        (self.inner.status.success(), self.inner.status.error())
    }

    /// Handles one container report (simple mode gate).
    pub async fn handle_report(&self, report: &ContainerReport) {
        self.inner.handle_report(report).await;
    }

    /// Handles a cycle's report list (batch mode gate).
    pub async fn handle_reports(&self, reports: &[ContainerReport]) {
        self.inner.handle_reports(reports).await;
    }
}

#[async_trait]
impl Component for TriggerEngine {
    fn meta(&self) -> &ComponentMeta {
        &self.inner.meta
    }

    async fn init(&self) -> Result<(), ComponentError> {
        self.inner
            .action
            .install()
            .await
            .map_err(|e| ComponentError::Init {
                component: self.inner.meta.id().to_string(),
                reason: e.to_string(),
            })?;

        if !self.inner.config.auto {
            tracing::info!(trigger = %self.inner.meta.id(), "registered for manual execution");
            return Ok(());
        }

        let mut tasks = self.tasks.lock().await;
        match self.inner.config.mode {
            TriggerMode::Simple => {
                let inner = self.inner.clone();
                let mut rx = self.inner.ctx.bus.subscribe_report();
                tasks.push(tokio::spawn(async move {
                    while let Ok(report) = rx.recv().await {
                        inner.handle_report(&report).await;
                    }
                }));
            }
            TriggerMode::Batch => {
                let inner = self.inner.clone();
                let mut rx = self.inner.ctx.bus.subscribe_reports();
                tasks.push(tokio::spawn(async move {
                    while let Ok(reports) = rx.recv().await {
                        inner.handle_reports(&reports).await;
                    }
                }));
            }
        }
        tracing::info!(
            trigger = %self.inner.meta.id(),
            mode = ?self.inner.config.mode,
            "registered for auto execution"
        );
        Ok(())
    }

    async fn deregister(&self) -> Result<(), ComponentError> {
        for task in self.tasks.lock().await.drain(..) {
            task.abort();
        }
        Ok(())
    }
}

impl TriggerInner {
    /// The simple-mode gate, applied in order with short-circuiting.
    async fn handle_report(&self, report: &ContainerReport) {
        if !report.changed && self.config.once {
            return;
        }
        if !report.container.update_available {
            return;
        }

        let container_name = report.container.full_name();
        if !self.config.threshold.is_reached(&report.container) {
            tracing::debug!(container = %container_name, "threshold not reached, ignoring");
            return;
        }
        if !self.must_trigger(&report.container) {
            tracing::debug!(container = %container_name, "trigger conditions not met, ignoring");
            return;
        }

        tracing::debug!(trigger = %self.meta.id(), container = %container_name, "run");
        let notification = Notification {
            title: self.render_simple(&self.config.simple_title, &report.container),
            body: self.render_simple(&self.config.simple_body, &report.container),
        };
        let outcome = self.action.notify(&notification, &report.container).await;
        self.status.record(outcome, self.meta.id());
    }

    /// The batch-mode gate: same predicates, applied across the list.
    async fn handle_reports(&self, reports: &[ContainerReport]) {
        let containers: Vec<Container> = reports
            .iter()
            .filter(|report| report.changed || !self.config.once)
            .filter(|report| report.container.update_available)
            .filter(|report| self.config.threshold.is_reached(&report.container))
            .filter(|report| self.must_trigger(&report.container))
            .map(|report| report.container.clone())
            .collect();

        if containers.is_empty() {
            return;
        }

        tracing::debug!(trigger = %self.meta.id(), count = containers.len(), "run batch");
        let notification = Notification {
            title: self.render_batch_title(&containers),
            body: self.render_batch_body(&containers),
        };
        let outcome = self.action.notify_batch(&notification, &containers).await;
        self.status.record(outcome, self.meta.id());
    }

    /// Evaluates the container's include/exclude directives against this
    /// trigger's id.
    fn must_trigger(&self, container: &Container) -> bool {
        let included = match container.trigger_include.as_deref() {
            None => true,
            Some(raw) => self.matches_directive(container, raw),
        };
        let excluded = match container.trigger_exclude.as_deref() {
            None => false,
            Some(raw) => self.matches_directive(container, raw),
        };
        included && !excluded
    }

    fn matches_directive(&self, container: &Container, raw: &str) -> bool {
        parse_directives(raw)
            .into_iter()
            .find(|directive| directive.id == self.meta.id())
            .map_or(false, |directive| directive.threshold.is_reached(container))
    }

    fn simple_variables(&self, container: &Container) -> HashMap<String, String> {
        let kind = &container.update_kind;
        HashMap::from([
            ("id".to_string(), container.id.clone()),
            ("name".to_string(), container.name.clone()),
            ("watcher".to_string(), container.watcher.clone()),
            ("kind".to_string(), kind.kind.as_str().to_string()),
            (
                "semver".to_string(),
                kind.semver_diff.map(|diff| diff.to_string()).unwrap_or_default(),
            ),
            (
                "local".to_string(),
                kind.local_value.clone().unwrap_or_default(),
            ),
            (
                "remote".to_string(),
                kind.remote_value.clone().unwrap_or_default(),
            ),
            (
                "link".to_string(),
                container
                    .result
                    .as_ref()
                    .and_then(|result| result.link.clone())
                    .unwrap_or_default(),
            ),
        ])
    }

    fn render_simple(&self, template: &str, container: &Container) -> String {
        template::render(template, &self.simple_variables(container))
    }

    fn render_batch_title(&self, containers: &[Container]) -> String {
        let variables =
            HashMap::from([("count".to_string(), containers.len().to_string())]);
        template::render(&self.config.batch_title, &variables)
    }

    fn render_batch_body(&self, containers: &[Container]) -> String {
        containers
            .iter()
            .map(|container| format!("- {}\n", self.render_simple(&self.config.simple_body, container)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::threshold::Threshold;
    use tokio::sync::Mutex as AsyncMutex;
    use vigil_core::component::ComponentKind;
    use vigil_core::container::{
        ContainerImage, ImageDigest, ImageRegistry, ImageTag, ScanResult,
    };
    use vigil_core::state::ComponentRegistry;

    /// A container whose last scan found a tag update.
    pub(crate) fn updated_container(local: &str, remote: &str) -> Container {
        let mut container = Container {
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
                    value: local.to_string(),
                    semver: true,
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
            result: Some(ScanResult {
                tag: remote.to_string(),
                digest: None,
                created: None,
                link: None,
            }),
            error: None,
            update_available: false,
            update_kind: Default::default(),
        };
        container.refresh_update_state();
        container
    }

    pub(crate) struct RecordingAction {
        pub simple: AsyncMutex<Vec<(Notification, String)>>,
        pub batch: AsyncMutex<Vec<(Notification, usize)>>,
        pub fail: bool,
    }

    impl RecordingAction {
        pub(crate) fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                simple: AsyncMutex::new(Vec::new()),
                batch: AsyncMutex::new(Vec::new()),
                fail,
            })
        }
    }

    #[async_trait]
    impl TriggerProvider for RecordingAction {
        async fn notify(
            &self,
            notification: &Notification,
            container: &Container,
        ) -> Result<(), TriggerError> {
            if self.fail {
                return Err(TriggerError::Action {
                    reason: "boom".to_string(),
                });
            }
            self.simple
                .lock()
                .await
                .push((notification.clone(), container.name.clone()));
            Ok(())
        }

        async fn notify_batch(
            &self,
            notification: &Notification,
            containers: &[Container],
        ) -> Result<(), TriggerError> {
            if self.fail {
                return Err(TriggerError::Action {
                    reason: "boom".to_string(),
                });
            }
            self.batch
                .lock()
                .await
                .push((notification.clone(), containers.len()));
            Ok(())
        }
    }

    fn engine_with(
        config: TriggerConfig,
        action: Arc<RecordingAction>,
    ) -> TriggerEngine {
        let registry = Arc::new(ComponentRegistry::new());
        let ctx = AppContext::in_memory(registry);
        let meta = ComponentMeta::new(ComponentKind::Trigger, "log", "default");
        TriggerEngine::new(meta, config, ctx, action)
    }

    fn report(container: Container, changed: bool) -> ContainerReport {
        ContainerReport { container, changed }
    }

    #[tokio::test]
    async fn test_simple_fires_on_changed_update() {
        let action = RecordingAction::new(false);
        let engine = engine_with(TriggerConfig::default(), action.clone());

        engine
            .handle_report(&report(updated_container("1.0.0", "1.0.1"), true))
            .await;

        let fired = action.simple.lock().await;
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].0.title, "New tag found for container app");
        assert_eq!(engine.status(), (1, 0));
    }

    #[tokio::test]
    async fn test_simple_skips_unchanged_when_once() {
        let action = RecordingAction::new(false);
        let engine = engine_with(TriggerConfig::default(), action.clone());

        engine
            .handle_report(&report(updated_container("1.0.0", "1.0.1"), false))
            .await;

        assert!(action.simple.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_simple_refires_when_once_disabled() {
        let action = RecordingAction::new(false);
        let config = TriggerConfig {
            once: false,
            ..TriggerConfig::default()
        };
        let engine = engine_with(config, action.clone());

        engine
            .handle_report(&report(updated_container("1.0.0", "1.0.1"), false))
            .await;

        assert_eq!(action.simple.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_simple_skips_without_update() {
        let action = RecordingAction::new(false);
        let engine = engine_with(TriggerConfig::default(), action.clone());

        // Same local and remote tag: no update available.
        engine
            .handle_report(&report(updated_container("1.0.0", "1.0.0"), true))
            .await;

        assert!(action.simple.lock().await.is_empty());
        assert_eq!(engine.status(), (0, 0));
    }

    #[tokio::test]
    async fn test_simple_respects_threshold() {
        let action = RecordingAction::new(false);
        let config = TriggerConfig {
            threshold: Threshold::Patch,
            ..TriggerConfig::default()
        };
        let engine = engine_with(config, action.clone());

        engine
            .handle_report(&report(updated_container("1.0.0", "2.0.0"), true))
            .await;
        assert!(action.simple.lock().await.is_empty());

        engine
            .handle_report(&report(updated_container("1.0.0", "1.0.1"), true))
            .await;
        assert_eq!(action.simple.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_simple_respects_exclude_directive() {
        let action = RecordingAction::new(false);
        let engine = engine_with(TriggerConfig::default(), action.clone());

        let mut container = updated_container("1.0.0", "1.1.0");
        container.trigger_exclude = Some("log.default".to_string());
        engine.handle_report(&report(container, true)).await;

        assert!(action.simple.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_simple_respects_include_directive_threshold() {
        let action = RecordingAction::new(false);
        let engine = engine_with(TriggerConfig::default(), action.clone());

        // Included, but only for majors; a minor update stays quiet.
        let mut container = updated_container("1.0.0", "1.1.0");
        container.trigger_include = Some("log.default:major-only".to_string());
        engine.handle_report(&report(container, true)).await;
        assert!(action.simple.lock().await.is_empty());

        let mut container = updated_container("1.0.0", "2.0.0");
        container.trigger_include = Some("log.default:major-only".to_string());
        engine.handle_report(&report(container, true)).await;
        assert_eq!(action.simple.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_simple_skips_when_not_in_include_list() {
        let action = RecordingAction::new(false);
        let engine = engine_with(TriggerConfig::default(), action.clone());

        let mut container = updated_container("1.0.0", "1.1.0");
        container.trigger_include = Some("slack.team".to_string());
        engine.handle_report(&report(container, true)).await;

        assert!(action.simple.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_action_failure_is_contained() {
        let action = RecordingAction::new(true);
        let engine = engine_with(TriggerConfig::default(), action);

        engine
            .handle_report(&report(updated_container("1.0.0", "1.1.0"), true))
            .await;

        assert_eq!(engine.status(), (0, 1));
    }

    #[tokio::test]
    async fn test_batch_fires_once_with_filtered_list() {
        let action = RecordingAction::new(false);
        let config = TriggerConfig {
            mode: TriggerMode::Batch,
            ..TriggerConfig::default()
        };
        let engine = engine_with(config, action.clone());

        let reports = vec![
            report(updated_container("1.0.0", "1.1.0"), true),
            report(updated_container("2.0.0", "2.0.1"), true),
            report(updated_container("3.0.0", "3.0.0"), true),
        ];
        engine.handle_reports(&reports).await;

        let fired = action.batch.lock().await;
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].1, 2);
        assert_eq!(fired[0].0.title, "2 updates available");
    }

    #[tokio::test]
    async fn test_batch_empty_filter_does_not_fire() {
        let action = RecordingAction::new(false);
        let config = TriggerConfig {
            mode: TriggerMode::Batch,
            ..TriggerConfig::default()
        };
        let engine = engine_with(config, action.clone());

        let reports = vec![report(updated_container("1.0.0", "1.0.0"), true)];
        engine.handle_reports(&reports).await;

        assert!(action.batch.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_simple_body_rendering() {
        let action = RecordingAction::new(false);
        let engine = engine_with(TriggerConfig::default(), action.clone());

        engine
            .handle_report(&report(updated_container("1.0.0", "1.1.0"), true))
            .await;

        let fired = action.simple.lock().await;
        assert_eq!(
            fired[0].0.body,
            "Container app running with tag 1.0.0 can be updated to tag 1.1.0\n"
        );
    }
}
