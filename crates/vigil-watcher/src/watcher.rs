//! The container watcher component.
//!
//! One instance per configured engine. A scan worker serializes full
//! scans (a scan requested while one runs coalesces into exactly one
//! follow-up), a jittered timer requests periodic scans, and the event
//! subscription turns engine lifecycle events into debounced rescans
//! while patching plain status changes in place.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use futures::StreamExt as _;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;

use vigil_core::component::{parse_config, Component, ComponentMeta};
use vigil_core::container::{
    Container, ContainerError, ContainerImage, ContainerReport, ImageDigest, ImageRegistry,
    ImageTag, ScanResult, UpdateKind,
};
use vigil_core::context::AppContext;
use vigil_core::error::ComponentError;
use vigil_core::registry::RegistryProvider;
use vigil_core::store::ContainerFilter;
use vigil_core::tag;

use crate::config::WatcherConfig;
use crate::debounce::{debouncer, DebounceHandle};
use crate::docker::DockerEngine;
use crate::engine::{ContainerEngine, ContainerSummary};
use crate::error::WatchError;
use crate::events::{parse_event, EngineEvent, EventFramer};
use crate::labels;
use crate::reference;
use crate::resolve;
use crate::scheduler::ScanSchedule;

/// Delay before the initial scan and event subscription, giving sibling
/// components time to finish registering.
const START_DELAY: Duration = Duration::from_secs(1);

/// Quiet window collapsing a burst of lifecycle events into one rescan.
const DEBOUNCE_WINDOW: Duration = Duration::from_secs(5);

/// Delay before reconnecting a dropped event stream.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Watcher component over one container engine.
pub struct Watcher {
    inner: Arc<WatcherInner>,
    shutdown: watch::Sender<bool>,
    scan_rx: Mutex<Option<mpsc::Receiver<()>>>,
    debounce: Mutex<Option<DebounceHandle>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

struct WatcherInner {
    meta: ComponentMeta,
    config: WatcherConfig,
    ctx: AppContext,
    engine: Arc<dyn ContainerEngine>,
    scan_tx: mpsc::Sender<()>,
    // Guarantees at most one scan in flight even for direct scan calls.
    scan_lock: Mutex<()>,
}

impl Watcher {
    /// Builds a watcher over the Docker engine described by the
    /// configuration value.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the value fails validation or
    /// the engine client cannot be constructed.
    pub fn from_config(
        meta: ComponentMeta,
        value: serde_json::Value,
        ctx: AppContext,
    ) -> Result<Self, ComponentError> {
        let config: WatcherConfig = parse_config(&meta, value)?;
        let engine = DockerEngine::new(&config).map_err(|e| ComponentError::Configuration {
            component: meta.id().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::with_engine(meta, config, ctx, Arc::new(engine)))
    }

    /// Builds a watcher over an explicit engine implementation.
    #[must_use]
    pub fn with_engine(
        meta: ComponentMeta,
        config: WatcherConfig,
        ctx: AppContext,
        engine: Arc<dyn ContainerEngine>,
    ) -> Self {
        // One buffered slot: a request during a running scan is deferred,
        // further requests coalesce into it.
        let (scan_tx, scan_rx) = mpsc::channel(1);
        let (shutdown, _) = watch::channel(false);
        Self {
            inner: Arc::new(WatcherInner {
                meta,
                config,
                ctx,
                engine,
                scan_tx,
                scan_lock: Mutex::new(()),
            }),
            shutdown,
            scan_rx: Mutex::new(Some(scan_rx)),
            debounce: Mutex::new(None),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Requests a scan; coalesced while one is already pending.
    pub fn request_scan(&self) {
        self.inner.request_scan();
    }

    /// Runs one scan cycle right away, returning its reports.
    ///
    /// Exposed for manual runs by the hosting process; scheduled scans go
    /// through the scan worker instead.
    pub async fn scan_now(&self) -> Vec<ContainerReport> {
        self.inner.run_scan().await
    }
}

#[async_trait]
impl Component for Watcher {
    fn meta(&self) -> &ComponentMeta {
        &self.inner.meta
    }

    async fn init(&self) -> Result<(), ComponentError> {
        let mut tasks = self.tasks.lock().await;

        // Scan worker: the single place scans actually run.
        let Some(mut scan_rx) = self.scan_rx.lock().await.take() else {
            return Err(ComponentError::Init {
                component: self.inner.meta.id().to_string(),
                reason: "watcher initialized twice".to_string(),
            });
        };
        let inner = self.inner.clone();
        tasks.push(tokio::spawn(async move {
            while scan_rx.recv().await.is_some() {
                inner.run_scan().await;
            }
        }));

        // Periodic timer.
        let inner = self.inner.clone();
        let mut shutdown_rx = self.shutdown.subscribe();
        let schedule =
            ScanSchedule::from_seconds(self.inner.config.interval, self.inner.config.jitter);
        tracing::info!(
            watcher = %self.inner.meta.id(),
            interval_seconds = self.inner.config.interval,
            jitter_seconds = self.inner.config.jitter,
            "scan schedule installed"
        );
        tasks.push(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(schedule.next_delay()) => inner.request_scan(),
                    _ = shutdown_rx.changed() => break,
                }
            }
        }));

        // Engine events: debounced rescans plus in-place status patching.
        if self.inner.config.watch_events {
            let (debounce_handle, mut fired) = debouncer(DEBOUNCE_WINDOW);
            *self.debounce.lock().await = Some(debounce_handle.clone());

            let inner = self.inner.clone();
            tasks.push(tokio::spawn(async move {
                while fired.recv().await.is_some() {
                    inner.request_scan();
                }
            }));

            let inner = self.inner.clone();
            let shutdown_rx = self.shutdown.subscribe();
            tasks.push(tokio::spawn(async move {
                tokio::time::sleep(START_DELAY).await;
                inner.event_loop(debounce_handle, shutdown_rx).await;
            }));
        }

        // Initial scan when the store holds nothing for this watcher yet.
        let store_empty = self
            .inner
            .ctx
            .store
            .containers(ContainerFilter::watcher(self.inner.meta.name()))
            .await
            .is_empty();
        if self.inner.config.watch_at_start && store_empty {
            let inner = self.inner.clone();
            tasks.push(tokio::spawn(async move {
                tokio::time::sleep(START_DELAY).await;
                inner.request_scan();
            }));
        }

        Ok(())
    }

    async fn deregister(&self) -> Result<(), ComponentError> {
        let _ = self.shutdown.send(true);
        self.debounce.lock().await.take();
        for task in self.tasks.lock().await.drain(..) {
            task.abort();
        }
        tracing::info!(watcher = %self.inner.meta.id(), "watcher stopped");
        Ok(())
    }
}

impl WatcherInner {
    fn request_scan(&self) {
        let _ = self.scan_tx.try_send(());
    }

    /// One full scan cycle.
    async fn run_scan(&self) -> Vec<ContainerReport> {
        let _guard = self.scan_lock.lock().await;
        tracing::info!(watcher = %self.meta.id(), "scan started");
        let reports = self.watch().await;

        let errors = reports
            .iter()
            .filter(|report| report.container.error.is_some())
            .count();
        let updates = reports
            .iter()
            .filter(|report| report.container.update_available)
            .count();
        tracing::info!(
            watcher = %self.meta.id(),
            "scan finished ({} containers watched, {errors} errors, {updates} available updates)",
            reports.len(),
        );
        reports
    }

    async fn watch(&self) -> Vec<ContainerReport> {
        let containers = match self.get_containers().await {
            Ok(containers) => containers,
            Err(e) => {
                // The cycle is aborted; the next timer tick gets a fresh try.
                tracing::warn!(
                    watcher = %self.meta.id(),
                    "error when trying to get the list of containers to watch ({e})"
                );
                return Vec::new();
            }
        };

        let reports = join_all(
            containers
                .into_iter()
                .map(|container| self.watch_container(container)),
        )
        .await;

        self.ctx.bus.publish_reports(reports.clone());
        reports
    }

    /// Watches one container: resolve, classify, persist, report.
    async fn watch_container(&self, container: Container) -> ContainerReport {
        let mut container = container;
        let name = container.full_name();
        container.result = None;
        container.error = None;
        tracing::debug!(container = %name, "resolving");

        match self.find_new_version(&mut container).await {
            Ok(result) => container.result = Some(result),
            Err(e) => {
                tracing::warn!(container = %name, "error when processing ({e})");
                container.error = Some(ContainerError {
                    message: e.to_string(),
                });
            }
        }
        container.refresh_update_state();

        let report = self.map_report(container).await;
        self.ctx.bus.publish_report(report.clone());
        report
    }

    /// Persists the scanned container and derives the changed flag.
    async fn map_report(&self, container: Container) -> ContainerReport {
        match self.ctx.store.container(&container.id).await {
            None => {
                tracing::debug!(container = %container.full_name(), "watched for the first time");
                let container = self.ctx.store.insert(container).await;
                ContainerReport {
                    container,
                    changed: true,
                }
            }
            Some(previous) => {
                let changed = container.result_changed(&previous) && container.update_available;
                let container = self.ctx.store.update(container).await;
                ContainerReport { container, changed }
            }
        }
    }

    /// Resolves the newest tag and digest for one container.
    async fn find_new_version(&self, container: &mut Container) -> Result<ScanResult, WatchError> {
        let registry_id = container.image.registry.name.clone();
        let provider = self
            .ctx
            .registry
            .registries
            .get(&registry_id)
            .await
            .ok_or(WatchError::UnsupportedRegistry {
                registry: registry_id,
            })?;

        let tags = provider
            .get_tags(&container.image)
            .await
            .map_err(|e| WatchError::Resolution {
                reason: e.to_string(),
            })?;
        let candidates = resolve::tag_candidates(container, tags)?;

        let mut result = ScanResult {
            tag: container.image.tag.value.clone(),
            digest: None,
            created: None,
            link: None,
        };

        if container.image.digest.watch && container.image.digest.repo.is_some() {
            // With a tag candidate in hand the remote digest is the
            // candidate's (local `app:8` against remote `app:8.1.0`),
            // otherwise the current tag's.
            let mut digest_image = container.image.clone();
            if let Some(best) = candidates.first() {
                digest_image.tag.value = best.clone();
            }

            let remote = provider
                .get_image_manifest_digest(&digest_image, None)
                .await
                .map_err(|e| WatchError::Resolution {
                    reason: e.to_string(),
                })?;
            result.digest = remote.digest.clone();
            result.created = remote.created;

            if remote.version == 2 {
                // The scope-qualified lookup yields the digest comparable
                // with the locally pinned repo digest.
                let scoped = provider
                    .get_image_manifest_digest(&digest_image, container.image.digest.repo.as_deref())
                    .await
                    .map_err(|e| WatchError::Resolution {
                        reason: e.to_string(),
                    })?;
                container.image.digest.value = scoped.digest;
            } else {
                // Legacy v1 manifests have no comparable digest; the local
                // image configuration identifier stands in.
                let image = self.engine.inspect_image(&container.image.id).await?;
                container.image.digest.value = image.config_image;
            }
        }

        if let Some(best) = candidates.first() {
            result.tag = best.clone();
        }
        result.link = container.render_link(&result.tag);

        Ok(result)
    }

    /// Lists, filters, enriches and prunes the watched container set.
    async fn get_containers(&self) -> Result<Vec<Container>, WatchError> {
        let summaries = self
            .engine
            .list_containers(self.config.watch_all)
            .await
            .map_err(|e| WatchError::Scan {
                reason: e.to_string(),
            })?;

        let watched: Vec<ContainerSummary> = summaries
            .into_iter()
            .filter(|summary| {
                is_container_to_watch(
                    summary.labels.get(labels::WATCH).map(String::as_str),
                    self.config.watch_by_default,
                )
            })
            .collect();

        let enriched = join_all(
            watched
                .into_iter()
                .map(|summary| async move {
                    let id = summary.id.clone();
                    match self.add_image_details(summary).await {
                        Ok(container) => container,
                        Err(e) => {
                            tracing::warn!(
                                watcher = %self.meta.id(),
                                container = %id,
                                "failed to fetch image details ({e})"
                            );
                            None
                        }
                    }
                }),
        )
        .await;
        let containers: Vec<Container> = enriched.into_iter().flatten().collect();

        self.prune_old_containers(&containers).await;

        Ok(containers)
    }

    /// Deletes store records absent from the fresh listing.
    async fn prune_old_containers(&self, fresh: &[Container]) {
        let stored = self
            .ctx
            .store
            .containers(ContainerFilter::watcher(self.meta.name()))
            .await;
        for old in stored {
            if !fresh.iter().any(|container| container.id == old.id) {
                if let Err(e) = self.ctx.store.delete(&old.id).await {
                    tracing::warn!(
                        watcher = %self.meta.id(),
                        container = %old.full_name(),
                        "error when trying to prune an old container ({e})"
                    );
                }
            }
        }
    }

    /// Enriches one listing entry with image metadata, reusing the cached
    /// record when the container is already known and error-free.
    async fn add_image_details(
        &self,
        summary: ContainerSummary,
    ) -> Result<Option<Container>, WatchError> {
        if let Some(mut cached) = self.ctx.store.container(&summary.id).await {
            if cached.error.is_none() {
                tracing::debug!(container = %cached.full_name(), "already in store");
                // The digest-watch label is re-read so flipping it takes
                // effect without recreating the container.
                if let Some(value) = summary.labels.get(labels::WATCH_DIGEST) {
                    if !value.is_empty() {
                        cached.image.digest.watch = value.eq_ignore_ascii_case("true");
                    }
                }
                return Ok(Some(cached));
            }
        }

        let image = self.engine.inspect_image(&summary.image).await?;

        // A bare digest reference carries no usable tag; fall back to the
        // first repo tag when one exists.
        let mut reference_to_parse = summary.image.clone();
        if reference_to_parse.contains("sha256:") {
            match image.repo_tags.first() {
                Some(first) => reference_to_parse = first.clone(),
                None => {
                    tracing::warn!(
                        watcher = %self.meta.id(),
                        image = %reference_to_parse,
                        "cannot resolve a reliable tag for this image, skipping"
                    );
                    return Ok(None);
                }
            }
        }
        let parsed = reference::parse(&reference_to_parse);
        let tag_name = parsed.tag.unwrap_or_else(|| "latest".to_string());

        let transform_spec = summary.labels.get(labels::TAG_TRANSFORM).cloned();
        let is_semver = tag::is_semver(&tag::transform(transform_spec.as_deref(), &tag_name));
        let watch_digest = resolve::is_digest_to_watch(
            summary.labels.get(labels::WATCH_DIGEST).map(String::as_str),
            &parsed.domain,
            is_semver,
        );
        if !is_semver && !watch_digest {
            tracing::warn!(
                watcher = %self.meta.id(),
                container = %summary.display_name(),
                "image is not semver and digest watching is disabled, no update will ever be reported"
            );
        }

        let container = Container {
            id: summary.id.clone(),
            name: summary.display_name(),
            status: summary.state.clone(),
            watcher: self.meta.name().to_string(),
            display_name: summary.labels.get(labels::DISPLAY_NAME).cloned(),
            display_icon: summary.labels.get(labels::DISPLAY_ICON).cloned(),
            include_tags: summary.labels.get(labels::TAG_INCLUDE).cloned(),
            exclude_tags: summary.labels.get(labels::TAG_EXCLUDE).cloned(),
            transform_tags: transform_spec,
            link_template: summary.labels.get(labels::LINK_TEMPLATE).cloned(),
            link: None,
            trigger_include: summary.labels.get(labels::TRIGGER_INCLUDE).cloned(),
            trigger_exclude: summary.labels.get(labels::TRIGGER_EXCLUDE).cloned(),
            image: ContainerImage {
                id: image.id.clone(),
                registry: ImageRegistry {
                    name: "unknown".to_string(),
                    url: parsed.domain.clone(),
                },
                name: parsed.path,
                tag: ImageTag {
                    value: tag_name,
                    semver: is_semver,
                },
                digest: ImageDigest {
                    watch: watch_digest,
                    repo: image.repo_digest(),
                    value: None,
                },
                architecture: image.architecture,
                os: image.os,
                variant: image.variant,
                created: image.created,
            },
            labels: summary.labels,
            result: None,
            error: None,
            update_available: false,
            update_kind: UpdateKind::unknown(),
        };

        Ok(Some(self.normalize_container(container).await))
    }

    /// Hands the container image to the matching registry provider.
    async fn normalize_container(&self, mut container: Container) -> Container {
        let providers = self.ctx.registry.registries.all().await;
        let matched: Option<Arc<dyn RegistryProvider>> = providers
            .into_iter()
            .find(|provider| provider.match_image(&container.image));

        match matched {
            Some(provider) => {
                container.image = provider.normalize_image(container.image);
                container.image.registry.name = provider.meta().id().to_string();
            }
            None => {
                tracing::warn!(
                    container = %container.full_name(),
                    "no registry provider matched this image"
                );
                container.image.registry.name = "unknown".to_string();
            }
        }
        container
    }

    /// Long-lived event subscription with reconnection.
    async fn event_loop(&self, debounce: DebounceHandle, mut shutdown_rx: watch::Receiver<bool>) {
        loop {
            match self.engine.event_stream().await {
                Err(e) => {
                    tracing::warn!(
                        watcher = %self.meta.id(),
                        "unable to listen to engine events ({e})"
                    );
                }
                Ok(mut stream) => {
                    tracing::info!(watcher = %self.meta.id(), "listening to engine events");
                    let mut framer = EventFramer::new();
                    loop {
                        tokio::select! {
                            _ = shutdown_rx.changed() => return,
                            chunk = stream.next() => match chunk {
                                Some(Ok(bytes)) => {
                                    for line in framer.push(&bytes) {
                                        match parse_event(&line) {
                                            Ok(event) => self.on_event(event, &debounce).await,
                                            Err(e) => tracing::warn!(
                                                watcher = %self.meta.id(),
                                                record = %line,
                                                "unable to parse engine event ({e})"
                                            ),
                                        }
                                    }
                                }
                                Some(Err(e)) => {
                                    tracing::warn!(
                                        watcher = %self.meta.id(),
                                        "engine event stream error ({e}), reconnecting"
                                    );
                                    break;
                                }
                                None => {
                                    tracing::warn!(
                                        watcher = %self.meta.id(),
                                        "engine event stream ended, reconnecting"
                                    );
                                    break;
                                }
                            }
                        }
                    }
                }
            }

            tokio::select! {
                _ = shutdown_rx.changed() => return,
                _ = tokio::time::sleep(RECONNECT_DELAY) => {}
            }
        }
    }

    /// Reacts to one decoded engine event.
    async fn on_event(&self, event: EngineEvent, debounce: &DebounceHandle) {
        if event.is_lifecycle() {
            debounce.signal();
            return;
        }

        // Containers outside the watched store are none of our business.
        let Some(mut stored) = self.ctx.store.container(&event.id).await else {
            return;
        };
        match self.engine.inspect_container(&event.id).await {
            Ok(inspection) => {
                if stored.status != inspection.status {
                    let old_status = std::mem::replace(&mut stored.status, inspection.status);
                    tracing::info!(
                        container = %stored.full_name(),
                        from = %old_status,
                        to = %stored.status,
                        "status changed"
                    );
                    self.ctx.store.update(stored).await;
                }
            }
            Err(e) => {
                tracing::debug!(
                    container = %event.id,
                    "unable to inspect container after event ({e})"
                );
            }
        }
    }
}

/// Returns true when the container opts into watching.
fn is_container_to_watch(label: Option<&str>, watch_by_default: bool) -> bool {
    match label {
        Some(value) if !value.is_empty() => value.eq_ignore_ascii_case("true"),
        _ => watch_by_default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_container_to_watch() {
        assert!(is_container_to_watch(Some("true"), false));
        assert!(is_container_to_watch(Some("TRUE"), false));
        assert!(!is_container_to_watch(Some("false"), true));
        assert!(is_container_to_watch(None, true));
        assert!(!is_container_to_watch(None, false));
        assert!(is_container_to_watch(Some(""), true));
    }
}
