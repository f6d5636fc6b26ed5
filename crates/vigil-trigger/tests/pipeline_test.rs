//! Full pipeline: watcher scan, event bus, trigger filtering, action.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use vigil_core::component::{Component, ComponentKind, ComponentMeta};
use vigil_core::container::{Container, ContainerImage};
use vigil_core::context::AppContext;
use vigil_core::registry::{ManifestDigest, ProviderError, RegistryProvider};
use vigil_core::state::ComponentRegistry;
use vigil_trigger::{Notification, TriggerConfig, TriggerEngine, TriggerError, TriggerProvider};
use vigil_watcher::engine::{
    ContainerEngine, ContainerInspection, ContainerSummary, EventStream, ImageInspection,
};
use vigil_watcher::error::EngineError;
use vigil_watcher::{Watcher, WatcherConfig};

struct StaticRegistry {
    meta: ComponentMeta,
    tags: Vec<String>,
}

impl Component for StaticRegistry {
    fn meta(&self) -> &ComponentMeta {
        &self.meta
    }
}

#[async_trait]
impl RegistryProvider for StaticRegistry {
    fn match_image(&self, _image: &ContainerImage) -> bool {
        true
    }

    fn normalize_image(&self, mut image: ContainerImage) -> ContainerImage {
        image.registry.url = "https://static.registry/v2".to_string();
        image
    }

    fn image_full_name(&self, image: &ContainerImage, tag_value: &str) -> String {
        format!("static.registry/{}:{tag_value}", image.name)
    }

    async fn get_tags(&self, _image: &ContainerImage) -> Result<Vec<String>, ProviderError> {
        Ok(self.tags.clone())
    }

    async fn get_image_manifest_digest(
        &self,
        _image: &ContainerImage,
        _digest_scope: Option<&str>,
    ) -> Result<ManifestDigest, ProviderError> {
        Ok(ManifestDigest {
            digest: None,
            created: None,
            version: 2,
        })
    }
}

struct StaticEngine {
    containers: Vec<ContainerSummary>,
    images: HashMap<String, ImageInspection>,
}

#[async_trait]
impl ContainerEngine for StaticEngine {
    async fn list_containers(&self, _all: bool) -> Result<Vec<ContainerSummary>, EngineError> {
        Ok(self.containers.clone())
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerInspection, EngineError> {
        Err(EngineError::NotFound {
            reference: id.to_string(),
        })
    }

    async fn inspect_image(&self, reference: &str) -> Result<ImageInspection, EngineError> {
        self.images
            .get(reference)
            .cloned()
            .ok_or_else(|| EngineError::NotFound {
                reference: reference.to_string(),
            })
    }

    async fn event_stream(&self) -> Result<EventStream, EngineError> {
        Err(EngineError::Unavailable {
            reason: "no events in this test".to_string(),
        })
    }
}

struct CollectingAction {
    notifications: Mutex<Vec<(Notification, String)>>,
}

#[async_trait]
impl TriggerProvider for CollectingAction {
    async fn notify(
        &self,
        notification: &Notification,
        container: &Container,
    ) -> Result<(), TriggerError> {
        self.notifications
            .lock()
            .await
            .push((notification.clone(), container.name.clone()));
        Ok(())
    }

    async fn notify_batch(
        &self,
        _notification: &Notification,
        _containers: &[Container],
    ) -> Result<(), TriggerError> {
        Ok(())
    }
}

#[tokio::test]
async fn test_scan_report_reaches_subscribed_trigger() {
    let registry = Arc::new(ComponentRegistry::new());
    let ctx = AppContext::in_memory(registry.clone());

    registry.registries.add_factory(
        "static",
        Arc::new(|meta, _value| {
            Ok(Arc::new(StaticRegistry {
                meta,
                tags: vec!["1.2.0".to_string(), "1.3.0".to_string()],
            }) as Arc<dyn RegistryProvider>)
        }),
    );
    registry
        .registries
        .register("static", "public", serde_json::json!({}))
        .await
        .unwrap();

    // Trigger first, so it is subscribed before the watcher produces.
    let action = Arc::new(CollectingAction {
        notifications: Mutex::new(Vec::new()),
    });
    let trigger = TriggerEngine::new(
        ComponentMeta::new(ComponentKind::Trigger, "log", "default"),
        TriggerConfig::default(),
        ctx.clone(),
        action.clone(),
    );
    trigger.init().await.unwrap();

    let engine = StaticEngine {
        containers: vec![ContainerSummary {
            id: "c1".to_string(),
            names: vec!["/app".to_string()],
            image: "app:1.2.0".to_string(),
            state: "running".to_string(),
            labels: HashMap::new(),
        }],
        images: HashMap::from([(
            "app:1.2.0".to_string(),
            ImageInspection {
                id: "sha256:img".to_string(),
                architecture: "amd64".to_string(),
                os: "linux".to_string(),
                variant: None,
                created: None,
                repo_digests: vec![],
                repo_tags: vec![],
                config_image: None,
            },
        )]),
    };
    let config: WatcherConfig = serde_json::from_value(serde_json::json!({
        "watchatstart": false,
        "watchevents": false,
    }))
    .unwrap();
    let watcher = Watcher::with_engine(
        ComponentMeta::new(ComponentKind::Watcher, "docker", "local"),
        config,
        ctx.clone(),
        Arc::new(engine),
    );

    let reports = watcher.scan_now().await;
    assert_eq!(reports.len(), 1);
    assert!(reports[0].container.update_available);

    // The report travels through the bus to the trigger task.
    let mut fired = Vec::new();
    for _ in 0..100 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        fired = action.notifications.lock().await.clone();
        if !fired.is_empty() {
            break;
        }
    }
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].1, "app");
    assert_eq!(fired[0].0.title, "New tag found for container app");

    trigger.deregister().await.unwrap();
}
