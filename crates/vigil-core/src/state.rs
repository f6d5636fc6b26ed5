//! Component registry: lifecycle manager for all capability instances.
//!
//! Provider resolution is a static factory table per kind, looked up by
//! provider-type string; unknown types fail fast with the list of
//! available providers. Registered instances live in per-kind maps that
//! are only mutated on fully successful registration, so readers never
//! observe a half-registered entry.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock as SyncRwLock};

use futures::future::join_all;
use tokio::sync::RwLock;

use crate::auth::Authentication;
use crate::component::{Component, ComponentKind, ComponentMeta};
use crate::error::ComponentError;
use crate::registry::RegistryProvider;

/// Configuration tree for one kind: provider type to instance name to
/// instance configuration.
pub type ConfigTree = HashMap<String, HashMap<String, serde_json::Value>>;

/// Constructor for a component of capability `T`.
///
/// The factory validates the configuration and builds the instance; it
/// must not have side effects (those belong in the init hook).
pub type Factory<T> =
    Arc<dyn Fn(ComponentMeta, serde_json::Value) -> Result<Arc<T>, ComponentError> + Send + Sync>;

/// Registry providers seeded when no registry configuration is supplied.
pub const DEFAULT_REGISTRIES: &[&str] =
    &["codeberg", "ecr", "forgejo", "gcr", "ghcr", "hub", "quay"];

/// Instance name used for default-seeded public registries.
pub const DEFAULT_REGISTRY_INSTANCE: &str = "public";

/// Registry and active instances for one component kind.
pub struct KindRegistry<T: Component + ?Sized> {
    kind: ComponentKind,
    factories: SyncRwLock<HashMap<String, Factory<T>>>,
    components: RwLock<HashMap<String, Arc<T>>>,
}

impl<T: Component + ?Sized> KindRegistry<T> {
    /// Creates an empty registry for a kind.
    #[must_use]
    pub fn new(kind: ComponentKind) -> Self {
        Self {
            kind,
            factories: SyncRwLock::new(HashMap::new()),
            components: RwLock::new(HashMap::new()),
        }
    }

    /// Adds a provider factory to the static table.
    pub fn add_factory(&self, provider: &str, factory: Factory<T>) {
        self.factories
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(provider.to_lowercase(), factory);
    }

    /// Returns the sorted list of known provider types.
    #[must_use]
    pub fn available_providers(&self) -> Vec<String> {
        let mut providers: Vec<String> = self
            .factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        providers.sort();
        providers
    }

    /// Registers one component instance.
    ///
    /// Resolves the provider factory, validates the configuration, runs
    /// the init hook, then inserts the instance at `state[kind][id]`. Any
    /// failure leaves the state unchanged. Re-registering an existing id
    /// replaces the previous instance.
    ///
    /// # Errors
    ///
    /// [`ComponentError::UnknownProvider`] when no factory exists for the
    /// provider type; [`ComponentError::Configuration`] when validation
    /// fails; [`ComponentError::Init`] when the init hook fails.
    pub async fn register(
        &self,
        provider: &str,
        name: &str,
        config: serde_json::Value,
    ) -> Result<Arc<T>, ComponentError> {
        let provider = provider.to_lowercase();
        let factory = self
            .factories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&provider)
            .cloned()
            .ok_or_else(|| ComponentError::UnknownProvider {
                kind: self.kind,
                provider: provider.clone(),
                available: self.available_providers(),
                docs: self.kind.docs(),
            })?;

        let meta = ComponentMeta::new(self.kind, &provider, name);
        let id = meta.id().to_string();
        let component = factory(meta, config)?;
        component.init().await?;

        tracing::info!(kind = %self.kind, component = %id, "component registered");
        self.components.write().await.insert(id, component.clone());
        Ok(component)
    }

    /// Registers every (provider, instance) pair of a configuration tree.
    ///
    /// Registrations run concurrently; one instance failing is logged as
    /// a warning and does not prevent its siblings from registering.
    pub async fn register_all(&self, configs: ConfigTree) -> Vec<Arc<T>> {
        let mut pending = Vec::new();
        for (provider, instances) in configs {
            for (name, config) in instances {
                let provider = provider.clone();
                pending.push(async move {
                    let registered = self.register(&provider, &name, config).await;
                    if let Err(e) = &registered {
                        tracing::warn!(
                            kind = %self.kind,
                            provider = %provider,
                            name = %name,
                            "component failed to register ({e})"
                        );
                    }
                    registered
                });
            }
        }
        join_all(pending)
            .await
            .into_iter()
            .filter_map(Result::ok)
            .collect()
    }

    /// Deregisters one component by id.
    ///
    /// The deregistration hook is best-effort: the component is removed
    /// from state whether or not the hook fails.
    ///
    /// # Errors
    ///
    /// [`ComponentError::Deregistration`] naming the component when its
    /// hook failed.
    pub async fn deregister(&self, id: &str) -> Result<(), ComponentError> {
        let Some(component) = self.components.write().await.remove(id) else {
            return Ok(());
        };
        component
            .deregister()
            .await
            .map_err(|e| ComponentError::Deregistration {
                component: id.to_string(),
                reason: e.to_string(),
            })
    }

    /// Deregisters every component of this kind.
    ///
    /// Every component is attempted; the first failure is propagated
    /// afterwards.
    pub async fn deregister_all(&self) -> Result<(), ComponentError> {
        let ids: Vec<String> = self.components.read().await.keys().cloned().collect();
        let mut first_error = None;
        for id in ids {
            if let Err(e) = self.deregister(&id).await {
                tracing::warn!(kind = %self.kind, component = %id, "deregistration failed ({e})");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Looks a component up by id.
    pub async fn get(&self, id: &str) -> Option<Arc<T>> {
        self.components.read().await.get(id).cloned()
    }

    /// Returns every active component of this kind.
    pub async fn all(&self) -> Vec<Arc<T>> {
        self.components.read().await.values().cloned().collect()
    }

    /// Returns the number of active components.
    pub async fn len(&self) -> usize {
        self.components.read().await.len()
    }

    /// Returns true when no component is active.
    pub async fn is_empty(&self) -> bool {
        self.components.read().await.is_empty()
    }
}

/// Configuration trees for all four kinds, as loaded at startup.
#[derive(Debug, Default, Clone)]
pub struct ComponentConfigurations {
    /// Watcher instances by provider.
    pub watcher: ConfigTree,

    /// Registry instances by provider.
    pub registry: ConfigTree,

    /// Trigger instances by provider.
    pub trigger: ConfigTree,

    /// Authentication instances by provider.
    pub authentication: ConfigTree,
}

/// The shared component registry holding all four capability kinds.
pub struct ComponentRegistry {
    /// Watcher instances.
    pub watchers: KindRegistry<dyn Component>,

    /// Registry provider instances.
    pub registries: KindRegistry<dyn RegistryProvider>,

    /// Trigger instances.
    pub triggers: KindRegistry<dyn Component>,

    /// Authentication instances.
    pub authentications: KindRegistry<dyn Authentication>,
}

impl ComponentRegistry {
    /// Creates a registry with empty factory tables.
    #[must_use]
    pub fn new() -> Self {
        Self {
            watchers: KindRegistry::new(ComponentKind::Watcher),
            registries: KindRegistry::new(ComponentKind::Registry),
            triggers: KindRegistry::new(ComponentKind::Trigger),
            authentications: KindRegistry::new(ComponentKind::Authentication),
        }
    }

    /// Registers all configured components.
    ///
    /// Kinds register in the order trigger, registry, watcher,
    /// authentication: triggers must be subscribed before any watcher can
    /// produce events, otherwise early reports would be dropped silently.
    ///
    /// Kind defaulting: with no registry configuration the well-known
    /// public registries are seeded; with no watcher configuration a
    /// single local docker watcher is seeded; with no authentication
    /// configuration a single anonymous strategy is seeded.
    pub async fn register_components(&self, mut configs: ComponentConfigurations) {
        self.triggers.register_all(configs.trigger).await;

        if configs.registry.is_empty() {
            tracing::info!("no registry configured, seeding default public registries");
            configs.registry = default_registry_configs();
        }
        self.registries.register_all(configs.registry).await;

        if configs.watcher.is_empty() {
            tracing::info!("no watcher configured, seeding a default local docker watcher");
            configs.watcher = HashMap::from([(
                "docker".to_string(),
                HashMap::from([("local".to_string(), serde_json::json!({}))]),
            )]);
        }
        self.watchers.register_all(configs.watcher).await;

        if configs.authentication.is_empty() {
            tracing::info!("no authentication configured, allowing anonymous access");
            configs.authentication = HashMap::from([(
                "anonymous".to_string(),
                HashMap::from([("anonymous".to_string(), serde_json::json!({}))]),
            )]);
        }
        self.authentications
            .register_all(configs.authentication)
            .await;
    }

    /// Deregisters every component.
    ///
    /// Kinds deregister in the order watcher, trigger, registry,
    /// authentication so producers stop before or with their consumers.
    /// Every kind is attempted; the first failure is propagated last.
    ///
    /// # Errors
    ///
    /// Returns the first deregistration failure after attempting all.
    pub async fn deregister_components(&self) -> Result<(), ComponentError> {
        let mut first_error = None;
        for result in [
            self.watchers.deregister_all().await,
            self.triggers.deregister_all().await,
            self.registries.deregister_all().await,
            self.authentications.deregister_all().await,
        ] {
            if let Err(e) = result {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds the default registry configuration tree (public instances of
/// the well-known registries).
#[must_use]
pub fn default_registry_configs() -> ConfigTree {
    DEFAULT_REGISTRIES
        .iter()
        .map(|provider| {
            (
                (*provider).to_string(),
                HashMap::from([(
                    DEFAULT_REGISTRY_INSTANCE.to_string(),
                    serde_json::json!({}),
                )]),
            )
        })
        .collect()
}
