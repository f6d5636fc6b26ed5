//! Container store contract and in-memory reference implementation.
//!
//! The watcher uses the store for enrichment caching and pruning; the
//! hosting process may swap in a persistent implementation behind the
//! same trait.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::container::Container;
use crate::error::StoreError;

/// Store query filter.
#[derive(Debug, Default, Clone)]
pub struct ContainerFilter {
    /// Restrict to containers owned by this watcher instance.
    pub watcher: Option<String>,
}

impl ContainerFilter {
    /// Filter on one watcher instance name.
    #[must_use]
    pub fn watcher(name: &str) -> Self {
        Self {
            watcher: Some(name.to_string()),
        }
    }

    fn matches(&self, container: &Container) -> bool {
        self.watcher
            .as_ref()
            .map_or(true, |watcher| container.watcher == *watcher)
    }
}

/// Persistence contract for watched containers.
#[async_trait]
pub trait ContainerStore: Send + Sync {
    /// Lists containers matching the filter.
    async fn containers(&self, filter: ContainerFilter) -> Vec<Container>;

    /// Fetches one container by id.
    async fn container(&self, id: &str) -> Option<Container>;

    /// Inserts a container observed for the first time.
    async fn insert(&self, container: Container) -> Container;

    /// Updates an existing container record in place.
    async fn update(&self, container: Container) -> Container;

    /// Deletes a container by id.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] when no record exists for the id.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}

/// In-memory store keyed by container id.
#[derive(Default)]
pub struct MemoryStore {
    containers: RwLock<HashMap<String, Container>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContainerStore for MemoryStore {
    async fn containers(&self, filter: ContainerFilter) -> Vec<Container> {
        self.containers
            .read()
            .await
            .values()
            .filter(|container| filter.matches(container))
            .cloned()
            .collect()
    }

    async fn container(&self, id: &str) -> Option<Container> {
        self.containers.read().await.get(id).cloned()
    }

    async fn insert(&self, container: Container) -> Container {
        self.containers
            .write()
            .await
            .insert(container.id.clone(), container.clone());
        container
    }

    async fn update(&self, container: Container) -> Container {
        self.containers
            .write()
            .await
            .insert(container.id.clone(), container.clone());
        container
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        match self.containers.write().await.remove(id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound { id: id.to_string() }),
        }
    }
}
