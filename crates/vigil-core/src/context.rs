//! Application context shared by all components.
//!
//! Constructed once at startup and passed explicitly to watchers,
//! triggers and the hosting process. There is no process-global state.

use std::sync::Arc;

use crate::event::EventBus;
use crate::state::ComponentRegistry;
use crate::store::{ContainerStore, MemoryStore};

/// Shared handles every component receives at construction.
#[derive(Clone)]
pub struct AppContext {
    /// The component registry (all four capability kinds).
    pub registry: Arc<ComponentRegistry>,

    /// The container store.
    pub store: Arc<dyn ContainerStore>,

    /// The report event bus.
    pub bus: Arc<EventBus>,
}

impl AppContext {
    /// Creates a context around an explicit store implementation.
    #[must_use]
    pub fn new(registry: Arc<ComponentRegistry>, store: Arc<dyn ContainerStore>) -> Self {
        Self {
            registry,
            store,
            bus: Arc::new(EventBus::new()),
        }
    }

    /// Creates a context with the in-memory store.
    #[must_use]
    pub fn in_memory(registry: Arc<ComponentRegistry>) -> Self {
        Self::new(registry, Arc::new(MemoryStore::new()))
    }
}
