//! # Vigil Core
//!
//! Core types and contracts for the Vigil container update watcher:
//!
//! - [`container`] - the watched container model and report types
//! - [`tag`] - tag coercion and semantic-version comparison
//! - [`component`] / [`state`] - the component registry managing the four
//!   pluggable capability kinds (watcher, registry, trigger,
//!   authentication)
//! - [`registry`] - the registry-provider capability contract
//! - [`event`] - the report event bus
//! - [`store`] - the container store contract and in-memory store
//! - [`template`] - named-variable template expansion
//! - [`context`] - the shared application context

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod component;
pub mod container;
pub mod context;
pub mod error;
pub mod event;
pub mod registry;
pub mod state;
pub mod store;
pub mod tag;
pub mod template;

pub use auth::{Authentication, AuthenticatedUser};
pub use component::{Component, ComponentConfig, ComponentKind, ComponentMeta};
pub use container::{Container, ContainerImage, ContainerReport, ScanResult, UpdateKind, UpdateType};
pub use context::AppContext;
pub use error::{ComponentError, StoreError};
pub use event::EventBus;
pub use registry::{ManifestDigest, ProviderError, RegistryProvider};
pub use state::{ComponentConfigurations, ComponentRegistry, ConfigTree, Factory, KindRegistry};
pub use store::{ContainerFilter, ContainerStore, MemoryStore};
pub use tag::SemverDiff;
