//! # Vigil Watcher
//!
//! The container watcher: lists containers from an engine, enriches them
//! with image metadata, resolves newer tags and digests through the
//! registry providers held in the component registry, persists results,
//! and emits reports over the event bus.
//!
//! Scheduling combines a jittered periodic timer with a debounced
//! reaction to engine lifecycle events; at most one scan is ever in
//! flight per watcher instance.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod debounce;
pub mod docker;
pub mod engine;
pub mod error;
pub mod events;
pub mod labels;
pub mod reference;
pub mod resolve;
pub mod scheduler;
pub mod watcher;

use std::sync::Arc;

use vigil_core::component::Component;
use vigil_core::context::AppContext;
use vigil_core::state::KindRegistry;

pub use config::WatcherConfig;
pub use engine::{ContainerEngine, ContainerInspection, ContainerSummary, ImageInspection};
pub use error::{EngineError, Result, WatchError};
pub use watcher::Watcher;

/// Registers the built-in watcher provider factories.
pub fn install_factories(registry: &KindRegistry<dyn Component>, ctx: AppContext) {
    registry.add_factory(
        "docker",
        Arc::new(move |meta, value| {
            Ok(Arc::new(Watcher::from_config(meta, value, ctx.clone())?) as Arc<dyn Component>)
        }),
    );
}
