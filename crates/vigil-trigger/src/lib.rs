//! # Vigil Trigger
//!
//! The trigger filtering engine: decides, per configured action, whether
//! and how to fire given watcher output. Gates are applied in order
//! (changed, update available, threshold, per-container directives);
//! notification titles and bodies are rendered by plain named-variable
//! substitution.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod engine;
pub mod error;
pub mod log;
pub mod threshold;

use std::sync::Arc;

use vigil_core::component::{parse_config, Component};
use vigil_core::context::AppContext;
use vigil_core::state::KindRegistry;

pub use config::{TriggerConfig, TriggerMode};
pub use engine::{Notification, TriggerEngine, TriggerProvider};
pub use error::{Result, TriggerError};
pub use threshold::{parse_directives, Threshold, TriggerDirective};

/// Registers the built-in trigger provider factories.
pub fn install_factories(registry: &KindRegistry<dyn Component>, ctx: AppContext) {
    registry.add_factory(
        "log",
        Arc::new(move |meta, value| {
            let config: TriggerConfig = parse_config(&meta, value)?;
            Ok(Arc::new(TriggerEngine::new(
                meta,
                config,
                ctx.clone(),
                Arc::new(log::LogTrigger::new()),
            )) as Arc<dyn Component>)
        }),
    );
}
