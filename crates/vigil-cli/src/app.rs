//! Application assembly.
//!
//! Builds the shared context, installs every provider factory, registers
//! the configured components in the required order, and exposes an
//! explicit shutdown entry point for the hosting process to wire to
//! whatever signal mechanism it uses.

use std::sync::Arc;

use vigil_core::auth::{AnonymousAuth, AnonymousAuthConfig, Authentication, BasicAuth, BasicAuthConfig};
use vigil_core::component::parse_config;
use vigil_core::context::AppContext;
use vigil_core::error::ComponentError;
use vigil_core::state::{ComponentConfigurations, ComponentRegistry};

/// The assembled Vigil application.
pub struct App {
    registry: Arc<ComponentRegistry>,
    ctx: AppContext,
}

impl App {
    /// Creates the application with an in-memory container store and all
    /// built-in provider factories installed.
    #[must_use]
    pub fn new() -> Self {
        let registry = Arc::new(ComponentRegistry::new());
        let ctx = AppContext::in_memory(registry.clone());

        vigil_registry::install_factories(&registry.registries);
        vigil_watcher::install_factories(&registry.watchers, ctx.clone());
        vigil_trigger::install_factories(&registry.triggers, ctx.clone());
        install_auth_factories(&registry);

        Self { registry, ctx }
    }

    /// Returns the shared context.
    #[must_use]
    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    /// Registers every configured component.
    ///
    /// Triggers first so they are subscribed before any watcher can
    /// produce reports, then registries, watchers, authentications.
    pub async fn start(&self, configs: ComponentConfigurations) {
        self.registry.register_components(configs).await;
        tracing::info!(
            watchers = self.registry.watchers.len().await,
            registries = self.registry.registries.len().await,
            triggers = self.registry.triggers.len().await,
            "vigil started"
        );
    }

    /// Deregisters every component, stopping producers before their
    /// consumers.
    ///
    /// # Errors
    ///
    /// Returns the first deregistration failure after attempting all.
    pub async fn shutdown(&self) -> Result<(), ComponentError> {
        tracing::info!("shutting down");
        self.registry.deregister_components().await
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

fn install_auth_factories(registry: &ComponentRegistry) {
    registry.authentications.add_factory(
        "anonymous",
        Arc::new(|meta, value| {
            let _config: AnonymousAuthConfig = parse_config(&meta, value)?;
            Ok(Arc::new(AnonymousAuth::new(meta)) as Arc<dyn Authentication>)
        }),
    );
    registry.authentications.add_factory(
        "basic",
        Arc::new(|meta, value| {
            let config: BasicAuthConfig = parse_config(&meta, value)?;
            Ok(Arc::new(BasicAuth::new(meta, config)) as Arc<dyn Authentication>)
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_defaults_seeded_on_empty_configuration() {
        let app = App::new();
        app.start(ComponentConfigurations::default()).await;

        // Default public registries, one local watcher, anonymous auth.
        assert_eq!(app.registry.registries.len().await, 7);
        assert!(app
            .registry
            .authentications
            .get("anonymous.anonymous")
            .await
            .is_some());
        // The default docker watcher may fail to register on hosts
        // without an engine socket; either way triggers stay empty.
        assert_eq!(app.registry.triggers.len().await, 0);

        app.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_configured_trigger_registers() {
        let app = App::new();
        let configs = crate::config::load_from_env(
            [(
                "VIGIL_TRIGGER_LOG_DEFAULT_MODE".to_string(),
                "simple".to_string(),
            )]
            .into_iter(),
        );
        app.start(configs).await;
        assert!(app.registry.triggers.get("log.default").await.is_some());
        app.shutdown().await.unwrap();
    }
}
