//! Docker engine adapter.
//!
//! Implements [`ContainerEngine`] over the Docker API via bollard,
//! connecting through the unix socket by default or over TCP when a
//! host is configured.

use std::collections::HashMap;
use std::sync::Arc;

use bollard::container::{InspectContainerOptions, ListContainersOptions};
use bollard::system::EventsOptions;
use bollard::Docker;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::StreamExt as _;

use crate::config::WatcherConfig;
use crate::engine::{
    ContainerEngine, ContainerInspection, ContainerSummary, EventStream, ImageInspection,
};
use crate::error::EngineError;
use crate::events::WATCHED_ACTIONS;

const CONNECT_TIMEOUT_SECS: u64 = 60;

/// Docker implementation of the container engine contract.
pub struct DockerEngine {
    docker: Arc<Docker>,
}

impl DockerEngine {
    /// Connects to the engine described by the watcher configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Unavailable`] when the client cannot be
    /// constructed (connectivity itself is probed lazily).
    pub fn new(config: &WatcherConfig) -> Result<Self, EngineError> {
        let docker = match &config.host {
            Some(host) => Docker::connect_with_http(
                &format!("http://{host}:{}", config.port),
                CONNECT_TIMEOUT_SECS,
                bollard::API_DEFAULT_VERSION,
            ),
            None => Docker::connect_with_socket(
                &config.socket,
                CONNECT_TIMEOUT_SECS,
                bollard::API_DEFAULT_VERSION,
            ),
        }
        .map_err(|e| EngineError::Unavailable {
            reason: e.to_string(),
        })?;

        Ok(Self {
            docker: Arc::new(docker),
        })
    }
}

fn map_error(error: bollard::errors::Error) -> EngineError {
    match error {
        bollard::errors::Error::DockerResponseServerError {
            status_code: 404,
            message,
        } => EngineError::NotFound { reference: message },
        other => EngineError::Api {
            reason: other.to_string(),
        },
    }
}

fn parse_created(created: Option<&str>) -> Option<DateTime<Utc>> {
    created
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|parsed| parsed.with_timezone(&Utc))
}

#[async_trait::async_trait]
impl ContainerEngine for DockerEngine {
    async fn list_containers(&self, all: bool) -> Result<Vec<ContainerSummary>, EngineError> {
        let options = ListContainersOptions::<String> {
            all,
            ..Default::default()
        };
        let containers = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(map_error)?;

        Ok(containers
            .into_iter()
            .map(|container| ContainerSummary {
                id: container.id.unwrap_or_default(),
                names: container.names.unwrap_or_default(),
                image: container.image.unwrap_or_default(),
                state: container.state.unwrap_or_default(),
                labels: container.labels.unwrap_or_default(),
            })
            .collect())
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerInspection, EngineError> {
        let inspection = self
            .docker
            .inspect_container(id, None::<InspectContainerOptions>)
            .await
            .map_err(map_error)?;

        Ok(ContainerInspection {
            status: inspection
                .state
                .and_then(|state| state.status)
                .map(|status| status.to_string())
                .unwrap_or_default(),
        })
    }

    async fn inspect_image(&self, reference: &str) -> Result<ImageInspection, EngineError> {
        let image = self
            .docker
            .inspect_image(reference)
            .await
            .map_err(map_error)?;

        Ok(ImageInspection {
            id: image.id.unwrap_or_default(),
            architecture: image.architecture.unwrap_or_default(),
            os: image.os.unwrap_or_default(),
            variant: image.variant.filter(|variant| !variant.is_empty()),
            created: parse_created(image.created.as_deref()),
            repo_digests: image.repo_digests.unwrap_or_default(),
            repo_tags: image.repo_tags.unwrap_or_default(),
            config_image: image
                .config
                .and_then(|config| config.image)
                .filter(|parent| !parent.is_empty()),
        })
    }

    async fn event_stream(&self) -> Result<EventStream, EngineError> {
        let filters = HashMap::from([
            ("type".to_string(), vec!["container".to_string()]),
            (
                "event".to_string(),
                WATCHED_ACTIONS.iter().map(|a| (*a).to_string()).collect(),
            ),
        ]);
        let options = EventsOptions::<String> {
            filters,
            ..Default::default()
        };

        // The adapter re-frames typed events as newline-delimited JSON so
        // the watcher-side decoder is the single parsing path for every
        // engine implementation.
        let stream = self.docker.events(Some(options)).map(|item| match item {
            Ok(event) => {
                let record = serde_json::json!({
                    "Action": event.action.unwrap_or_default(),
                    "id": event
                        .actor
                        .and_then(|actor| actor.id)
                        .unwrap_or_default(),
                });
                let mut line = record.to_string().into_bytes();
                line.push(b'\n');
                Ok(Bytes::from(line))
            }
            Err(e) => Err(std::io::Error::other(e.to_string())),
        });

        Ok(stream.boxed())
    }
}
