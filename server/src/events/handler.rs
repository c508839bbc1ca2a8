use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use component::{apply, Capabilities, Configurable, Constructor, Reader, StdError};
use config::{get_opt, ConfigError};

use super::{new_repository, ApiEvent, Repository};
use crate::{
    http::{AppError, Result},
    Handler,
};

pub const HANDLER: &str = "events";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventsConfig {
    pub path: String,
    pub storage: String,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            path: "/events".into(),
            storage: "sqlite://events.db".into(),
        }
    }
}

impl EventsConfig {
    /// Override defaults with values present in `reader`
    pub fn read(&mut self, reader: &dyn Reader) -> Result<(), ConfigError> {
        if let Some(path) = get_opt(reader, "path")? {
            self.path = path;
        }
        if let Some(storage) = get_opt(reader, "storage")? {
            self.storage = storage;
        }
        Ok(())
    }
}

type Storage = Option<Arc<dyn Repository>>;

/// Accepts client events and stores them
#[derive(Default)]
pub struct EventsHandler {
    config: EventsConfig,
    repository: Storage,
}

impl EventsHandler {
    /// Handler over an existing repository, `storage` setting is ignored
    pub fn with_repository(repository: Arc<dyn Repository>) -> Self {
        Self {
            config: EventsConfig::default(),
            repository: Some(repository),
        }
    }

    pub fn config(&self) -> &EventsConfig {
        &self.config
    }
}

impl Configurable for EventsHandler {
    fn configure(&mut self, reader: &dyn Reader) -> Result<(), StdError> {
        let mut config = self.config.clone();
        config.read(reader)?;
        self.config = config;
        Ok(())
    }
}

impl Capabilities for EventsHandler {
    fn as_configurable(&mut self) -> Option<&mut dyn Configurable> {
        Some(self)
    }
}

impl Handler for EventsHandler {
    fn path(&self) -> &str {
        &self.config.path
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/", post(ingest))
            .with_state(self.repository.clone())
    }
}

async fn ingest(
    State(repository): State<Storage>,
    payload: Result<Json<ApiEvent>, JsonRejection>,
) -> Result<&'static str> {
    let Json(event) = payload.map_err(|e| AppError::bad_request(e.body_text()))?;
    event.validate().map_err(AppError::bad_request)?;
    let repository =
        repository.ok_or_else(|| anyhow::anyhow!("events repository is not connected"))?;
    repository.insert(&event).await?;
    Ok("ok")
}

pub fn constructor() -> Constructor<dyn Handler> {
    component::constructor(|opts| {
        let mut handler = EventsHandler::default();
        apply::<dyn Handler>(&mut handler, opts)?;
        handler.repository = Some(new_repository(&handler.config.storage)?);
        Ok(Box::new(handler))
    })
}
