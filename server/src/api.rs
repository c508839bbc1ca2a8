//! HTTP api service
//!
//! Reads `api` sub-tree of the root config, builds every handler listed under `api.handlers`
//! and serves them until stopped. Health and Prometheus metrics routes are always present.
use std::fmt;
use std::time::Duration;

use axum::{middleware, routing::get, Router};
use component::{
    apply, compose, with_logger, AsFactory, Capabilities, Child, Configurable, Constructor,
    Constructors, Factory, Lifecycle, LogWriter, Logger, Reader, StdError,
};
use config::{get_opt, ConfigError};
use futures::future::BoxFuture;
use tokio::net::TcpListener;
use tracing::instrument::WithSubscriber;

use crate::{
    http,
    metrics::{self, Metrics},
    Handler, Service, Shutdown,
};

pub const SERVICE: &str = "api";

pub const HEALTH_PATH: &str = "/health";

pub const METRICS_PATH: &str = "/metrics";

/// Routes served next to the mounted handlers
const RESERVED_PATHS: [&str; 2] = [HEALTH_PATH, METRICS_PATH];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub addr: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8080".into(),
        }
    }
}

impl ApiConfig {
    /// Override defaults with values present in `reader`
    pub fn read(&mut self, reader: &dyn Reader) -> Result<(), ConfigError> {
        if let Some(addr) = get_opt(reader, "addr")? {
            self.addr = addr;
        }
        Ok(())
    }
}

/// Mounted handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mount {
    pub handler: String,
    pub path: String,
}

/// Handler that could not be mounted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountFailure {
    pub handler: String,
    pub path: String,
    pub reason: String,
}

/// Every handler rejected during one mount
#[derive(Debug)]
pub struct MountError {
    pub failures: Vec<MountFailure>,
}

impl fmt::Display for MountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to mount handlers:")?;
        for failure in &self.failures {
            write!(f, "\n{}: {}", failure.handler, failure.reason)?;
        }
        Ok(())
    }
}

impl std::error::Error for MountError {}

pub struct ApiService {
    config: ApiConfig,
    logger: Logger,
    handlers: Constructors<dyn Handler>,
    mounts: Vec<Mount>,
    routes: Router,
    metrics: Metrics,
    shutdown: Shutdown,
}

impl ApiService {
    pub fn new() -> Result<Self, StdError> {
        Ok(Self {
            config: ApiConfig::default(),
            logger: tracing::dispatcher::get_default(|dispatch| dispatch.clone()),
            handlers: Constructors::new(),
            mounts: vec![],
            routes: Router::new(),
            metrics: Metrics::new(metrics::NAMESPACE)?,
            shutdown: Shutdown::new(),
        })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn mounts(&self) -> &[Mount] {
        &self.mounts
    }

    /// Health and metrics routes, mounted handlers, request logging and metrics
    pub fn router(&self) -> Router {
        let exposition = Router::new()
            .route(METRICS_PATH, get(metrics::render))
            .with_state(self.metrics.clone());
        Router::new()
            .route(HEALTH_PATH, get(http::health))
            .merge(exposition)
            .merge(self.routes.clone())
            .layer(middleware::from_fn_with_state(
                self.logger.clone(),
                http::log_middleware,
            ))
            .layer(middleware::from_fn_with_state(
                self.metrics.clone(),
                metrics::track,
            ))
    }
}

fn overlapping(a: &str, b: &str) -> bool {
    let nested = |a: &str, b: &str| a == b || a.starts_with(&format!("{b}/"));
    nested(a, b) || nested(b, a)
}

/// Reason `path` can't be mounted next to `mounts`
fn check_mount_path(mounts: &[Mount], path: &str) -> Result<(), String> {
    let valid = path.starts_with('/')
        && path.len() > 1
        && !path.ends_with('/')
        && !path.contains(['*', ':', '{', '}']);
    if !valid {
        Err(format!("invalid path {path:?}"))?
    }
    if let Some(reserved) = RESERVED_PATHS.iter().find(|reserved| overlapping(path, reserved)) {
        Err(format!("path {path:?} overlaps with reserved {reserved:?}"))?
    }
    if let Some(mount) = mounts.iter().find(|mount| overlapping(path, &mount.path)) {
        Err(format!(
            "path {path:?} overlaps with handler {} at {:?}",
            mount.handler, mount.path
        ))?
    }
    Ok(())
}

/// Check every handler path first, nothing is mounted unless all of them are valid
fn mount(handlers: Vec<Child<dyn Handler>>) -> Result<(Router, Vec<Mount>), MountError> {
    let mut mounts: Vec<Mount> = vec![];
    let mut routes = vec![];
    let mut failures = vec![];
    for Child { name, component } in handlers {
        let path = component.path().to_string();
        match check_mount_path(&mounts, &path) {
            Ok(()) => {
                routes.push(component.routes());
                mounts.push(Mount {
                    handler: name,
                    path,
                });
            }
            Err(reason) => {
                tracing::error!(
                    handler = name.as_str(),
                    path = path.as_str(),
                    reason = reason.as_str(),
                    "invalid handler path"
                );
                failures.push(MountFailure {
                    handler: name,
                    path,
                    reason,
                });
            }
        }
    }
    if !failures.is_empty() {
        return Err(MountError { failures });
    }
    let router = mounts
        .iter()
        .zip(routes)
        .fold(Router::new(), |router, (mount, routes)| {
            tracing::info!(
                handler = mount.handler.as_str(),
                path = mount.path.as_str(),
                "mounting handler"
            );
            router.nest(&mount.path, routes)
        });
    Ok((router, mounts))
}

impl Configurable for ApiService {
    fn configure(&mut self, reader: &dyn Reader) -> Result<(), StdError> {
        let api = reader.sub(SERVICE).ok_or("api config not found")?;
        let mut config = self.config.clone();
        config.read(&*api)?;
        let logger = self.logger.clone();
        let handlers = compose(&self.handlers, &*api, "handlers", |_| {
            vec![with_logger(logger.clone())]
        })?;
        let (routes, mounts) = mount(handlers)?;
        self.config = config;
        self.routes = routes;
        self.mounts = mounts;
        Ok(())
    }
}

impl LogWriter for ApiService {
    fn set_logger(&mut self, logger: Logger) -> Result<(), StdError> {
        self.logger = logger;
        Ok(())
    }
}

impl Capabilities for ApiService {
    fn as_configurable(&mut self) -> Option<&mut dyn Configurable> {
        Some(self)
    }

    fn as_log_writer(&mut self) -> Option<&mut dyn LogWriter> {
        Some(self)
    }
}

impl AsFactory<dyn Handler> for ApiService {
    fn as_factory(&self) -> Option<&dyn Factory<dyn Handler>> {
        Some(&self.handlers)
    }
}

impl Lifecycle for ApiService {
    fn run(&self) -> BoxFuture<'_, Result<(), StdError>> {
        let logger = self.logger.clone();
        Box::pin(
            async move {
                let _running = self.shutdown.start()?;
                let listener = TcpListener::bind(self.config.addr.as_str()).await?;
                tracing::info!("listening for events at {}", listener.local_addr()?);
                let requested = self.shutdown.requested();
                axum::serve(listener, self.router())
                    .with_graceful_shutdown(async move { requested.cancelled().await })
                    .await?;
                tracing::info!("api service stopped");
                Ok(())
            }
            .with_subscriber(logger),
        )
    }

    fn stop(&self, deadline: Duration) -> BoxFuture<'_, Result<(), StdError>> {
        Box::pin(self.shutdown.stop("api service", deadline))
    }
}

pub fn constructor() -> Constructor<dyn Service> {
    component::constructor(|opts| {
        let mut service = ApiService::new()?;
        apply::<dyn Service>(&mut service, opts)?;
        Ok(Box::new(service))
    })
}
