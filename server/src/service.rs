use axum::Router;
use component::{AsFactory, Capabilities, Lifecycle};

/// Top level component run by the binary
pub trait Service: Lifecycle + Capabilities + AsFactory<dyn Handler> {}

impl<T> Service for T where T: Lifecycle + Capabilities + AsFactory<dyn Handler> {}

/// Group of routes mounted by the api service
pub trait Handler: Capabilities + Send + Sync {
    /// Mount point, absolute path
    fn path(&self) -> &str;

    fn routes(&self) -> Router;
}
