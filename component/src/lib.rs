//! Config-driven component composition
//!
//! Components don't share a base type. Each optional behaviour is a narrow capability trait,
//! which component exposes through probe methods of [`Capabilities`] and [`AsFactory`].
//! Options ([`Opt`]) probe for a capability and are no-op if it's missing.
mod compose;
mod factory;
mod options;

use std::time::Duration;

use futures::future::BoxFuture;

pub use compose::{compose, compose_required, Child, ChildError, ChildFailure, ComposeError};
pub use config::{Configurable, Reader, StdError};
pub use factory::{constructor, AsFactory, Constructor, Constructors, Factory, FactoryError};
pub use options::{apply, with_constructor, with_logger, with_reader, Opt};
pub use registry::RegistryError;

/// Logger shared between components
pub type Logger = tracing::Dispatch;

/// Logger capability
pub trait LogWriter {
    fn set_logger(&mut self, logger: Logger) -> Result<(), StdError>;
}

/// Capability probes
///
/// Every probe defaults to `None`, component overrides probes for capabilities it has.
pub trait Capabilities {
    fn as_configurable(&mut self) -> Option<&mut dyn Configurable> {
        None
    }

    fn as_log_writer(&mut self) -> Option<&mut dyn LogWriter> {
        None
    }
}

/// Running component
pub trait Lifecycle: Send + Sync {
    /// Operate until stopped or failed
    fn run(&self) -> BoxFuture<'_, Result<(), StdError>>;

    /// Request graceful shutdown and wait for it no longer than `deadline`
    fn stop(&self, deadline: Duration) -> BoxFuture<'_, Result<(), StdError>>;
}
