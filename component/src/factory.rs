use std::sync::Arc;

use registry::{Registry, RegistryError};

use crate::{apply, Opt, StdError};

/// Named child constructor
///
/// Constructor creates component with defaults and applies options to it.
pub type Constructor<C> = Arc<dyn Fn(Vec<Opt<C>>) -> Result<Box<C>, StdError> + Send + Sync>;

pub fn constructor<C, F>(f: F) -> Constructor<C>
where
    C: ?Sized,
    F: Fn(Vec<Opt<C>>) -> Result<Box<C>, StdError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Factory capability: registers named constructors and builds children by name
pub trait Factory<C: ?Sized> {
    fn register_constructor(
        &self,
        name: &str,
        constructor: Constructor<C>,
    ) -> Result<(), RegistryError>;

    fn build(&self, name: &str, opts: Vec<Opt<C>>) -> Result<Box<C>, FactoryError>;
}

/// Factory capability probe
pub trait AsFactory<C: ?Sized> {
    fn as_factory(&self) -> Option<&dyn Factory<C>> {
        None
    }
}

#[derive(Debug)]
pub enum FactoryError {
    /// No constructor registered under the name
    NotFound(String),

    /// Constructor (or one of the options it applied) failed
    Construction { name: String, source: StdError },
}

impl FactoryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl std::fmt::Display for FactoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(name) => write!(f, "constructor \"{name}\": not found"),
            Self::Construction { name, source } => {
                write!(f, "constructor \"{name}\": construction failed: {source}")
            }
        }
    }
}

impl std::error::Error for FactoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Construction { source, .. } => Some(&**source),
            Self::NotFound(_) => None,
        }
    }
}

/// Registry backed factory
pub struct Constructors<C: ?Sized> {
    registry: Registry<Constructor<C>>,
}

impl<C: ?Sized> Default for Constructors<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ?Sized> std::fmt::Debug for Constructors<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Constructors")
            .field("registry", &self.registry)
            .finish()
    }
}

impl<C: ?Sized> Constructors<C> {
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.registry.contains(name)
    }
}

impl<C: ?Sized> Factory<C> for Constructors<C> {
    fn register_constructor(
        &self,
        name: &str,
        constructor: Constructor<C>,
    ) -> Result<(), RegistryError> {
        self.registry.register(name, constructor)?;
        tracing::debug!(name, "constructor registered");
        Ok(())
    }

    fn build(&self, name: &str, opts: Vec<Opt<C>>) -> Result<Box<C>, FactoryError> {
        let constructor = self
            .registry
            .get(name)
            .map_err(|_| FactoryError::NotFound(name.into()))?;
        constructor(opts).map_err(|source| FactoryError::Construction {
            name: name.into(),
            source,
        })
    }
}

impl<C: ?Sized> AsFactory<C> for Constructors<C> {
    fn as_factory(&self) -> Option<&dyn Factory<C>> {
        Some(self)
    }
}
