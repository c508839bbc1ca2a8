use config::ConfigError;

use crate::{with_reader, Capabilities, Factory, FactoryError, Opt, Reader};

/// Successfully built child
pub struct Child<C: ?Sized> {
    pub name: String,
    pub component: Box<C>,
}

impl<C: ?Sized> std::fmt::Debug for Child<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Child").field("name", &self.name).finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub enum ChildError {
    /// Child's sub-tree can't be resolved
    Config(ConfigError),

    /// Constructor is missing or failed
    Build(FactoryError),
}

impl ChildError {
    pub fn is_not_found(&self) -> bool {
        match self {
            ChildError::Config(e) => e.is_not_found(),
            ChildError::Build(e) => e.is_not_found(),
        }
    }
}

impl std::fmt::Display for ChildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChildError::Config(e) => write!(f, "{e}"),
            ChildError::Build(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ChildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ChildError::Config(e) => Some(e),
            ChildError::Build(e) => Some(e),
        }
    }
}

impl From<ConfigError> for ChildError {
    fn from(e: ConfigError) -> Self {
        ChildError::Config(e)
    }
}

impl From<FactoryError> for ChildError {
    fn from(e: FactoryError) -> Self {
        ChildError::Build(e)
    }
}

#[derive(Debug)]
pub struct ChildFailure {
    pub name: String,
    pub error: ChildError,
}

/// Every child failure collected during one composition pass
#[derive(Debug)]
pub struct ComposeError {
    pub key: String,
    pub failures: Vec<ChildFailure>,
}

impl std::fmt::Display for ComposeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "failed to compose \"{}\":", self.key)?;
        for failure in self.failures.iter() {
            write!(f, "\n{}: {}", failure.name, failure.error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ComposeError {}

/// Build every child listed under `key`
///
/// Each top-level key of `reader.sub(key)` names a child: the child is built by the constructor
/// registered under the same name and configured with its own sub-tree.
/// `extra` supplies additional options per child name.
///
/// Absent `key` means no children. All children are attempted; if any of them fails, all
/// failures are returned together and none of built children is handed out.
pub fn compose<C, F, E>(
    factory: &F,
    reader: &dyn Reader,
    key: &str,
    extra: E,
) -> Result<Vec<Child<C>>, ComposeError>
where
    C: Capabilities + ?Sized + 'static,
    F: Factory<C> + ?Sized,
    E: Fn(&str) -> Vec<Opt<C>>,
{
    match config::sub(reader, key) {
        Ok(children) => build_children(factory, &*children, key, extra),
        Err(e) if e.is_not_found() => {
            tracing::debug!(key, "no children configured");
            Ok(vec![])
        }
        Err(e) => Err(ComposeError {
            key: key.into(),
            failures: vec![ChildFailure {
                name: key.into(),
                error: e.into(),
            }],
        }),
    }
}

/// Same as [`compose`], but absent `key` is a failure
pub fn compose_required<C, F, E>(
    factory: &F,
    reader: &dyn Reader,
    key: &str,
    extra: E,
) -> Result<Vec<Child<C>>, ComposeError>
where
    C: Capabilities + ?Sized + 'static,
    F: Factory<C> + ?Sized,
    E: Fn(&str) -> Vec<Opt<C>>,
{
    match config::sub(reader, key) {
        Ok(children) => build_children(factory, &*children, key, extra),
        Err(e) => Err(ComposeError {
            key: key.into(),
            failures: vec![ChildFailure {
                name: key.into(),
                error: e.into(),
            }],
        }),
    }
}

fn build_children<C, F, E>(
    factory: &F,
    children: &dyn Reader,
    key: &str,
    extra: E,
) -> Result<Vec<Child<C>>, ComposeError>
where
    C: Capabilities + ?Sized + 'static,
    F: Factory<C> + ?Sized,
    E: Fn(&str) -> Vec<Opt<C>>,
{
    let mut built = vec![];
    let mut failures = vec![];
    for name in children.map().into_keys() {
        let child = config::sub(children, &name)
            .map_err(ChildError::from)
            .and_then(|child_reader| {
                let mut opts = vec![with_reader(child_reader)];
                opts.extend(extra(&name));
                factory.build(&name, opts).map_err(ChildError::from)
            });
        match child {
            Ok(component) => built.push(Child { name, component }),
            Err(error) => {
                tracing::error!(key, child = name.as_str(), %error, "failed to build child");
                failures.push(ChildFailure { name, error });
            }
        }
    }
    match failures.is_empty() {
        true => Ok(built),
        false => Err(ComposeError {
            key: key.into(),
            failures,
        }),
    }
}
