//! Hierarchical configuration reader
//!
//! A config source is exposed as a [`Reader`]: a read-only view over one level of a nested tree.
//! Typed access goes through [`get`], [`get_opt`] and [`sub`], which share one error contract:
//! an absent key is [`ConfigError::NotFound`], a value of the wrong shape is
//! [`ConfigError::WrongType`].
mod error;
mod file;
mod reader;
mod value;

use std::sync::Arc;

pub use error::ConfigError;
pub use file::{from_str, load, Format};
pub use reader::MapReader;
pub use value::{FromValue, Tree, Value, ValueType};

pub mod prelude {
    pub use super::{get, get_opt, sub};
    pub use super::{ConfigError, Configurable, MapReader, Reader, Tree, Value};
}

pub type StdError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Read-only view over one level of a configuration tree
pub trait Reader: std::fmt::Debug + Send + Sync {
    /// Point lookup at this level, keys are never split on separators
    fn get(&self, key: &str) -> Option<&Value>;

    /// Reader scoped to nested tree under `key`
    ///
    /// `None` if key is absent or its value is not a map.
    fn sub(&self, key: &str) -> Option<Arc<dyn Reader>>;

    /// Snapshot of this level's entries
    fn map(&self) -> Tree;
}

/// Configuration capability
pub trait Configurable {
    fn configure(&mut self, reader: &dyn Reader) -> Result<(), StdError>;
}

pub fn get<T: FromValue>(reader: &dyn Reader, key: &str) -> Result<T, ConfigError> {
    let value = reader.get(key).ok_or_else(|| ConfigError::not_found(key))?;
    T::from_value(value).ok_or_else(|| ConfigError::WrongType {
        key: key.into(),
        value: value.to_string(),
        found: value.value_type(),
        expected: T::type_name(),
    })
}

/// Same as [`get`], but absent key is not an error
pub fn get_opt<T: FromValue>(reader: &dyn Reader, key: &str) -> Result<Option<T>, ConfigError> {
    match get(reader, key) {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Typed sub-tree lookup
///
/// Unlike [`Reader::sub`] absent key and non-map value are told apart.
pub fn sub(reader: &dyn Reader, key: &str) -> Result<Arc<dyn Reader>, ConfigError> {
    if let Some(sub) = reader.sub(key) {
        return Ok(sub);
    }
    match reader.get(key) {
        None => Err(ConfigError::not_found(key)),
        Some(value) => Err(ConfigError::WrongType {
            key: key.into(),
            value: value.to_string(),
            found: value.value_type(),
            expected: "map",
        }),
    }
}
