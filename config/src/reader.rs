use std::sync::Arc;

use crate::{ConfigError, Reader, Tree, Value};

/// In-memory reader over a literal tree
///
/// Backs every other config source: file loaders parse into a `Tree` and hand it over.
/// Sub-readers are independent copies of the nested tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapReader {
    tree: Tree,
}

impl MapReader {
    pub fn new(tree: Tree) -> Self {
        Self { tree }
    }

    pub fn into_shared(self) -> Arc<dyn Reader> {
        Arc::new(self)
    }
}

impl Reader for MapReader {
    fn get(&self, key: &str) -> Option<&Value> {
        self.tree.get(key)
    }

    fn sub(&self, key: &str) -> Option<Arc<dyn Reader>> {
        match self.tree.get(key) {
            Some(Value::Map(tree)) => Some(Arc::new(MapReader::new(tree.clone()))),
            _ => None,
        }
    }

    fn map(&self) -> Tree {
        self.tree.clone()
    }
}

impl From<Tree> for MapReader {
    fn from(tree: Tree) -> Self {
        Self::new(tree)
    }
}

impl TryFrom<serde_json::Value> for MapReader {
    type Error = ConfigError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        Ok(Self::new(serde_json::from_value(value)?))
    }
}
