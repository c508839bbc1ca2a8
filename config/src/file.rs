//! File backed config source

use std::path::Path;

use crate::{ConfigError, MapReader, Tree};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Toml,
    Json,
}

impl Format {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();
        match ext {
            "toml" => Ok(Format::Toml),
            "json" => Ok(Format::Json),
            unsupported => Err(ConfigError::UnsupportedFormat(unsupported.into())),
        }
    }
}

/// Load config tree from file, format is picked by file extension
pub fn load(path: impl AsRef<Path>) -> Result<MapReader, ConfigError> {
    let path = path.as_ref();
    let format = Format::from_path(path)?;
    let text = std::fs::read_to_string(path)?;
    let reader = from_str(format, &text)?;
    tracing::debug!(path = %path.display(), ?format, "config loaded");
    Ok(reader)
}

pub fn from_str(format: Format, text: &str) -> Result<MapReader, ConfigError> {
    let tree: Tree = match format {
        Format::Toml => toml::from_str(text)?,
        Format::Json => serde_json::from_str(text)?,
    };
    Ok(MapReader::new(tree))
}
