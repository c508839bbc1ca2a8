use crate::{StdError, ValueType};

#[derive(Debug)]
pub enum ConfigError {
    /// Key is absent at the queried level
    NotFound { key: String },

    /// Key is present, but its value can't be converted into requested type
    WrongType {
        key: String,
        value: String,
        found: ValueType,
        expected: &'static str,
    },

    /// Config file extension doesn't match any known format
    UnsupportedFormat(String),

    Io(std::io::Error),

    Parse(StdError),
}

impl ConfigError {
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_wrong_type(&self) -> bool {
        matches!(self, Self::WrongType { .. })
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound { key } => write!(f, "config key \"{key}\": not found"),
            Self::WrongType {
                key,
                value,
                found,
                expected,
            } => write!(
                f,
                "config key \"{key}\": wrong type: {value} ({found}), expected {expected}"
            ),
            Self::UnsupportedFormat(ext) => write!(f, "unsupported config format '{ext}'"),
            Self::Io(e) => write!(f, "failed to read config: {e}"),
            Self::Parse(e) => write!(f, "failed to parse config: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Parse(e) => Some(&**e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(e: toml::de::Error) -> Self {
        Self::Parse(e.into())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.into())
    }
}
