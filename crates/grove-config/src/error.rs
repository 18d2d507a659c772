//! Error types for configuration loading and validation.

use thiserror::Error;

/// Errors raised while loading or validating client configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A field holds a value outside its accepted set.
    #[error("Invalid value '{value}' for {field}")]
    InvalidValue {
        /// The configuration field (or argument) being parsed
        field: String,
        /// The rejected input
        value: String,
    },

    /// Missing required configuration field.
    #[error("Missing required field: {field}")]
    MissingField {
        /// The name of the missing configuration field
        field: String,
    },

    /// The configuration file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid TOML for this schema.
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),
}

impl ConfigError {
    pub(crate) fn invalid(field: &str, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.to_string(),
            value: value.into(),
        }
    }
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
