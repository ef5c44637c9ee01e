//! Error types for refit-core

use thiserror::Error;

/// Result type alias using refit-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for refit
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Invalid configuration format
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed `owner/repo=username,password` authentication entry
    #[error("Invalid authentication entry: {entry} (expected owner/repo=username,password)")]
    InvalidAuthEntry { entry: String },

    /// Operation cancelled cooperatively
    #[error("Operation cancelled")]
    Cancelled,
}

impl Error {
    /// Create a config not found error
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an invalid auth entry error
    pub fn invalid_auth_entry(entry: impl Into<String>) -> Self {
        Self::InvalidAuthEntry {
            entry: entry.into(),
        }
    }
}
