//! Error types shared by the core crate.

use thiserror::Error;

/// Configuration errors: raised at the call that introduced the bad value.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{value} is not a permitted {kind}")]
    InvalidArgument { kind: &'static str, value: String },
    #[error("{0} is an unknown brush type")]
    UnknownBrush(String),
    #[error("Invalid configuration for brush \"{brush}\": {reason}")]
    InvalidBrushConfig { brush: String, reason: String },
    #[error("Custom brush \"{0}\" cannot be registered")]
    InvalidCustomBrush(String),
    #[error("Invalid configuration: {field} {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("Malformed configuration: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConfigError {
    pub fn invalid(kind: &'static str, value: impl ToString) -> Self {
        ConfigError::InvalidArgument {
            kind,
            value: value.to_string(),
        }
    }
}

/// History consistency errors.
#[derive(Debug, Error, PartialEq)]
pub enum HistoryError {
    #[error("Changes passed are not valid: {0}")]
    InvalidChanges(String),
    #[error("Attempted to retrieve object {index} but it's not there")]
    MissingObject { index: usize },
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for history operations.
pub type HistoryResult<T> = Result<T, HistoryError>;
