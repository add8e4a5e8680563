//! Application error types.

use std::fmt;

use crate::config::ConfigError;

/// Errors that can occur during application startup.
#[derive(Debug)]
pub enum AppError {
    /// Configuration file could not be loaded.
    ConfigFile(ConfigError),

    /// Configuration values are inconsistent.
    Config(String),

    /// No Tokio runtime to spawn background tasks on.
    NoRuntime,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::ConfigFile(e) => write!(f, "Failed to load configuration: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::NoRuntime => write!(f, "No Tokio runtime available for background tasks"),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::ConfigFile(e) => Some(e),
            AppError::Config(_) | AppError::NoRuntime => None,
        }
    }
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::ConfigFile(e)
    }
}
