//! CLI error type.

use std::fmt;
use std::path::PathBuf;

use geoband::config::ConfigError;
use geoband::logging::LoggingError;
use geoband::{AppError, GeoError};

/// Errors surfaced to the user by the `geoband` binary.
#[derive(Debug)]
pub enum CliError {
    /// Configuration file could not be loaded.
    Config(ConfigError),

    /// Logging could not be initialized.
    Logging(LoggingError),

    /// Dataset file could not be read or written.
    DatasetIo { path: PathBuf, source: std::io::Error },

    /// Dataset file is malformed.
    Dataset(String),

    /// Application failed to start.
    App(AppError),

    /// A search or invalidation request failed.
    Search(GeoError),

    /// The Tokio runtime could not be created.
    Runtime(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(e) => write!(f, "{}", e),
            CliError::Logging(e) => write!(f, "{}", e),
            CliError::DatasetIo { path, source } => {
                write!(f, "Failed to access dataset {}: {}", path.display(), source)
            }
            CliError::Dataset(msg) => write!(f, "Invalid dataset: {}", msg),
            CliError::App(e) => write!(f, "{}", e),
            CliError::Search(e) => write!(f, "{}", e),
            CliError::Runtime(msg) => write!(f, "Failed to create Tokio runtime: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Logging(e) => Some(e),
            CliError::DatasetIo { source, .. } => Some(source),
            CliError::App(e) => Some(e),
            CliError::Search(e) => Some(e),
            CliError::Dataset(_) | CliError::Runtime(_) => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e)
    }
}

impl From<LoggingError> for CliError {
    fn from(e: LoggingError) -> Self {
        CliError::Logging(e)
    }
}

impl From<AppError> for CliError {
    fn from(e: AppError) -> Self {
        CliError::App(e)
    }
}

impl From<GeoError> for CliError {
    fn from(e: GeoError) -> Self {
        CliError::Search(e)
    }
}

impl CliError {
    /// Process exit code: 2 for bad input, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Search(e) if e.is_invalid_argument() || e.is_not_found() => 2,
            CliError::Dataset(_) => 2,
            _ => 1,
        }
    }
}
