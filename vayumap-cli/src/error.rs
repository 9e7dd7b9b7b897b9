//! CLI error types.

use thiserror::Error;
use vayumap::config::ConfigFileError;

/// Errors surfaced to the terminal user.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Map interaction failure.
    #[error("{0}")]
    Map(#[from] vayumap::MapError),

    /// Application startup failure.
    #[error("{0}")]
    App(#[from] vayumap::AppError),
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e.to_string())
    }
}
