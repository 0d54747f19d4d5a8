//! CLI error types.

use thiserror::Error;

use techlog::TechLogError;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// The configuration file could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),

    /// The pipeline failed.
    #[error(transparent)]
    Pipeline(#[from] TechLogError),

    /// Output formatting error.
    #[error("format error: {0}")]
    Format(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
