//! Error types for the bbiq CLI
//!
//! Messages are user-facing and say what to check next.

use bbiq_importer::{ImportError, QueueError};
use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration is missing or invalid
    #[error("Configuration error: {0}. Check your config file and environment variables.")]
    Config(String),

    /// Broker connection or queue operation failed
    #[error("Queue error: {0}. Ensure the message broker is running and the connection URL is correct.")]
    Queue(#[from] QueueError),

    /// Database connection or migration failed
    #[error("Database error: {0}. Check your database connection settings.")]
    Database(#[from] ImportError),

    /// Dump import failed
    #[error("Import failed: {0:#}")]
    Import(anyhow::Error),

    /// File system operation failed
    #[error("File operation failed: {0}. Check file permissions.")]
    Io(#[from] std::io::Error),
}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::Config(format!("{err:#}"))
    }
}
