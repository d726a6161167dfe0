//! Error types shared by the importer crates

use thiserror::Error;

/// Result type alias for common operations
pub type Result<T> = std::result::Result<T, BbiqError>;

/// Main error type for the shared library
#[derive(Error, Debug)]
pub enum BbiqError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unsupported entity type: '{0}'")]
    UnsupportedEntityType(String),
}
