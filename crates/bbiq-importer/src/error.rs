//! Error types for the import pipeline
//!
//! Queue and broker failures are the only errors that reach the process
//! boundary. Everything that happens to a single entity (unknown type, invalid
//! data, failed transaction) is classified with [`ImportErrorKind`] and logged
//! by the consumer instead of being propagated.

use thiserror::Error;

/// Result type alias for queue operations
pub type Result<T> = std::result::Result<T, QueueError>;

/// Errors raised by the import queue and its broker backends
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Cannot connect to the broker at '{url}': {reason}")]
    Connection { url: String, reason: String },

    #[error("Cannot create a channel: {0}")]
    Channel(String),

    #[error("Cannot declare queue '{queue}': {reason}")]
    Declare { queue: String, reason: String },

    #[error("Unable to publish into queue '{queue}': {reason}")]
    Publish { queue: String, reason: String },

    #[error("Error while consuming queue '{queue}': {reason}")]
    Consume { queue: String, reason: String },

    #[error("Unable to acknowledge delivery: {0}")]
    Ack(String),

    #[error("Unable to close connection: {0}")]
    Close(String),

    #[error("Import queue is already open")]
    AlreadyOpen,

    #[error("Import queue is not open")]
    NotOpen,

    #[error("A consumer is already registered on this queue")]
    ConsumerAlreadyRegistered,
}

impl QueueError {
    pub fn connection(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Connection {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn declare(queue: impl Into<String>, reason: impl ToString) -> Self {
        Self::Declare {
            queue: queue.into(),
            reason: reason.to_string(),
        }
    }

    pub fn publish(queue: impl Into<String>, reason: impl ToString) -> Self {
        Self::Publish {
            queue: queue.into(),
            reason: reason.to_string(),
        }
    }

    pub fn consume(queue: impl Into<String>, reason: impl ToString) -> Self {
        Self::Consume {
            queue: queue.into(),
            reason: reason.to_string(),
        }
    }
}

/// Structural validation failure carrying the offending field
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Failure of a single persistence attempt
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Entity has no default alias")]
    MissingDefaultAlias,

    #[error("{0}")]
    Other(String),
}

/// Classification of how importing one entity ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportErrorKind {
    None,
    InvalidRecord,
    RecordEntityNotFound,
    TransactionError,
}

impl ImportErrorKind {
    /// Stable code used in log lines
    pub fn code(&self) -> &'static str {
        match self {
            ImportErrorKind::None => "NONE",
            ImportErrorKind::InvalidRecord => "INVALID_RECORD",
            ImportErrorKind::RecordEntityNotFound => "RECORD_ENTITY_NOT_FOUND",
            ImportErrorKind::TransactionError => "TRANSACTION_ERROR",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ImportErrorKind::None => "No errors occurred",
            ImportErrorKind::InvalidRecord => "Record failed automated validation tests",
            ImportErrorKind::RecordEntityNotFound => "Could not ascertain entity record",
            ImportErrorKind::TransactionError => "Error occurred during DB transaction",
        }
    }

    /// Only transaction errors are worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, ImportErrorKind::TransactionError)
    }
}

impl std::fmt::Display for ImportErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}
