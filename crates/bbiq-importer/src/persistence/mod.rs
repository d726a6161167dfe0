//! Persistence of validated entities as pending imports.
//!
//! The consumer only knows the [`ImportRecord`] trait. Every call is one
//! independent transaction and is idempotent per `(source, entity type,
//! origin id)`, so retrying after a failed attempt never creates duplicates.

mod postgres;

pub use postgres::{ExistingImportAction, PgImportStore};

use crate::error::ImportError;
use async_trait::async_trait;
use bbiq_common::{EntityType, QueuedEntity};

/// How an import request ended, for logging only: all are successes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportStatus {
    CreatedPending,
    UpdatedPending,
    SkippedPending,
    SkippedAccepted,
}

impl ImportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportStatus::CreatedPending => "created pending",
            ImportStatus::UpdatedPending => "updated pending",
            ImportStatus::SkippedPending => "skipped pending",
            ImportStatus::SkippedAccepted => "skipped accepted",
        }
    }
}

impl std::fmt::Display for ImportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportResult {
    pub status: ImportStatus,
    pub import_id: i64,
}

/// Writes one validated entity into the target store
#[async_trait]
pub trait ImportRecord: Send + Sync + 'static {
    /// Import `entity` as a `kind` entity within a single transaction.
    ///
    /// An error means the transaction was rolled back and the call may be retried.
    async fn import_record(
        &self,
        kind: EntityType,
        entity: &QueuedEntity,
    ) -> Result<ImportResult, ImportError>;
}
