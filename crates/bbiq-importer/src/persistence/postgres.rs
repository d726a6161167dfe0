use super::{ImportRecord, ImportResult, ImportStatus};
use crate::config::DatabaseConfig;
use crate::error::ImportError;
use async_trait::async_trait;
use bbiq_common::{EntityType, QueuedEntity};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::PgPool;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// What to do when an entity was already imported and is still pending
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExistingImportAction {
    /// Leave the pending import untouched
    #[default]
    Skip,
    /// Replace the pending import when the source reports a newer edit
    UpdatePending,
}

impl std::str::FromStr for ExistingImportAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "skip" => Ok(ExistingImportAction::Skip),
            "update-pending" => Ok(ExistingImportAction::UpdatePending),
            other => Err(format!(
                "unknown existing import action '{other}', expected 'skip' or 'update-pending'"
            )),
        }
    }
}

/// `entity_import` table access backed by PostgreSQL
#[derive(Debug, Clone)]
pub struct PgImportStore {
    pool: PgPool,
    existing: ExistingImportAction,
}

impl PgImportStore {
    pub fn new(pool: PgPool, existing: ExistingImportAction) -> Self {
        Self { pool, existing }
    }

    pub async fn connect(
        config: &DatabaseConfig,
        existing: ExistingImportAction,
    ) -> Result<Self, ImportError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(&config.url)
            .await?;
        Ok(Self::new(pool, existing))
    }

    /// Apply the bundled schema migrations
    pub async fn migrate(&self) -> Result<(), ImportError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| ImportError::Database(e.into()))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ExistingImport {
    id: i64,
    last_edited: Option<String>,
    accepted_bbid: Option<Uuid>,
}

/// ISO 8601 timestamps of one source compare correctly as text
fn is_newer(incoming: Option<&str>, stored: Option<&str>) -> bool {
    match (incoming, stored) {
        (Some(incoming), Some(stored)) => incoming > stored,
        (Some(_), None) => true,
        (None, _) => false,
    }
}

#[async_trait]
impl ImportRecord for PgImportStore {
    async fn import_record(
        &self,
        kind: EntityType,
        entity: &QueuedEntity,
    ) -> Result<ImportResult, ImportError> {
        let default_alias = entity
            .data
            .default_alias()
            .ok_or(ImportError::MissingDefaultAlias)?;
        let source = if entity.source.is_empty() {
            entity.data.source.as_deref().unwrap_or_default()
        } else {
            entity.source.as_str()
        };
        let last_edited = entity
            .last_edited
            .as_deref()
            .or(entity.data.last_edited.as_deref());

        let mut tx = self.pool.begin().await?;

        let created: Option<i64> = sqlx::query_scalar(
            r#"
            INSERT INTO entity_import
                (entity_type, origin_source, origin_id, last_edited, default_alias, disambiguation, data)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (origin_source, entity_type, origin_id) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(kind.as_str())
        .bind(source)
        .bind(&entity.origin_id)
        .bind(last_edited)
        .bind(&default_alias.name)
        .bind(entity.data.disambiguation.as_deref())
        .bind(Json(&entity.data))
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(import_id) = created {
            tx.commit().await?;
            return Ok(ImportResult {
                status: ImportStatus::CreatedPending,
                import_id,
            });
        }

        let existing: ExistingImport = sqlx::query_as(
            r#"
            SELECT id, last_edited, accepted_bbid
            FROM entity_import
            WHERE origin_source = $1 AND entity_type = $2 AND origin_id = $3
            FOR UPDATE
            "#,
        )
        .bind(source)
        .bind(kind.as_str())
        .bind(&entity.origin_id)
        .fetch_one(&mut *tx)
        .await?;

        let status = if existing.accepted_bbid.is_some() {
            ImportStatus::SkippedAccepted
        } else if self.existing == ExistingImportAction::UpdatePending
            && is_newer(last_edited, existing.last_edited.as_deref())
        {
            sqlx::query(
                r#"
                UPDATE entity_import
                SET last_edited = $2, default_alias = $3, disambiguation = $4, data = $5, updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(existing.id)
            .bind(last_edited)
            .bind(&default_alias.name)
            .bind(entity.data.disambiguation.as_deref())
            .bind(Json(&entity.data))
            .execute(&mut *tx)
            .await?;
            ImportStatus::UpdatedPending
        } else {
            ImportStatus::SkippedPending
        };

        tx.commit().await?;
        debug!(import_id = existing.id, %status, "Existing import resolved");

        Ok(ImportResult {
            status,
            import_id: existing.id,
        })
    }
}
