//! Shared helpers for importer integration tests.
//!
//! Queue and pipeline tests run against the in-memory broker. Store tests
//! start a PostgreSQL container and are ignored unless Docker is available:
//!
//! ```bash
//! cargo test -p bbiq-importer -- --ignored
//! ```

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use anyhow::{Context, Result};
use async_trait::async_trait;
use bbiq_common::{EntityType, QueuedEntity};
use bbiq_importer::error::ImportError;
use bbiq_importer::persistence::{ImportRecord, ImportResult, ImportStatus};
use bbiq_importer::queue::ImportQueueOptions;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use testcontainers::{core::IntoContainerPort, runners::AsyncRunner, ContainerAsync};
use testcontainers_modules::postgres::Postgres;
use tracing::{debug, info};

/// Initialize tracing for tests, once per process
pub fn init_test_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let _ = fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info,bbiq_importer=debug,sqlx=warn,testcontainers=info")
        }))
        .with_test_writer()
        .try_init();
}

/// Queue options with a failure queue and a short close grace period
pub fn test_options() -> ImportQueueOptions {
    ImportQueueOptions {
        close_poll_interval_ms: 10,
        ..ImportQueueOptions::default()
    }
}

pub fn fixture_author() -> QueuedEntity {
    let raw = include_str!("../fixtures/author.json");
    serde_json::from_str(raw).expect("author fixture parses")
}

/// Scripted outcome of one [`StubImporter`] call
pub enum Step {
    Succeed(i64),
    Fail(&'static str),
    Panic,
    Delay(Duration, i64),
}

/// `ImportRecord` double that replays scripted steps and counts calls.
///
/// Once the script is exhausted every call succeeds with import id 1.
#[derive(Default)]
pub struct StubImporter {
    steps: Mutex<VecDeque<Step>>,
    calls: AtomicUsize,
    imported: Mutex<Vec<(EntityType, String)>>,
}

impl StubImporter {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into_iter().collect()),
            ..Self::default()
        }
    }

    pub fn always_failing(count: usize) -> Self {
        Self::new((0..count).map(|_| Step::Fail("connection reset")))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn imported(&self) -> Vec<(EntityType, String)> {
        self.imported.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImportRecord for StubImporter {
    async fn import_record(
        &self,
        kind: EntityType,
        entity: &QueuedEntity,
    ) -> Result<ImportResult, ImportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.steps.lock().unwrap().pop_front();

        let import_id = match step {
            None => 1,
            Some(Step::Succeed(id)) => id,
            Some(Step::Fail(reason)) => return Err(ImportError::Other(reason.to_string())),
            Some(Step::Panic) => panic!("importer blew up"),
            Some(Step::Delay(delay, id)) => {
                tokio::time::sleep(delay).await;
                id
            }
        };

        self.imported
            .lock()
            .unwrap()
            .push((kind, entity.origin_id.clone()));
        Ok(ImportResult {
            status: ImportStatus::CreatedPending,
            import_id,
        })
    }
}

// ============================================================================
// PostgreSQL Test Container
// ============================================================================

/// PostgreSQL test container with the importer migrations applied
pub struct TestPostgres {
    _container: ContainerAsync<Postgres>,
    pool: PgPool,
    connection_string: String,
}

impl TestPostgres {
    pub async fn start() -> Result<Self> {
        info!("Starting PostgreSQL test container...");

        let container = Postgres::default()
            .start()
            .await
            .context("Failed to start PostgreSQL container")?;

        let host = container
            .get_host()
            .await
            .context("Failed to get container host")?;
        let port = container
            .get_host_port_ipv4(5432.tcp())
            .await
            .context("Failed to get container port")?;

        let connection_string =
            format!("postgresql://postgres:postgres@{}:{}/postgres", host, port);
        debug!("PostgreSQL connection: {}", connection_string);

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&connection_string)
            .await
            .context("Failed to connect to PostgreSQL")?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run migrations")?;

        Ok(Self {
            _container: container,
            pool,
            connection_string,
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn connection_string(&self) -> &str {
        &self.connection_string
    }
}

/// Poll `condition` until it holds, failing the test after five seconds
pub async fn eventually(condition: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
