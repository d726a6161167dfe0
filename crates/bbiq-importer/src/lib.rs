//! BookBrainz Import Queue - Importer Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Moves third-party records into BookBrainz as pending imports.
//!
//! # Pipeline
//!
//! - **Producer**: parses source dumps and pushes entities into the queue
//! - **Queue**: durable broker queue with prefetch, acknowledgments and a failure queue
//! - **Consumer**: validates each entity and persists it with bounded retries
//! - **Persistence**: idempotent `entity_import` writes in PostgreSQL
//!
//! # Example
//!
//! ```no_run
//! use bbiq_importer::config::Config;
//! use bbiq_importer::consumer::ImportConsumer;
//! use bbiq_importer::persistence::PgImportStore;
//! use bbiq_importer::queue::{AmqpConnector, ImportQueue};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load(None)?;
//!     let store = PgImportStore::connect(
//!         &config.database,
//!         config.import.existing_import_action,
//!     )
//!     .await?;
//!
//!     let mut queue = ImportQueue::new(AmqpConnector, config.queue.clone());
//!     queue.open().await?;
//!     ImportConsumer::new(0, Arc::new(store), config.import.retry_policy())
//!         .register(&mut queue)
//!         .await?;
//!     queue.wait_for_consumer().await;
//!     queue.close().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod consumer;
pub mod error;
pub mod persistence;
pub mod producer;
pub mod queue;
pub mod validators;

pub use error::{ImportError, ImportErrorKind, QueueError, ValidationError};
