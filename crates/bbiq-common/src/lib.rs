//! BookBrainz Import Queue - Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, utilities, and error handling for the importer workspace.
//!
//! # Overview
//!
//! - **Types**: the queued entity record exchanged between producers and consumers
//! - **Error Handling**: common error and result types
//! - **Logging**: `tracing` subscriber setup shared by all binaries
//! - **Sort names**: derivation of sortable names for aliases
//!
//! # Example
//!
//! ```no_run
//! use bbiq_common::types::QueuedEntity;
//!
//! fn describe(payload: &[u8]) -> bbiq_common::Result<String> {
//!     let entity = QueuedEntity::from_slice(payload)?;
//!     Ok(entity.to_string())
//! }
//! ```

pub mod error;
pub mod logging;
pub mod sort_name;
pub mod types;

// Re-export commonly used types
pub use error::{BbiqError, Result};
pub use types::{EntityType, QueuedEntity};
