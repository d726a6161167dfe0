//! Configuration management
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! environment variables (a `.env` file is honoured). The result is validated
//! once and passed explicitly to the queue, the consumer and the store.

use crate::consumer::RetryPolicy;
use crate::persistence::ExistingImportAction;
use crate::queue::ImportQueueOptions;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

// ============================================================================
// Database Configuration Constants
// ============================================================================

/// Default database URL for local development.
pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/bookbrainz";

/// Default maximum database connections in the pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;

/// Default database connection timeout in seconds.
pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

// ============================================================================
// Import Configuration Constants
// ============================================================================

/// Default number of persistence attempts per entity.
pub const DEFAULT_RETRY_LIMIT: u32 = 3;

/// Default base wait between attempts; zero retries immediately.
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 0;

/// Default cap on the wait between attempts.
pub const DEFAULT_RETRY_BACKOFF_MAX_MS: u64 = 30_000;

/// Importer configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub queue: ImportQueueOptions,
    pub database: DatabaseConfig,
    pub import: ImportConfig,
}

/// Database configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
            connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
        }
    }
}

/// Consumer behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    pub retry_limit: u32,
    pub retry_backoff_ms: u64,
    pub retry_backoff_max_ms: u64,
    pub existing_import_action: ExistingImportAction,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            retry_limit: DEFAULT_RETRY_LIMIT,
            retry_backoff_ms: DEFAULT_RETRY_BACKOFF_MS,
            retry_backoff_max_ms: DEFAULT_RETRY_BACKOFF_MAX_MS,
            existing_import_action: ExistingImportAction::Skip,
        }
    }
}

impl ImportConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::with_backoff(
            self.retry_limit,
            Duration::from_millis(self.retry_backoff_ms),
            Duration::from_millis(self.retry_backoff_max_ms),
        )
    }
}

impl Config {
    /// Load configuration from defaults, an optional TOML file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        let config = config.merge_env(|key| std::env::var(key).ok())?;

        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: Config = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        // TOML has no null, `failure_queue = "none"` disables it
        config.queue.failure_queue = config
            .queue
            .failure_queue
            .as_deref()
            .and_then(parse_failure_queue);
        Ok(config)
    }

    /// Override fields with the variables `lookup` knows about
    pub fn merge_env<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("BBIQ_QUEUE_URL") {
            self.queue.connection_url = url;
        }
        if let Some(name) = lookup("BBIQ_QUEUE_NAME") {
            self.queue.queue_name = name;
        }
        if let Some(name) = lookup("BBIQ_FAILURE_QUEUE") {
            self.queue.failure_queue = parse_failure_queue(&name);
        }
        if let Some(limit) = lookup("BBIQ_PREFETCH_LIMIT") {
            self.queue.prefetch_limit = parse_var("BBIQ_PREFETCH_LIMIT", &limit)?;
        }
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(max) = lookup("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = parse_var("DATABASE_MAX_CONNECTIONS", &max)?;
        }
        if let Some(limit) = lookup("BBIQ_RETRY_LIMIT") {
            self.import.retry_limit = parse_var("BBIQ_RETRY_LIMIT", &limit)?;
        }
        if let Some(backoff) = lookup("BBIQ_RETRY_BACKOFF_MS") {
            self.import.retry_backoff_ms = parse_var("BBIQ_RETRY_BACKOFF_MS", &backoff)?;
        }
        Ok(self)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.queue.connection_url.trim().is_empty() {
            anyhow::bail!("Queue connection URL cannot be empty");
        }

        if self.queue.queue_name.trim().is_empty() {
            anyhow::bail!("Queue name cannot be empty");
        }

        if self.queue.prefetch_limit == 0 {
            anyhow::bail!("Queue prefetch_limit must be greater than 0");
        }

        if let Some(failure_queue) = &self.queue.failure_queue {
            if failure_queue.trim().is_empty() {
                anyhow::bail!("Failure queue name cannot be empty, use 'none' to disable it");
            }
            if *failure_queue == self.queue.queue_name {
                anyhow::bail!(
                    "Failure queue '{}' cannot be the primary queue",
                    failure_queue
                );
            }
        }

        if self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        if self.database.max_connections == 0 {
            anyhow::bail!("Database max_connections must be greater than 0");
        }

        if self.import.retry_limit == 0 {
            anyhow::bail!("Import retry_limit must be at least 1");
        }

        if self.import.retry_backoff_max_ms < self.import.retry_backoff_ms {
            anyhow::bail!(
                "Import retry_backoff_max_ms ({}) cannot be lower than retry_backoff_ms ({})",
                self.import.retry_backoff_max_ms,
                self.import.retry_backoff_ms
            );
        }

        Ok(())
    }
}

/// `none`, `false` and an empty value disable the failure queue
pub fn parse_failure_queue(value: &str) -> Option<String> {
    let value = value.trim();
    match value.to_lowercase().as_str() {
        "" | "none" | "false" => None,
        _ => Some(value.to_string()),
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid value '{}' for {}: {}", value, key, e))
}
