use serde::{Deserialize, Serialize};
use std::time::Duration;

// ============================================================================
// Queue Configuration Constants
// ============================================================================

/// Default broker address.
pub const DEFAULT_CONNECTION_URL: &str = "amqp://localhost";

/// Default primary queue name.
pub const DEFAULT_QUEUE_NAME: &str = "bookbrainz-import";

/// Default failure queue name.
pub const DEFAULT_FAILURE_QUEUE: &str = "bookbrainz-import-failures";

/// Queue names used in test mode, the broker refuses to redeclare a durable queue as transient.
pub const TEST_QUEUE_NAME: &str = "bookbrainz-import-test";
pub const TEST_FAILURE_QUEUE: &str = "bookbrainz-import-test-failures";

/// Default number of unacknowledged deliveries held at once.
pub const DEFAULT_PREFETCH_LIMIT: u16 = 5;

/// Default number of polling waits `close()` spends draining pending deliveries.
pub const DEFAULT_CLOSE_GRACE_PERIODS: u32 = 10;

/// Default length of one polling wait in milliseconds.
pub const DEFAULT_CLOSE_POLL_INTERVAL_MS: u64 = 200;

/// Import queue options, each independently overridable
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportQueueOptions {
    pub connection_url: String,
    /// Durable queue and persistent messages. Fixed once the queue exists.
    pub is_persistent: bool,
    pub prefetch_limit: u16,
    pub queue_name: String,
    /// `None` discards failed entities instead of queueing them
    pub failure_queue: Option<String>,
    pub close_grace_periods: u32,
    pub close_poll_interval_ms: u64,
}

impl Default for ImportQueueOptions {
    fn default() -> Self {
        Self {
            connection_url: DEFAULT_CONNECTION_URL.to_string(),
            is_persistent: true,
            prefetch_limit: DEFAULT_PREFETCH_LIMIT,
            queue_name: DEFAULT_QUEUE_NAME.to_string(),
            failure_queue: Some(DEFAULT_FAILURE_QUEUE.to_string()),
            close_grace_periods: DEFAULT_CLOSE_GRACE_PERIODS,
            close_poll_interval_ms: DEFAULT_CLOSE_POLL_INTERVAL_MS,
        }
    }
}

impl ImportQueueOptions {
    /// Switch to non-persistent semantics, renaming queues still on their defaults
    pub fn into_test_mode(mut self) -> Self {
        self.is_persistent = false;
        if self.queue_name == DEFAULT_QUEUE_NAME {
            self.queue_name = TEST_QUEUE_NAME.to_string();
        }
        if self.failure_queue.as_deref() == Some(DEFAULT_FAILURE_QUEUE) {
            self.failure_queue = Some(TEST_FAILURE_QUEUE.to_string());
        }
        self
    }

    pub fn close_poll_interval(&self) -> Duration {
        Duration::from_millis(self.close_poll_interval_ms)
    }

    /// Upper bound on the time `close()` waits for pending deliveries
    pub fn close_grace(&self) -> Duration {
        self.close_poll_interval() * self.close_grace_periods
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ImportQueueOptions::default();
        assert_eq!(options.connection_url, "amqp://localhost");
        assert!(options.is_persistent);
        assert_eq!(options.prefetch_limit, 5);
        assert_eq!(options.failure_queue.as_deref(), Some("bookbrainz-import-failures"));
        assert_eq!(options.close_grace(), Duration::from_secs(2));
    }

    #[test]
    fn test_test_mode_renames_default_queues() {
        let options = ImportQueueOptions::default().into_test_mode();
        assert!(!options.is_persistent);
        assert_eq!(options.queue_name, TEST_QUEUE_NAME);
        assert_eq!(options.failure_queue.as_deref(), Some(TEST_FAILURE_QUEUE));
    }

    #[test]
    fn test_test_mode_keeps_explicit_names() {
        let options = ImportQueueOptions {
            queue_name: "custom".into(),
            failure_queue: None,
            ..Default::default()
        }
        .into_test_mode();
        assert_eq!(options.queue_name, "custom");
        assert_eq!(options.failure_queue, None);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let options: ImportQueueOptions = toml::from_str("prefetch_limit = 20").unwrap();
        assert_eq!(options.prefetch_limit, 20);
        assert_eq!(options.queue_name, DEFAULT_QUEUE_NAME);
    }
}
