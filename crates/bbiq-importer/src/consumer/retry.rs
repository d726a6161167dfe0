use std::time::Duration;

/// Bounded attempts for transient persistence failures.
///
/// With a zero `backoff` attempts follow each other immediately; otherwise the
/// wait doubles after every failed attempt, capped at `max_backoff`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    limit: u32,
    backoff: Duration,
    max_backoff: Duration,
}

impl RetryPolicy {
    /// Retry without waiting. A limit of 0 still makes one attempt.
    pub fn immediate(limit: u32) -> Self {
        Self::with_backoff(limit, Duration::ZERO, Duration::ZERO)
    }

    pub fn with_backoff(limit: u32, backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            limit: limit.max(1),
            backoff,
            max_backoff: max_backoff.max(backoff),
        }
    }

    /// Total number of persistence attempts per entity
    pub fn attempts(&self) -> u32 {
        self.limit
    }

    /// Wait before the attempt following failed attempt number `attempt` (1-based)
    pub fn delay_after(&self, attempt: u32) -> Duration {
        if self.backoff.is_zero() {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.backoff.saturating_mul(factor).min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::immediate(crate::config::DEFAULT_RETRY_LIMIT)
    }
}
