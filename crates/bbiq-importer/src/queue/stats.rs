use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time view of the consumer side counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Deliveries received
    pub consumed: u64,
    /// Deliveries received but not yet fully handled
    pub pending: u64,
    /// Deliveries handled and acknowledged
    pub processed: u64,
    /// Entities the handler rejected
    pub failed: u64,
    /// Payloads that could not be parsed
    pub invalid: u64,
}

#[derive(Debug, Default)]
pub(crate) struct QueueCounters {
    consumed: AtomicU64,
    pending: AtomicU64,
    processed: AtomicU64,
    failed: AtomicU64,
    invalid: AtomicU64,
}

impl QueueCounters {
    pub(crate) fn received(&self) {
        self.consumed.fetch_add(1, Ordering::SeqCst);
        self.pending.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn rejected(&self) {
        self.failed.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn unparseable(&self) {
        self.invalid.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn finished(&self) {
        self.pending.fetch_sub(1, Ordering::SeqCst);
        self.processed.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn pending(&self) -> u64 {
        self.pending.load(Ordering::SeqCst)
    }

    pub(crate) fn snapshot(&self) -> QueueStats {
        QueueStats {
            consumed: self.consumed.load(Ordering::SeqCst),
            pending: self.pending.load(Ordering::SeqCst),
            processed: self.processed.load(Ordering::SeqCst),
            failed: self.failed.load(Ordering::SeqCst),
            invalid: self.invalid.load(Ordering::SeqCst),
        }
    }
}
