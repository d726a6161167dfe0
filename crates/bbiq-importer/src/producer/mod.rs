//! Producers: read source dumps and push entities into an [`ImportQueue`].
//!
//! Only OpenLibrary dumps are supported. Lines that cannot be mapped are
//! logged with their position and skipped; the run continues.

pub mod dump;
pub mod openlibrary;

use crate::queue::{BrokerConnector, ImportQueue};
use anyhow::{Context, Result};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Push attempts per entity while the broker signals back-pressure
pub const PUSH_ATTEMPTS: u32 = 5;

/// Pause between push attempts
pub const PUSH_RETRY_DELAY: Duration = Duration::from_millis(200);

/// Counters of one producer run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProducerSummary {
    /// Non-empty lines read
    pub lines: u64,
    /// Entities accepted by the broker
    pub pushed: u64,
    /// Entities the broker did not accept
    pub rejected: u64,
    /// Lines that could not be mapped to an entity
    pub skipped: u64,
}

impl ProducerSummary {
    pub fn merge(&mut self, other: ProducerSummary) {
        self.lines += other.lines;
        self.pushed += other.pushed;
        self.rejected += other.rejected;
        self.skipped += other.skipped;
    }
}

/// Push every entity of an OpenLibrary dump at `path`.
///
/// `progress` is called after each line with the running totals.
/// Fails only when the file cannot be opened or read.
pub async fn run_dump<C, P>(
    queue: &ImportQueue<C>,
    path: &Path,
    mut progress: P,
) -> Result<ProducerSummary>
where
    C: BrokerConnector,
    P: FnMut(&ProducerSummary),
{
    let file = path.display().to_string();
    let mut lines = dump::read_lines(path)
        .with_context(|| format!("Failed to open dump file {}", file))?;
    let mut summary = ProducerSummary::default();

    info!(file = %file, "Importing dump");

    while let Some(line) = lines.recv().await {
        let (line_no, line) =
            line.with_context(|| format!("Failed to read dump file {}", file))?;
        if line.trim().is_empty() {
            continue;
        }
        summary.lines += 1;

        match openlibrary::parse_line(&line) {
            Ok(entity) => {
                if push_with_retry(queue, &entity).await {
                    summary.pushed += 1;
                } else {
                    warn!(file = %file, line = line_no, %entity, "Entity was not accepted by the queue");
                    summary.rejected += 1;
                }
            }
            Err(e) => {
                warn!(file = %file, line = line_no, error = %e, "Skipping dump line");
                summary.skipped += 1;
            }
        }
        progress(&summary);
    }

    info!(
        file = %file,
        lines = summary.lines,
        pushed = summary.pushed,
        rejected = summary.rejected,
        skipped = summary.skipped,
        "Dump import finished"
    );
    Ok(summary)
}

async fn push_with_retry<C: BrokerConnector>(
    queue: &ImportQueue<C>,
    entity: &bbiq_common::QueuedEntity,
) -> bool {
    for attempt in 1..=PUSH_ATTEMPTS {
        if queue.push(entity).await {
            return true;
        }
        if !queue.is_open() {
            return false;
        }
        debug!(%entity, attempt, "Queue applied back-pressure, pausing");
        tokio::time::sleep(PUSH_RETRY_DELAY).await;
    }
    false
}
