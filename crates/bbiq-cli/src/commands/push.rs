//! `bbiq push` command implementation
//!
//! Each file holds one JSON entity or an array of entities.

use super::{open_queue, producer_options};
use crate::error::Result;
use bbiq_common::QueuedEntity;
use bbiq_importer::config::Config;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Read the entities of one file
pub fn read_entities(path: &Path) -> anyhow::Result<Vec<QueuedEntity>> {
    use anyhow::Context;

    let raw = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_slice(&raw)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    let entities = match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<std::result::Result<Vec<QueuedEntity>, _>>(),
        single => serde_json::from_value(single).map(|entity| vec![entity]),
    };
    entities.with_context(|| format!("{} does not hold queued entities", path.display()))
}

/// Push the entities of `files`; unreadable files are logged and skipped
pub async fn run(config: Config, files: &[PathBuf]) -> Result<()> {
    let mut queue = open_queue(producer_options(config.queue)).await?;
    let (mut pushed, mut rejected, mut skipped_files) = (0u64, 0u64, 0u64);

    for path in files {
        let entities = match read_entities(path) {
            Ok(entities) => entities,
            Err(e) => {
                error!(file = %path.display(), error = %format!("{e:#}"), "Skipping file");
                skipped_files += 1;
                continue;
            }
        };

        for entity in &entities {
            if queue.push(entity).await {
                pushed += 1;
            } else {
                warn!(file = %path.display(), %entity, "Entity was not accepted by the queue");
                rejected += 1;
            }
        }
        info!(file = %path.display(), entities = entities.len(), "File pushed");
    }

    queue.close().await;
    println!(
        "Pushed {} entit{}, {} rejected, {} file(s) skipped",
        pushed,
        if pushed == 1 { "y" } else { "ies" },
        rejected,
        skipped_files
    );
    Ok(())
}
