//! `bbiq consume` command implementation
//!
//! Runs until SIGINT or until the broker ends the subscription.

use super::open_queue;
use crate::error::Result;
use bbiq_importer::config::Config;
use bbiq_importer::consumer::ImportConsumer;
use bbiq_importer::persistence::PgImportStore;
use std::sync::Arc;
use tracing::{info, warn};

/// Consume the primary queue with a single worker
pub async fn run(config: Config) -> Result<()> {
    let store =
        PgImportStore::connect(&config.database, config.import.existing_import_action).await?;
    store.migrate().await?;

    let mut queue = open_queue(config.queue).await?;
    ImportConsumer::new(0, Arc::new(store), config.import.retry_policy())
        .register(&mut queue)
        .await?;

    let interrupted = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Unable to listen for interrupts");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = interrupted => info!("Interrupted, closing queue"),
        _ = queue.wait_for_consumer() => warn!("Broker ended the subscription"),
    }

    queue.close().await;

    let stats = queue.stats();
    println!(
        "Processed {} message(s): {} failed, {} invalid, {} unfinished",
        stats.processed, stats.failed, stats.invalid, stats.pending
    );
    Ok(())
}
