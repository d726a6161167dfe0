//! CLI command implementations
//!
//! Each subcommand has its own module with a `run` function.

pub mod consume;
pub mod import;
pub mod info;
pub mod purge;
pub mod push;

use crate::error::Result;
use bbiq_importer::queue::{AmqpConnector, ImportQueue, ImportQueueOptions};

/// Connect to the broker and declare the configured queues
pub(crate) async fn open_queue(options: ImportQueueOptions) -> Result<ImportQueue<AmqpConnector>> {
    let mut queue = ImportQueue::new(AmqpConnector, options);
    queue.open().await?;
    Ok(queue)
}

/// Producers never consume, so they leave the failure queue alone
pub(crate) fn producer_options(mut options: ImportQueueOptions) -> ImportQueueOptions {
    options.failure_queue = None;
    options
}
