//! `bbiq info` command implementation

use crate::error::Result;
use bbiq_importer::config::Config;
use bbiq_importer::queue::{AmqpConnector, ImportQueue, QueueInfo};

/// Print the metadata of the primary and failure queues
pub async fn run(config: Config) -> Result<()> {
    let mut queue = ImportQueue::new(AmqpConnector, config.queue);
    let queues = queue.open().await?;

    print!("{}", render(&queues));

    queue.close().await;
    Ok(())
}

fn render(queues: &[QueueInfo]) -> String {
    queues
        .iter()
        .map(|info| {
            format!(
                "{}\n  Messages:  {}\n  Consumers: {}\n",
                info.name, info.message_count, info.consumer_count
            )
        })
        .collect()
}
