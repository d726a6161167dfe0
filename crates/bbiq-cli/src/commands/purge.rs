//! `bbiq purge` command implementation

use super::open_queue;
use crate::error::Result;
use bbiq_importer::config::Config;

/// Drop every ready message of the primary queue
pub async fn run(config: Config) -> Result<()> {
    let mut queue = open_queue(config.queue).await?;
    let result = queue.purge().await;
    queue.close().await;

    let purged = result?;
    println!("Purged {} message(s) from '{}'", purged, queue.options().queue_name);
    Ok(())
}
