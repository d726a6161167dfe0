//! `bbiq import` command implementation

use super::{open_queue, producer_options};
use crate::error::{CliError, Result};
use crate::progress::{create_spinner, format_summary, REFRESH_EVERY};
use bbiq_importer::config::Config;
use bbiq_importer::producer::{run_dump, ProducerSummary};
use std::path::PathBuf;

/// Push every entity of the OpenLibrary dumps in `files`
pub async fn run(config: Config, files: &[PathBuf]) -> Result<()> {
    let mut queue = open_queue(producer_options(config.queue)).await?;
    let mut total = ProducerSummary::default();
    let mut outcome = Ok(());

    for path in files {
        let pb = create_spinner(&format!("Importing {}", path.display()));
        let result = run_dump(&queue, path, |summary| {
            if summary.lines % REFRESH_EVERY == 0 {
                pb.set_message(format!("{}: {}", path.display(), format_summary(summary)));
            }
        })
        .await;
        pb.finish_and_clear();

        match result {
            Ok(summary) => {
                println!("{}: {}", path.display(), format_summary(&summary));
                total.merge(summary);
            }
            Err(e) => {
                outcome = Err(CliError::Import(e));
                break;
            }
        }
    }

    queue.close().await;
    if files.len() > 1 {
        println!("Total: {}", format_summary(&total));
    }
    outcome
}
