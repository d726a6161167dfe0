//! Progress indicators for long-running producer runs

use bbiq_importer::producer::ProducerSummary;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Lines between two progress message refreshes
pub const REFRESH_EVERY: u64 = 500;

/// Create a spinner for indeterminate operations
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// One-line rendering of producer totals
pub fn format_summary(summary: &ProducerSummary) -> String {
    format!(
        "{} lines, {} pushed, {} rejected, {} skipped",
        summary.lines, summary.pushed, summary.rejected, summary.skipped
    )
}
