// Progress bars for transfers and ffmpeg jobs

use colored::Colorize;
use humansize::{format_size, BINARY};
use std::io::{self, Write};

use crate::ui::formatters::format_clock;

const BAR_LENGTH: usize = 30;

fn percentage(done: f64, total: f64) -> usize {
    if total > 0.0 {
        ((done / total * 100.0) as usize).min(100)
    } else {
        0
    }
}

fn render(percentage: usize, prefix: &str, detail: &str) {
    let filled = percentage * BAR_LENGTH / 100;
    let empty = BAR_LENGTH.saturating_sub(filled);

    print!(
        "\r{} [{}{}] {}% ({}) ",
        prefix.white(),
        "=".repeat(filled).green(),
        " ".repeat(empty),
        percentage,
        detail
    );

    io::stdout().flush().ok();
}

/// Byte progress of a download
///
/// # Arguments
/// * `done` - Bytes written so far
/// * `total` - Expected size from Content-Length
/// * `prefix` - Text to display before the progress bar
pub fn show_transfer_progress(done: u64, total: u64, prefix: &str) {
    let detail = format!(
        "{}/{}",
        format_size(done, BINARY),
        format_size(total, BINARY)
    );
    render(percentage(done as f64, total as f64), prefix, &detail);
}

/// Media-time progress of an ffmpeg job
pub fn show_time_progress(done_secs: f64, total_secs: f64, prefix: &str) {
    let done_secs = done_secs.min(total_secs);
    let detail = format!("{}/{}", format_clock(done_secs), format_clock(total_secs));
    render(percentage(done_secs, total_secs), prefix, &detail);
}

/// Clear the current line (useful for progress bars)
pub fn clear_line() {
    print!("\r{}\r", " ".repeat(80));
    io::stdout().flush().ok();
}
