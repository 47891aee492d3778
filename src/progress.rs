//! Spinners for long blocking steps.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Start a spinner with `msg`. Hidden when `enabled` is false so streamed
/// tool output is not interleaved with redraws.
pub fn spinner(msg: &str, enabled: bool) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Stop the spinner, leaving a success line behind.
pub fn finish_success(pb: &ProgressBar, msg: &str) {
    if pb.is_hidden() {
        return;
    }
    pb.finish_and_clear();
    println!("{} {}", "✓".green(), msg);
}

/// Stop the spinner after a failure; the error is reported by the caller.
pub fn finish_error(pb: &ProgressBar, msg: &str) {
    if pb.is_hidden() {
        return;
    }
    pb.finish_and_clear();
    eprintln!("{} {}", "✗".red(), msg);
}
