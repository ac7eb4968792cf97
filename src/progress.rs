//! Progress reporting for the tree walker
//!
//! Provides a live spinner using indicatif. Everything here writes to
//! stderr so the JSON on stdout stays clean.

use crate::tree::FileTreeResult;
use crate::walker::WalkProgress;
use console::style;
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

/// Progress reporter that displays walk status
#[derive(Clone)]
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    /// Create a new progress reporter
    pub fn new() -> Self {
        let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());

        let spinner = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
        bar.set_style(spinner);
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Update the progress display
    pub fn update(&self, progress: &WalkProgress) {
        let msg = format!(
            "Dirs: {} | Files: {} | Size: {} | Rate: {:.0}/s | Queue: {} | Workers: {}/{}",
            format_number(progress.dirs),
            format_number(progress.files),
            format_size(progress.bytes, BINARY),
            progress.entries_per_second(),
            progress.pending,
            progress.active_workers,
            progress.total_workers,
        );

        self.bar.set_message(msg);
    }

    /// Set a status message
    pub fn set_status(&self, status: &str) {
        self.bar.set_message(status.to_string());
    }

    /// Finish the progress display with a final message
    pub fn finish(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    /// Finish and clear the progress display
    pub fn finish_and_clear(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a number with thousands separators
pub fn format_number(n: u64) -> String {
    let s = n.to_string();
    let bytes: Vec<_> = s.bytes().rev().collect();

    let chunks: Vec<String> = bytes
        .chunks(3)
        .map(|chunk| chunk.iter().rev().map(|&b| b as char).collect::<String>())
        .collect();

    chunks.into_iter().rev().collect::<Vec<_>>().join(",")
}

/// Print a summary of the walk
pub fn print_summary(result: &FileTreeResult, output: &str, completed: bool) {
    let duration_secs = result.duration().as_secs_f64();
    let entries = result.dir_count() + result.file_count();
    let rate = if duration_secs > 0.0 {
        entries as f64 / duration_secs
    } else {
        0.0
    };

    let title = if completed {
        style("Walk Complete").green().bold()
    } else {
        style("Walk Incomplete").yellow().bold()
    };

    eprintln!();
    eprintln!("{}", title);
    eprintln!("{}", style("─".repeat(50)).dim());
    eprintln!(
        "  {} {}",
        style("Directories:").bold(),
        format_number(result.dir_count())
    );
    eprintln!(
        "  {} {}",
        style("Files:").bold(),
        format_number(result.file_count())
    );
    eprintln!(
        "  {} {}",
        style("Total Size:").bold(),
        format_size(result.total_bytes(), BINARY)
    );
    eprintln!(
        "  {} {:.1}s ({:.0} entries/sec)",
        style("Duration:").bold(),
        duration_secs,
        rate
    );
    if !result.issues().is_empty() {
        eprintln!(
            "  {} {}",
            style("Skipped:").yellow().bold(),
            format_number(result.issues().len() as u64)
        );
    }
    eprintln!("  {} {}", style("Output:").bold(), output);
    eprintln!();
}

/// Print a header at the start of the walk
pub fn print_header(root: &str, workers: usize, layout: &str, output: &str) {
    eprintln!();
    eprintln!(
        "{} {}",
        style("filetree-walker").cyan().bold(),
        env!("CARGO_PKG_VERSION")
    );
    eprintln!("{}", style("─".repeat(50)).dim());
    eprintln!("  {} {}", style("Root:").bold(), root);
    eprintln!("  {} {}", style("Workers:").bold(), workers);
    eprintln!("  {} {}", style("Layout:").bold(), layout);
    eprintln!("  {} {}", style("Output:").bold(), output);
    eprintln!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(1234567), "1,234,567");
        assert_eq!(format_number(1234567890), "1,234,567,890");
    }
}
