//! Progress reporting for batch commands
//!
//! Provides a spinner while files are processed and a summary afterwards.

use crate::commands::BatchReport;
use crate::error::FileOutcome;
use console::style;
use humansize::{format_size, BINARY};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner showing batch progress
#[derive(Clone)]
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    /// Create a new progress reporter
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();

        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );

        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// Update the progress display
    pub fn update(&self, done: usize, total: usize, failed: usize) {
        let msg = if failed > 0 {
            format!(
                "Files: {}/{} | Failed: {}",
                format_number(done as u64),
                format_number(total as u64),
                format_number(failed as u64)
            )
        } else {
            format!(
                "Files: {}/{}",
                format_number(done as u64),
                format_number(total as u64)
            )
        };

        self.bar.set_message(msg);
    }

    /// Show live walk counters while the tree is scanned
    pub fn update_scan(&self, dirs: u64, files: u64) {
        self.bar.set_message(format!(
            "Scanning... Dirs: {} | Files: {}",
            format_number(dirs),
            format_number(files)
        ));
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
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let bytes: Vec<_> = s.bytes().rev().collect();

    let chunks: Vec<String> = bytes
        .chunks(3)
        .map(|chunk| {
            chunk
                .iter()
                .rev()
                .map(|&b| b as char)
                .collect::<String>()
        })
        .collect();

    chunks.into_iter().rev().collect::<Vec<_>>().join(",")
}

/// Batch command a summary is printed for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchKind {
    Compile,
    Clean,
}

/// Label/value rows of a summary, failures excluded
fn summary_fields(kind: BatchKind, report: &BatchReport) -> Vec<(&'static str, String)> {
    let mut fields = match kind {
        BatchKind::Compile => {
            let compiled = report
                .outcomes
                .iter()
                .filter(|o| matches!(o, FileOutcome::Compiled { .. }))
                .count();
            vec![
                ("Compiled:", format_number(compiled as u64)),
                ("Written:", format_size(report.bytes_written(), BINARY)),
            ]
        }
        BatchKind::Clean => {
            let deleted = report
                .outcomes
                .iter()
                .filter(|o| matches!(o, FileOutcome::Deleted { .. }))
                .count();
            vec![("Deleted:", format_number(deleted as u64))]
        }
    };
    fields.push(("Duration:", format!("{:.2}s", report.duration.as_secs_f64())));
    fields
}

/// Print a summary of a compile or clean run
pub fn print_summary(title: &str, kind: BatchKind, report: &BatchReport) {
    println!();
    if report.failed() > 0 {
        println!("{}", style(format!("{} (with errors)", title)).yellow().bold());
    } else {
        println!("{}", style(title).green().bold());
    }
    println!("{}", style("─".repeat(50)).dim());

    for (label, value) in summary_fields(kind, report) {
        println!("  {} {}", style(label).bold(), value);
    }

    if report.failed() > 0 {
        println!(
            "  {} {}",
            style("Failed:").yellow().bold(),
            format_number(report.failed() as u64)
        );
        for error in report.failures() {
            println!("    {} {}", style("✗").red(), error);
        }
    }
    println!();
}

/// Print a header at the start of a command
pub fn print_header(command: &str, input: &str, output: &str) {
    println!();
    println!(
        "{} {} {}",
        style("teac").cyan().bold(),
        env!("CARGO_PKG_VERSION"),
        style(command).bold()
    );
    println!("{}", style("─".repeat(50)).dim());
    println!("  {} {}", style("Input:").bold(), input);
    println!("  {} {}", style("Output:").bold(), output);
    println!();
}
