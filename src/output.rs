//! Output formatting and styling module.
//!
//! Provides a centralized interface for all CLI output, including colored
//! status lines, progress tracking, and the end-of-run summary table. Keeping
//! every user-facing line here makes it easy to change formatting globally;
//! operation-level events go through the `log` macros instead.

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

use crate::batch::BatchStats;

/// Manages all CLI output with consistent styling and formatting.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    /// Prints a regular message without styling.
    pub fn plain(message: &str) {
        println!("{}", message);
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Prints a dry-run notice message.
    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Creates a progress bar for multi-source runs.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use colsort::output::OutputFormatter;
    /// let pb = OutputFormatter::create_progress_bar(10);
    /// pb.inc(1);
    /// pb.finish_with_message("Completed!");
    /// ```
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .expect("Invalid progress bar template")
                .progress_chars("█▓░"),
        );
        pb
    }

    /// Prints the end-of-run statistics table.
    pub fn summary_table(stats: &BatchStats) {
        Self::header("SUMMARY");

        let rows: [(&str, usize); 5] = [
            ("Processed", stats.processed),
            ("Renamed", stats.renamed),
            ("Archived", stats.archived),
            ("Moved", stats.moved),
            ("Errors", stats.errors),
        ];

        println!("{:<10} | {}", "Counter".bold(), "Items".bold());
        println!("{}", "-".repeat(20));

        for (label, count) in rows {
            if count == 0 && label != "Processed" {
                continue;
            }
            let rendered = if label == "Errors" && count > 0 {
                count.to_string().red().to_string()
            } else {
                count.to_string().green().to_string()
            };
            println!("{:<10} | {}", label, rendered);
        }
    }
}
