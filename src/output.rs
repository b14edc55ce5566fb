//! Console rendering for organize and undo runs.
//!
//! Everything the command layer prints goes through [`OutputFormatter`], so
//! symbols and colors stay consistent between modes.

use crate::classifier::MatchKind;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::Path;

/// Styled console output.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Green check mark line.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use filament::output::OutputFormatter;
    /// OutputFormatter::success("Dry run complete.");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Red cross line, on stderr.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    pub fn plain(message: &str) {
        println!("{}", message);
    }

    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Yellow line prefixed with `[DRY RUN]`.
    pub fn dry_run_notice(message: &str) {
        println!("{} {}", "[DRY RUN]".yellow().bold(), message.yellow());
    }

    /// `name -> category/` after a successful move, marked with the rule
    /// kind that chose the category.
    pub fn moved(name: &str, category: &str, matched_by: MatchKind) {
        Self::success(&format!(
            "{} {} -> {}/",
            match_marker(matched_by),
            name,
            category.bold()
        ));
    }

    /// Dimmed line for a file left in place.
    pub fn skipped(name: &str, reason: &str) {
        println!("  {} {} ({})", "-".dimmed(), name.dimmed(), reason);
    }

    /// One restore attempt during undo.
    pub fn restore_line(destination: &Path, original: &Path) -> String {
        format!("{} -> {}", destination.display(), original.display())
    }

    /// Progress bar for a live run over `total` files.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use filament::output::OutputFormatter;
    /// let pb = OutputFormatter::create_progress_bar(100);
    /// pb.inc(1);
    /// pb.finish_and_clear();
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

    /// Prints a `label | count files` table followed by a total row.
    ///
    /// Used for moved files per category and skipped files per reason.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use filament::output::OutputFormatter;
    /// use std::collections::BTreeMap;
    ///
    /// let mut counts = BTreeMap::new();
    /// counts.insert("documents".to_string(), 15);
    /// counts.insert("images".to_string(), 8);
    /// OutputFormatter::count_table("Category", &counts);
    /// ```
    pub fn count_table<K: Display>(title: &str, counts: &BTreeMap<K, usize>) {
        let rows: Vec<(String, usize)> = counts
            .iter()
            .map(|(label, count)| (label.to_string(), *count))
            .collect();
        let total: usize = rows.iter().map(|(_, count)| count).sum();
        let width = rows
            .iter()
            .map(|(label, _)| label.len())
            .chain([title.len(), "Total".len()])
            .max()
            .unwrap_or(0);
        let rule = "-".repeat(width + 12);

        println!("{:<width$} | {}", title.bold(), "Files".bold(), width = width);
        println!("{}", rule);
        for (label, count) in &rows {
            println!(
                "{:<width$} | {:>5} {}",
                label,
                count.to_string().green(),
                file_word(*count),
                width = width
            );
        }
        println!("{}", rule);
        println!(
            "{:<width$} | {:>5} {}",
            "Total".bold(),
            total.to_string().green().bold(),
            file_word(total),
            width = width
        );
    }

    /// Prints the one-line run result, e.g. `3 moved, 1 skipped, 0 errors`.
    pub fn results_line(moved: usize, skipped: usize, errors: usize, dry_run: bool) {
        let verb = if dry_run { "would move" } else { "moved" };
        let errors_text = format!("{} errors", errors);
        println!(
            "{} {}, {} skipped, {}",
            moved.to_string().green().bold(),
            verb,
            skipped,
            if errors > 0 {
                errors_text.red().to_string()
            } else {
                errors_text
            }
        );
    }
}

fn match_marker(matched_by: MatchKind) -> &'static str {
    match matched_by {
        MatchKind::Age => "⏳",
        MatchKind::Keyword => "🧠",
        MatchKind::Extension => "📁",
    }
}

fn file_word(count: usize) -> &'static str {
    if count == 1 { "file" } else { "files" }
}
