//! Command-line interface module for filament.
//!
//! This module handles all CLI-related functionality including:
//! - Flag parsing (`--run`, `--dry-run`, `--undo`)
//! - Loading and preparing the configuration
//! - Reporting organize and undo results on the console

use crate::config::OrganizerConfig;
use crate::error::OrganizeError;
use crate::organizer::{Disposition, FileOutcome, Organizer, RunObserver, Summary};
use crate::output::OutputFormatter;
use crate::undo::{UndoOutcome, UndoReport};
use anyhow::Context;
use clap::{ArgGroup, Parser};
use indicatif::ProgressBar;
use std::path::PathBuf;

/// Rule-driven downloads organizer with dry-run previews and session undo.
#[derive(Parser, Debug)]
#[command(name = "filament", version, about)]
#[command(group(ArgGroup::new("mode").args(["run", "dry_run", "undo"]).multiple(false)))]
pub struct Cli {
    /// Organize the source directory now
    #[arg(long)]
    pub run: bool,

    /// Preview what would be moved without touching any file
    #[arg(long)]
    pub dry_run: bool,

    /// Move the files of the most recent session back
    #[arg(long)]
    pub undo: bool,

    /// Do not write a session log or undo file
    #[arg(long)]
    pub no_log: bool,

    /// Configuration file (default: ./filament.toml, then the user config directory)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory to organize, overriding `source_dir` from the configuration
    #[arg(long, value_name = "DIR")]
    pub source: Option<PathBuf>,
}

impl Cli {
    /// The selected mode, or `None` if no mode flag was given.
    pub fn mode(&self) -> Option<OrganizeCommand> {
        if self.undo {
            Some(OrganizeCommand::Undo)
        } else if self.run || self.dry_run {
            Some(OrganizeCommand::Organize {
                dry_run: self.dry_run,
            })
        } else {
            None
        }
    }
}

/// Represents a CLI command to execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrganizeCommand {
    /// Organize the source directory.
    Organize {
        /// If true, simulate the operation without making changes.
        dry_run: bool,
    },
    /// Undo the most recent session.
    Undo,
}

/// Loads the configuration named by the flags and prepares it for a run.
///
/// Applies `--source` and `--no-log`, creates missing destination
/// directories, and warns about categories without a destination.
pub fn load_config(cli: &Cli) -> anyhow::Result<OrganizerConfig> {
    let mut config =
        OrganizerConfig::load(cli.config.as_deref()).context("Error loading configuration")?;

    if let Some(source) = &cli.source {
        config.source_dir = source.clone();
    }
    if cli.no_log {
        config.settings.log_sessions = false;
    }

    config
        .ensure_destinations()
        .context("Error creating destination directories")?;

    for category in config.unmapped_categories() {
        log::warn!(
            "Category '{}' has no destination; its files will be skipped",
            category
        );
    }

    Ok(config)
}

/// Runs a command against a prepared configuration.
///
/// # Examples
///
/// ```no_run
/// use filament::cli::{run_cli_with_config, OrganizeCommand};
/// use filament::config::OrganizerConfig;
///
/// let config = OrganizerConfig::load(None).unwrap();
/// if let Err(e) = run_cli_with_config(OrganizeCommand::Organize { dry_run: true }, config) {
///     eprintln!("Error: {:#}", e);
/// }
/// ```
pub fn run_cli_with_config(
    command: OrganizeCommand,
    config: OrganizerConfig,
) -> anyhow::Result<()> {
    let organizer = Organizer::new(config).context("Error compiling rules")?;

    match command {
        OrganizeCommand::Organize { dry_run } => organize(&organizer, dry_run),
        OrganizeCommand::Undo => undo(&organizer),
    }
}

fn organize(organizer: &Organizer, dry_run: bool) -> anyhow::Result<()> {
    OutputFormatter::info(&format!(
        "Scanning: {}",
        organizer.config().source_dir.display()
    ));
    if dry_run {
        OutputFormatter::dry_run_notice("No files will be moved.");
    }

    let mut reporter = ConsoleReporter::new(dry_run);
    let summary = organizer.organize_with(dry_run, &mut reporter)?;
    reporter.finish();

    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &Summary) {
    if !summary.per_category.is_empty() {
        OutputFormatter::header("SUMMARY");
        OutputFormatter::count_table("Category", &summary.per_category);
    }
    if !summary.skipped_by_reason.is_empty() {
        println!();
        OutputFormatter::count_table("Skipped", &summary.skipped_by_reason);
    }

    println!();
    OutputFormatter::results_line(
        summary.moved,
        summary.skipped,
        summary.errors,
        summary.dry_run,
    );

    if let Some(session) = &summary.session {
        OutputFormatter::plain(&format!("Log saved to {}", session.log_path.display()));
        OutputFormatter::plain("Run 'filament --undo' to revert this session.");
    }
    if let Some(e) = &summary.ledger_error {
        OutputFormatter::warning(&format!("Could not save session history: {}", e));
        OutputFormatter::warning("Undo will not be available for this run.");
    }
    if summary.dry_run {
        OutputFormatter::success("Dry run complete. No files were modified.");
    }
}

fn undo(organizer: &Organizer) -> anyhow::Result<()> {
    OutputFormatter::info("Undoing last session...");

    match organizer.undo() {
        Ok(report) => {
            print_undo_report(&report);
            Ok(())
        }
        Err(OrganizeError::UndoArtifactNotFound { .. }) => {
            OutputFormatter::warning("No undo files found. Nothing to undo.");
            Ok(())
        }
        Err(e) => Err(e).context("Undo failed"),
    }
}

fn print_undo_report(report: &UndoReport) {
    for item in &report.items {
        let line = OutputFormatter::restore_line(&item.destination, &item.original);
        match &item.outcome {
            UndoOutcome::Restored => OutputFormatter::success(&line),
            UndoOutcome::Skipped(reason) => {
                OutputFormatter::warning(&format!("{} ({})", line, reason))
            }
            UndoOutcome::Failed(reason) => OutputFormatter::error(&format!("{}: {}", line, reason)),
        }
    }

    OutputFormatter::header("UNDO COMPLETE");
    OutputFormatter::plain(&format!("  Session:  {}", report.session_id));
    OutputFormatter::plain(&format!("  Restored: {}", report.restored_files()));
    let skipped = report.skipped_files().len();
    if skipped > 0 {
        OutputFormatter::plain(&format!("  Skipped:  {}", skipped));
    }
    let failed = report.failed_restores().len();
    if failed > 0 {
        OutputFormatter::plain(&format!("  Failed:   {}", failed));
    }
}

/// Prints one line per file, with a progress bar during live runs.
struct ConsoleReporter {
    dry_run: bool,
    progress: Option<ProgressBar>,
}

impl ConsoleReporter {
    fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            progress: None,
        }
    }

    fn print(&self, print_line: impl FnOnce()) {
        match &self.progress {
            Some(pb) => pb.suspend(print_line),
            None => print_line(),
        }
    }

    fn finish(&mut self) {
        if let Some(pb) = self.progress.take() {
            pb.finish_and_clear();
        }
    }
}

impl RunObserver for ConsoleReporter {
    fn started(&mut self, total: usize) {
        if !self.dry_run && total > 0 {
            self.progress = Some(OutputFormatter::create_progress_bar(total as u64));
        }
    }

    fn file_processed(&mut self, outcome: &FileOutcome) {
        let name = &outcome.name;
        match &outcome.disposition {
            Disposition::WouldMove {
                destination,
                matched_by,
                ..
            } => self.print(|| {
                OutputFormatter::dry_run_notice(&format!(
                    "Move {} -> {} ({:?} rule)",
                    outcome.path.display(),
                    destination.display(),
                    matched_by
                ))
            }),
            Disposition::Moved {
                category,
                matched_by,
                ..
            } => self.print(|| OutputFormatter::moved(name, category, *matched_by)),
            Disposition::Skipped { reason, category } => {
                let reason = match category {
                    Some(category) => format!("{}: {}", reason, category),
                    None => reason.to_string(),
                };
                self.print(|| OutputFormatter::skipped(name, &reason))
            }
            Disposition::Failed(e) => {
                self.print(|| OutputFormatter::error(&format!("Error processing {}: {}", name, e)))
            }
        }

        if let Some(pb) = &self.progress {
            pb.inc(1);
        }
    }
}
