//! Undo functionality for reverting an organize session.
//!
//! Replays the most recent undo file, moving every file back from its
//! destination to the path it was taken from.
use crate::error::OrganizeResult;
use crate::ledger::{LedgerStore, UndoEntry};
use crate::mover::FileMover;
use std::fs;
use std::path::{Path, PathBuf};

/// What happened when restoring one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoOutcome {
    /// The file is back at its original path.
    Restored,
    /// Nothing to restore (e.g. the file is no longer at its destination).
    Skipped(String),
    /// Restoring failed.
    Failed(String),
}

/// One restore attempt.
#[derive(Debug, Clone)]
pub struct UndoItem {
    pub destination: PathBuf,
    pub original: PathBuf,
    pub outcome: UndoOutcome,
}

/// Represents the result of an undo operation.
#[derive(Debug)]
pub struct UndoReport {
    /// The session that was replayed.
    pub session_id: String,
    /// One item per entry of the undo file, in processing order.
    pub items: Vec<UndoItem>,
}

impl UndoReport {
    /// Number of files successfully restored.
    pub fn restored_files(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.outcome == UndoOutcome::Restored)
            .count()
    }

    /// Items that could not be restored, with the reason.
    pub fn failed_restores(&self) -> Vec<(&Path, &str)> {
        self.items
            .iter()
            .filter_map(|item| match &item.outcome {
                UndoOutcome::Failed(reason) => Some((item.destination.as_path(), reason.as_str())),
                _ => None,
            })
            .collect()
    }

    /// Items that were skipped, with the reason.
    pub fn skipped_files(&self) -> Vec<(&Path, &str)> {
        self.items
            .iter()
            .filter_map(|item| match &item.outcome {
                UndoOutcome::Skipped(reason) => Some((item.destination.as_path(), reason.as_str())),
                _ => None,
            })
            .collect()
    }

    /// Returns the total number of entries processed.
    pub fn total_processed(&self) -> usize {
        self.items.len()
    }

    /// Returns true if every file was restored.
    pub fn is_complete_success(&self) -> bool {
        self.items
            .iter()
            .all(|item| item.outcome == UndoOutcome::Restored)
    }
}

/// Manages undo operations for organize sessions.
pub struct UndoManager;

impl UndoManager {
    /// Undoes the most recent recorded session.
    ///
    /// Entries are processed in reverse order. A failure on one entry does
    /// not stop the others. The undo file itself is left in place, so a
    /// second undo replays the same session again; entries already restored
    /// then show up as skipped.
    ///
    /// # Edge Cases Handled
    ///
    /// * **File not at destination**: Skipped with a note that the file couldn't be found
    /// * **File name conflict**: The conflicting file is backed up with a timestamp suffix
    /// * **Missing original directory**: Recreated before the file is moved back
    /// * **Permission denied**: Recorded as a failure with the error reason
    ///
    /// # Errors
    ///
    /// Returns `OrganizeError::UndoArtifactNotFound` if no session was ever
    /// recorded, or a read/format error if the latest undo file is unusable.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use filament::ledger::LedgerStore;
    /// use filament::undo::UndoManager;
    ///
    /// let store = LedgerStore::new("logs".into(), "undo".into());
    /// match UndoManager::undo(&store) {
    ///     Ok(report) => println!("Restored {} files", report.restored_files()),
    ///     Err(e) => eprintln!("Undo failed: {}", e),
    /// }
    /// ```
    pub fn undo(store: &LedgerStore) -> OrganizeResult<UndoReport> {
        let undo_map = store.load_latest()?;

        let items = undo_map
            .entries
            .iter()
            .rev()
            .map(|entry| {
                let outcome = Self::restore_file(entry);
                match &outcome {
                    UndoOutcome::Restored => log::debug!(
                        "Restored {} -> {}",
                        entry.destination.display(),
                        entry.original.display()
                    ),
                    UndoOutcome::Skipped(reason) | UndoOutcome::Failed(reason) => {
                        log::warn!("Could not restore {}: {}", entry.destination.display(), reason)
                    }
                }
                UndoItem {
                    destination: entry.destination.clone(),
                    original: entry.original.clone(),
                    outcome,
                }
            })
            .collect();

        Ok(UndoReport {
            session_id: undo_map.session_id,
            items,
        })
    }

    /// Restores a single file to its original location.
    fn restore_file(entry: &UndoEntry) -> UndoOutcome {
        if !entry.destination.exists() {
            return UndoOutcome::Skipped("File not found at expected location".to_string());
        }

        if entry.original.exists() {
            let backup_path = Self::generate_backup_path(&entry.original);
            if let Err(e) = fs::rename(&entry.original, &backup_path) {
                return UndoOutcome::Failed(format!("Could not backup conflicting file: {}", e));
            }
        }

        match FileMover::relocate(&entry.destination, &entry.original) {
            Ok(()) => UndoOutcome::Restored,
            Err(e) => UndoOutcome::Failed(format!("Failed to restore file: {}", e)),
        }
    }

    /// Generates a backup path for a file by appending a timestamp.
    ///
    /// Example: `file.txt` becomes `file.txt.bak.20251109-143052`
    fn generate_backup_path(original_path: &Path) -> PathBuf {
        let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
        let filename = original_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("file");

        original_path.with_file_name(format!("{}.bak.{}", filename, timestamp))
    }
}
