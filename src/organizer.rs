//! Run orchestration.
//!
//! [`Organizer`] drives one pass over the source directory: every file is
//! screened (ignore patterns, hidden files), classified, given a
//! destination, and then either moved or just reported. A file-level
//! problem never stops the pass; it is recorded in the [`Summary`] and the
//! next file is processed. Live runs write their session ledger once, after
//! the last file.

use crate::classifier::{Classifier, FileEntry, MatchKind};
use crate::config::{ConfigError, OrganizerConfig};
use crate::error::{OrganizeError, OrganizeResult};
use crate::ledger::{LedgerStore, SessionArtifacts, SessionLedger};
use crate::mover::FileMover;
use crate::resolver::{DestinationResolver, Resolution};
use crate::undo::{UndoManager, UndoReport};
use chrono::{DateTime, Local};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Why a file was left in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SkipReason {
    /// Matched an ignore pattern.
    Ignored,
    /// Dot-file.
    Hidden,
    /// No rule matched.
    Uncategorized,
    /// The category has no destination.
    DestinationUnresolved,
    /// The destination exists and the duplicate strategy is `skip`.
    DuplicateSkipped,
    /// The path is not valid UTF-8 and could not be recorded for undo.
    UnrepresentableName,
}

impl SkipReason {
    pub fn label(&self) -> &'static str {
        match self {
            SkipReason::Ignored => "ignored",
            SkipReason::Hidden => "hidden",
            SkipReason::Uncategorized => "unknown type",
            SkipReason::DestinationUnresolved => "no destination",
            SkipReason::DuplicateSkipped => "duplicate",
            SkipReason::UnrepresentableName => "non-UTF-8 name",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What happened to a single file.
#[derive(Debug)]
pub enum Disposition {
    /// The file was moved.
    Moved {
        category: String,
        matched_by: MatchKind,
        destination: PathBuf,
    },
    /// Dry run: the file would have been moved.
    WouldMove {
        category: String,
        matched_by: MatchKind,
        destination: PathBuf,
    },
    /// The file was left where it is.
    Skipped {
        reason: SkipReason,
        category: Option<String>,
    },
    /// Processing the file failed.
    Failed(OrganizeError),
}

/// The result of processing one file.
#[derive(Debug)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub name: String,
    pub disposition: Disposition,
}

/// Aggregate counts for one run.
#[derive(Debug, Default)]
pub struct Summary {
    pub dry_run: bool,
    /// Files moved (or, in a dry run, that would be moved).
    pub moved: usize,
    pub skipped: usize,
    pub errors: usize,
    /// Moved files per category.
    pub per_category: BTreeMap<String, usize>,
    pub skipped_by_reason: BTreeMap<SkipReason, usize>,
    /// Files written for this session, if any.
    pub session: Option<SessionArtifacts>,
    /// Set when the session ledger could not be written.
    pub ledger_error: Option<OrganizeError>,
}

impl Summary {
    fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            ..Default::default()
        }
    }

    fn record(&mut self, outcome: &FileOutcome) {
        match &outcome.disposition {
            Disposition::Moved { category, .. } | Disposition::WouldMove { category, .. } => {
                self.moved += 1;
                *self.per_category.entry(category.clone()).or_insert(0) += 1;
            }
            Disposition::Skipped { reason, .. } => {
                self.skipped += 1;
                *self.skipped_by_reason.entry(*reason).or_insert(0) += 1;
            }
            Disposition::Failed(_) => self.errors += 1,
        }
    }

    /// Number of files skipped for `reason`.
    pub fn skipped_for(&self, reason: SkipReason) -> usize {
        self.skipped_by_reason.get(&reason).copied().unwrap_or(0)
    }
}

/// Receives progress while a run is in progress.
pub trait RunObserver {
    /// Called once with the number of files in the snapshot.
    fn started(&mut self, _total: usize) {}

    /// Called after each file is processed.
    fn file_processed(&mut self, outcome: &FileOutcome);
}

impl RunObserver for () {
    fn file_processed(&mut self, _outcome: &FileOutcome) {}
}

/// Organizes a source directory according to a configuration.
///
/// All state is built from the configuration passed to [`Organizer::new`];
/// nothing carries over between runs except the files on disk.
#[derive(Debug)]
pub struct Organizer {
    config: OrganizerConfig,
    classifier: Classifier,
    resolver: DestinationResolver,
    store: LedgerStore,
}

impl Organizer {
    /// Compiles the configuration's rules.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if an ignore pattern is invalid.
    pub fn new(config: OrganizerConfig) -> Result<Self, ConfigError> {
        let classifier = Classifier::new(&config)?;
        let resolver = DestinationResolver::from_config(&config);
        let store = LedgerStore::from_config(&config);

        Ok(Self {
            config,
            classifier,
            resolver,
            store,
        })
    }

    pub fn config(&self) -> &OrganizerConfig {
        &self.config
    }

    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    /// Organizes the source directory without progress reporting.
    pub fn organize(&self, dry_run: bool) -> OrganizeResult<Summary> {
        self.organize_with(dry_run, &mut ())
    }

    /// Organizes the source directory, reporting each file to `observer`.
    ///
    /// A dry run classifies and resolves every file but moves nothing and
    /// writes no session files.
    ///
    /// # Errors
    ///
    /// Only fails if the source directory is missing or cannot be listed.
    pub fn organize_with(
        &self,
        dry_run: bool,
        observer: &mut dyn RunObserver,
    ) -> OrganizeResult<Summary> {
        let files = self.snapshot()?;
        let now = Local::now();
        let mut ledger = SessionLedger::new();
        let mut summary = Summary::new(dry_run);

        log::debug!(
            "Scanning {} ({} files, dry run: {})",
            self.config.source_dir.display(),
            files.len(),
            dry_run
        );
        observer.started(files.len());

        for path in files {
            let outcome = self.process(&path, now, dry_run, &mut ledger);
            summary.record(&outcome);
            observer.file_processed(&outcome);
        }

        if !dry_run && self.config.settings.log_sessions {
            match self.store.flush(&ledger) {
                Ok(artifacts) => summary.session = artifacts,
                Err(e) => {
                    log::warn!("Session {} not recorded: {}", ledger.session_id(), e);
                    summary.ledger_error = Some(e);
                }
            }
        }

        Ok(summary)
    }

    /// Reverses the most recent recorded session.
    pub fn undo(&self) -> OrganizeResult<UndoReport> {
        UndoManager::undo(&self.store)
    }

    /// Lists the regular files in the source directory, sorted by name.
    fn snapshot(&self) -> OrganizeResult<Vec<PathBuf>> {
        let source_dir = &self.config.source_dir;
        if !source_dir.is_dir() {
            return Err(OrganizeError::SourceDirMissing {
                path: source_dir.clone(),
            });
        }

        let entries = fs::read_dir(source_dir).map_err(|e| OrganizeError::DirectoryReadFailed {
            path: source_dir.clone(),
            source: e,
        })?;

        let mut files: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        files.sort();
        Ok(files)
    }

    fn process(
        &self,
        path: &Path,
        now: DateTime<Local>,
        dry_run: bool,
        ledger: &mut SessionLedger,
    ) -> FileOutcome {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let disposition = self.dispose(path, &name, now, dry_run, ledger);

        log::debug!("{}: {:?}", name, disposition);
        FileOutcome {
            path: path.to_path_buf(),
            name,
            disposition,
        }
    }

    fn dispose(
        &self,
        path: &Path,
        name: &str,
        now: DateTime<Local>,
        dry_run: bool,
        ledger: &mut SessionLedger,
    ) -> Disposition {
        let skipped = |reason: SkipReason, category: Option<String>| Disposition::Skipped {
            reason,
            category,
        };

        if self.classifier.is_ignored(name) {
            return skipped(SkipReason::Ignored, None);
        }
        if Classifier::is_hidden(name) {
            return skipped(SkipReason::Hidden, None);
        }
        // Undo files store paths as JSON strings.
        if path.to_str().is_none() {
            log::warn!("Leaving {} in place: name is not valid UTF-8", path.display());
            return skipped(SkipReason::UnrepresentableName, None);
        }

        let Some(file_name) = path.file_name() else {
            return skipped(SkipReason::UnrepresentableName, None);
        };
        let entry = match FileEntry::from_path(path) {
            Ok(entry) => entry,
            Err(e) => return Disposition::Failed(e),
        };
        let Some(class) = self.classifier.classify(&entry, now) else {
            return skipped(SkipReason::Uncategorized, None);
        };

        let destination = match self.resolver.resolve(&class.category, file_name) {
            Resolution::Target(destination) => destination,
            Resolution::Unresolved => {
                return skipped(SkipReason::DestinationUnresolved, Some(class.category));
            }
            Resolution::DuplicateSkipped(_) => {
                return skipped(SkipReason::DuplicateSkipped, Some(class.category));
            }
        };

        if dry_run {
            return Disposition::WouldMove {
                category: class.category,
                matched_by: class.matched_by,
                destination,
            };
        }

        match FileMover::move_file(path, &destination, &class.category) {
            Ok(record) => {
                ledger.append(record);
                Disposition::Moved {
                    category: class.category,
                    matched_by: class.matched_by,
                    destination,
                }
            }
            Err(e) => {
                log::warn!("{}", e);
                Disposition::Failed(e)
            }
        }
    }
}
