//! filament - a rule-driven downloads organizer
//!
//! This library classifies the files of a source directory by age, filename
//! keyword, or extension, moves them into configured destination
//! directories, and records every live session so it can be undone.

pub mod classifier;
pub mod cli;
pub mod config;
pub mod error;
pub mod ledger;
pub mod mover;
pub mod organizer;
pub mod output;
pub mod resolver;
pub mod undo;

pub use classifier::{ARCHIVE_CATEGORY, Classification, Classifier, FileEntry, MatchKind};
pub use config::{ConfigError, DuplicateStrategy, OrganizerConfig, RuleTable, Settings};
pub use error::{OrganizeError, OrganizeResult};
pub use ledger::{LedgerStore, SessionArtifacts, SessionLedger, UndoEntry, UndoMap};
pub use mover::{FileMover, MoveRecord};
pub use organizer::{Disposition, FileOutcome, Organizer, RunObserver, SkipReason, Summary};
pub use resolver::{DestinationResolver, Resolution};
pub use undo::{UndoManager, UndoOutcome, UndoReport};

pub use cli::{Cli, OrganizeCommand, load_config, run_cli_with_config};
