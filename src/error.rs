//! Errors raised while organizing a directory or replaying an undo session.
//!
//! Only a handful of these stop a run: a missing source directory aborts
//! `organize`, and a missing or unreadable undo artifact aborts `undo`.
//! Everything that happens to a single file is captured in the run summary
//! instead (see [`crate::organizer::FileOutcome`]).

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during organization and undo operations.
#[derive(Error, Debug)]
pub enum OrganizeError {
    /// The directory to organize does not exist or is not a directory.
    #[error("Source directory not found: {}", .path.display())]
    SourceDirMissing { path: PathBuf },

    /// Failed to list the source directory.
    #[error("Failed to read directory {}: {source}", .path.display())]
    DirectoryReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create a destination (or restore) directory.
    #[error("Failed to create directory {}: {source}", .path.display())]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to read a file's metadata while taking the snapshot.
    #[error("Failed to read metadata for {}: {source}", .path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to move a file to its destination.
    #[error("Failed to move {} to {}: {cause}", .source_path.display(), .destination.display())]
    MoveFailed {
        source_path: PathBuf,
        destination: PathBuf,
        #[source]
        cause: std::io::Error,
    },

    /// Failed to write a session artifact.
    #[error("Failed to write session artifact {}: {source}", .path.display())]
    LedgerWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to read a session artifact.
    #[error("Failed to read session artifact {}: {source}", .path.display())]
    LedgerRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The undo artifact exists but could not be understood.
    #[error("Invalid undo file {}: {reason}", .path.display())]
    InvalidUndoArtifact { path: PathBuf, reason: String },

    /// No previous session was recorded.
    #[error("No undo files found in {}", .dir.display())]
    UndoArtifactNotFound { dir: PathBuf },
}

/// Result type for organization operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;
