//! File movement with undo records.
//!
//! This module moves a single file to an already-resolved destination and
//! describes what it did, so the move can be logged and later reversed.

use crate::error::{OrganizeError, OrganizeResult};
use std::ffi::OsString;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

/// Represents a single completed move.
///
/// Records both ends of the move so the ledger can write the log line and
/// the undo entry (`destination -> source`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRecord {
    /// Where the file was before the move.
    pub source: PathBuf,
    /// Where the file is now.
    pub destination: PathBuf,
    /// The category the file was filed under.
    pub category: String,
}

impl MoveRecord {
    /// The human-readable log line for this move.
    pub fn description(&self) -> String {
        format!(
            "Moved {} -> {}",
            self.source.display(),
            self.destination.display()
        )
    }
}

/// Moves files between directories.
pub struct FileMover;

impl FileMover {
    /// Moves `source` to `destination` and records the operation.
    ///
    /// The destination's parent directory is created if it doesn't exist.
    /// An existing file at `destination` is replaced; callers decide
    /// beforehand whether that is acceptable.
    ///
    /// # Errors
    ///
    /// Returns `OrganizeError::DirectoryCreationFailed` if the parent cannot
    /// be created, or `OrganizeError::MoveFailed` carrying the source path
    /// and the underlying IO error.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use filament::mover::FileMover;
    /// use std::path::Path;
    ///
    /// let result = FileMover::move_file(
    ///     Path::new("/home/me/Downloads/report.pdf"),
    ///     Path::new("/home/me/Documents/report.pdf"),
    ///     "documents",
    /// );
    ///
    /// match result {
    ///     Ok(record) => println!("{}", record.description()),
    ///     Err(e) => eprintln!("Move failed: {}", e),
    /// }
    /// ```
    pub fn move_file(
        source: &Path,
        destination: &Path,
        category: &str,
    ) -> OrganizeResult<MoveRecord> {
        Self::relocate(source, destination)?;

        Ok(MoveRecord {
            source: source.to_path_buf(),
            destination: destination.to_path_buf(),
            category: category.to_string(),
        })
    }

    /// Renames `from` to `to`, creating `to`'s parent directory first.
    ///
    /// Falls back to copy + remove when the two paths are on different
    /// filesystems.
    pub fn relocate(from: &Path, to: &Path) -> OrganizeResult<()> {
        if let Some(parent) = to.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).map_err(|e| OrganizeError::DirectoryCreationFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let moved = match fs::rename(from, to) {
            Err(e) if e.kind() == ErrorKind::CrossesDevices => {
                log::debug!(
                    "Rename across filesystems, copying {} to {}",
                    from.display(),
                    to.display()
                );
                copy_across(from, to)
            }
            other => other,
        };

        moved.map_err(|e| OrganizeError::MoveFailed {
            source_path: from.to_path_buf(),
            destination: to.to_path_buf(),
            cause: e,
        })
    }
}

/// Copies `from` to `to` through a staging file, then removes `from`.
///
/// On failure nothing is left at `to` that was not there before, except
/// when the source cannot be removed: then the finished copy is deleted
/// again so the file exists only at `from`.
fn copy_across(from: &Path, to: &Path) -> io::Result<()> {
    let staging = staging_path(to);
    if let Err(e) = fs::copy(from, &staging).and_then(|_| fs::rename(&staging, to)) {
        discard(&staging);
        return Err(e);
    }
    if let Err(e) = fs::remove_file(from) {
        discard(to);
        return Err(e);
    }
    Ok(())
}

fn staging_path(to: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(to.file_name().unwrap_or_default());
    name.push(".partial");
    to.with_file_name(name)
}

fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path)
        && e.kind() != ErrorKind::NotFound
    {
        log::warn!("Could not remove {}: {}", path.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_move_file_creates_parent_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = temp_dir.path().join("test.txt");
        fs::write(&source, "test content").expect("Failed to write test file");
        let destination = temp_dir.path().join("documents").join("2024").join("test.txt");

        let record =
            FileMover::move_file(&source, &destination, "documents").expect("Failed to move file");

        assert!(!source.exists());
        assert!(destination.exists());
        assert_eq!(record.source, source);
        assert_eq!(record.destination, destination);
        assert_eq!(record.category, "documents");
    }

    #[test]
    fn test_move_file_into_existing_directory() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let images = temp_dir.path().join("images");
        fs::create_dir(&images).expect("Failed to create category directory");
        let source = temp_dir.path().join("test.png");
        fs::write(&source, "png").expect("Failed to write test file");

        FileMover::move_file(&source, &images.join("test.png"), "images")
            .expect("Failed to move file");

        assert!(!source.exists());
        assert_eq!(fs::read_to_string(images.join("test.png")).unwrap(), "png");
    }

    #[test]
    fn test_move_file_replaces_existing_destination() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = temp_dir.path().join("a.txt");
        let destination = temp_dir.path().join("b.txt");
        fs::write(&source, "new").unwrap();
        fs::write(&destination, "old").unwrap();

        FileMover::move_file(&source, &destination, "documents").unwrap();
        assert_eq!(fs::read_to_string(&destination).unwrap(), "new");
    }

    #[test]
    fn test_move_missing_source_fails() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = temp_dir.path().join("vanished.txt");
        let destination = temp_dir.path().join("documents").join("vanished.txt");

        let err = FileMover::move_file(&source, &destination, "documents").unwrap_err();
        match err {
            OrganizeError::MoveFailed {
                source_path, cause, ..
            } => {
                assert_eq!(source_path, source);
                assert_eq!(cause.kind(), ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_description_format() {
        let record = MoveRecord {
            source: PathBuf::from("/dl/report.pdf"),
            destination: PathBuf::from("/docs/report.pdf"),
            category: "documents".to_string(),
        };
        assert_eq!(record.description(), "Moved /dl/report.pdf -> /docs/report.pdf");
    }

    #[test]
    fn test_copy_across_moves_content() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = temp_dir.path().join("a.pdf");
        let destination = temp_dir.path().join("b.pdf");
        fs::write(&source, "content").unwrap();

        copy_across(&source, &destination).unwrap();

        assert!(!source.exists());
        assert_eq!(fs::read_to_string(&destination).unwrap(), "content");
        assert!(!staging_path(&destination).exists());
    }

    #[test]
    fn test_failed_copy_leaves_destination_untouched() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = temp_dir.path().join("gone.pdf");
        let destination = temp_dir.path().join("b.pdf");
        fs::write(&destination, "existing").unwrap();

        assert!(copy_across(&source, &destination).is_err());
        assert_eq!(fs::read_to_string(&destination).unwrap(), "existing");
        assert!(!staging_path(&destination).exists());
    }

    #[test]
    fn test_staging_path_is_hidden_sibling() {
        assert_eq!(
            staging_path(Path::new("/docs/report.pdf")),
            PathBuf::from("/docs/.report.pdf.partial")
        );
    }
}
