//! Destination resolution and duplicate handling.
//!
//! Maps a category to its destination directory and decides what to do when
//! a file of the same name is already there.

use crate::config::{DuplicateStrategy, OrganizerConfig};
use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// Outcome of resolving where a file should go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Move the file to this path.
    Target(PathBuf),
    /// The category has no configured destination.
    Unresolved,
    /// A file already exists there and the strategy is `skip`.
    DuplicateSkipped(PathBuf),
}

/// Resolves destination paths for categorized files.
#[derive(Debug, Clone)]
pub struct DestinationResolver {
    destinations: BTreeMap<String, PathBuf>,
    strategy: DuplicateStrategy,
}

impl DestinationResolver {
    pub fn new(destinations: BTreeMap<String, PathBuf>, strategy: DuplicateStrategy) -> Self {
        Self {
            destinations,
            strategy,
        }
    }

    pub fn from_config(config: &OrganizerConfig) -> Self {
        Self::new(
            config.destinations.clone(),
            config.settings.duplicate_strategy,
        )
    }

    /// Computes the destination for `file_name` in `category`.
    ///
    /// The returned target never names an existing file unless the strategy
    /// is `overwrite`.
    pub fn resolve(&self, category: &str, file_name: impl AsRef<OsStr>) -> Resolution {
        let Some(dir) = self.destinations.get(category) else {
            return Resolution::Unresolved;
        };

        let candidate = dir.join(file_name.as_ref());
        if !candidate.exists() {
            return Resolution::Target(candidate);
        }

        match self.strategy {
            DuplicateStrategy::Overwrite => Resolution::Target(candidate),
            DuplicateStrategy::Skip => Resolution::DuplicateSkipped(candidate),
            DuplicateStrategy::Rename => Resolution::Target(unique_destination(&candidate)),
        }
    }
}

/// Returns the first `stem_N.ext` (N = 1, 2, ...) next to `path` that does
/// not exist.
///
/// Example: `photo.jpg` becomes `photo_1.jpg`, then `photo_2.jpg`.
pub fn unique_destination(path: &Path) -> PathBuf {
    let stem = path.file_stem().unwrap_or_default();
    let extension = path.extension();

    let mut counter: u64 = 1;
    loop {
        let mut name = OsString::from(stem);
        name.push(format!("_{}", counter));
        if let Some(extension) = extension {
            name.push(".");
            name.push(extension);
        }

        let candidate = path.with_file_name(name);
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}
