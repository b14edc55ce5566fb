//! Rule-based file classification.
//!
//! A file is assigned to at most one category. Rules are checked in a fixed
//! order and the first match wins:
//!
//! 1. Age: with archiving enabled, files older than `archive_days` whole days
//!    go to the reserved [`ARCHIVE_CATEGORY`], whatever else they match.
//! 2. Keywords (`[smart_rules]`): a case-insensitive substring of the name.
//! 3. Extensions (`[rules]`): `*.ext` patterns against the lowercased extension.
//!
//! Within steps 2 and 3 categories are tried in configured order.
//!
//! # Examples
//!
//! ```
//! use chrono::Local;
//! use filament::classifier::{Classifier, FileEntry, MatchKind};
//! use filament::config::OrganizerConfig;
//!
//! let config = OrganizerConfig::from_toml_str(r#"
//! [rules]
//! images = ["*.png"]
//! [smart_rules]
//! finance = ["invoice"]
//! "#).unwrap();
//! let classifier = Classifier::new(&config).unwrap();
//!
//! let now = Local::now();
//! let entry = FileEntry::new("invoice_client.png".into(), now);
//! let class = classifier.classify(&entry, now).unwrap();
//! assert_eq!(class.category, "finance");
//! assert_eq!(class.matched_by, MatchKind::Keyword);
//! ```

use crate::config::{ConfigError, OrganizerConfig};
use crate::error::{OrganizeError, OrganizeResult};
use chrono::{DateTime, Local};
use glob::Pattern;
use std::fs;
use std::path::{Path, PathBuf};

/// Category that age-based archiving assigns.
pub const ARCHIVE_CATEGORY: &str = "old";

/// Names starting with this character are hidden and never organized.
const HIDDEN_PREFIX: char = '.';

/// A file found in the source directory.
#[derive(Debug, Clone)]
pub struct FileEntry {
    /// Full path to the file.
    pub path: PathBuf,
    /// File name component.
    pub name: String,
    /// Lowercased extension without the dot, if any.
    pub extension: Option<String>,
    /// Last modification time.
    pub modified: DateTime<Local>,
}

impl FileEntry {
    /// Builds an entry from a path and a known modification time.
    pub fn new(path: PathBuf, modified: DateTime<Local>) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase());

        Self {
            path,
            name,
            extension,
            modified,
        }
    }

    /// Builds an entry by reading the file's metadata.
    pub fn from_path(path: &Path) -> OrganizeResult<Self> {
        let modified = fs::metadata(path)
            .and_then(|meta| meta.modified())
            .map_err(|e| OrganizeError::Metadata {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(Self::new(path.to_path_buf(), DateTime::<Local>::from(modified)))
    }

    /// Age in whole days relative to `now`. Negative for future timestamps.
    pub fn age_days(&self, now: DateTime<Local>) -> i64 {
        (now - self.modified).num_days()
    }
}

/// Which rule produced a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    /// The file was older than the archive threshold.
    Age,
    /// A smart-rule keyword appeared in the name.
    Keyword,
    /// The extension matched a `*.ext` pattern.
    Extension,
}

/// The category a file belongs to and how it was determined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub category: String,
    pub matched_by: MatchKind,
}

impl Classification {
    fn new(category: &str, matched_by: MatchKind) -> Self {
        Self {
            category: category.to_string(),
            matched_by,
        }
    }
}

/// Compiled classification rules.
#[derive(Debug, Clone)]
pub struct Classifier {
    archive_days: u32,
    keyword_rules: Vec<(String, Vec<String>)>,
    extension_rules: Vec<(String, Vec<String>)>,
    ignore_patterns: Vec<Pattern>,
}

impl Classifier {
    /// Compiles the rule tables of a configuration.
    ///
    /// Extension patterns other than `*.ext` and empty keywords can never
    /// match anything useful; they are dropped with a warning.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidGlobPattern` if an ignore pattern does
    /// not compile.
    pub fn new(config: &OrganizerConfig) -> Result<Self, ConfigError> {
        let keyword_rules = config
            .smart_rules
            .iter()
            .map(|(category, keywords)| {
                let keywords = keywords
                    .iter()
                    .filter_map(|keyword| {
                        if keyword.is_empty() {
                            log::warn!("Ignoring empty keyword in smart rule '{}'", category);
                            None
                        } else {
                            Some(keyword.to_lowercase())
                        }
                    })
                    .collect();
                (category.to_string(), keywords)
            })
            .collect();

        let extension_rules = config
            .rules
            .iter()
            .map(|(category, patterns)| {
                let extensions = patterns
                    .iter()
                    .filter_map(|pattern| {
                        let ext = extension_of(pattern);
                        if ext.is_none() {
                            log::warn!(
                                "Ignoring rule pattern '{}' for '{}': expected *.ext",
                                pattern,
                                category
                            );
                        }
                        ext
                    })
                    .collect();
                (category.to_string(), extensions)
            })
            .collect();

        let ignore_patterns = config
            .settings
            .ignore_patterns
            .iter()
            .map(|pattern| {
                Pattern::new(pattern).map_err(|e| ConfigError::InvalidGlobPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            archive_days: config.settings.archive_days,
            keyword_rules,
            extension_rules,
            ignore_patterns,
        })
    }

    /// True if the name matches any configured ignore pattern.
    pub fn is_ignored(&self, file_name: &str) -> bool {
        self.ignore_patterns
            .iter()
            .any(|pattern| pattern.matches(file_name))
    }

    /// True for dot-files.
    pub fn is_hidden(file_name: &str) -> bool {
        file_name.starts_with(HIDDEN_PREFIX)
    }

    /// Assigns a category to a file, or `None` if no rule matches.
    ///
    /// Ignore patterns and hidden files are not considered here; callers
    /// screen those out first.
    pub fn classify(&self, entry: &FileEntry, now: DateTime<Local>) -> Option<Classification> {
        if self.is_archivable(entry, now) {
            return Some(Classification::new(ARCHIVE_CATEGORY, MatchKind::Age));
        }

        self.match_keyword(&entry.name)
            .map(|category| Classification::new(category, MatchKind::Keyword))
            .or_else(|| {
                self.match_extension(entry.extension.as_deref())
                    .map(|category| Classification::new(category, MatchKind::Extension))
            })
    }

    fn is_archivable(&self, entry: &FileEntry, now: DateTime<Local>) -> bool {
        self.archive_days > 0 && entry.age_days(now) > i64::from(self.archive_days)
    }

    fn match_keyword(&self, file_name: &str) -> Option<&str> {
        let name = file_name.to_lowercase();
        self.keyword_rules
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| name.contains(k.as_str())))
            .map(|(category, _)| category.as_str())
    }

    fn match_extension(&self, extension: Option<&str>) -> Option<&str> {
        let extension = extension?;
        self.extension_rules
            .iter()
            .find(|(_, extensions)| extensions.iter().any(|e| e == extension))
            .map(|(category, _)| category.as_str())
    }
}

/// Extracts `ext` from a `*.ext` pattern, lowercased.
fn extension_of(pattern: &str) -> Option<String> {
    let ext = pattern.strip_prefix("*.")?;
    let is_plain = !ext.is_empty()
        && !ext
            .chars()
            .any(|c| matches!(c, '*' | '?' | '[' | ']' | '{' | '}' | '.' | '/' | '\\'));
    is_plain.then(|| ext.to_lowercase())
}
