//! Organizer configuration.
//!
//! Configuration is a TOML document describing which categories exist, how
//! files are matched to them, and where each category's files go:
//!
//! ```toml
//! source_dir = "~/Downloads"
//! data_dir = "~/downloads_organizer"
//!
//! [rules]
//! documents = ["*.pdf", "*.docx"]
//! images = ["*.png", "*.jpg"]
//!
//! [smart_rules]
//! finance = ["invoice", "receipt"]
//!
//! [destinations]
//! documents = "~/Documents/Downloads"
//! images = "~/Pictures/Downloads"
//! finance = "~/Documents/Finance"
//! old = "~/Archive"
//!
//! [settings]
//! archive_days = 30
//! duplicate_strategy = "rename"
//! ignore_patterns = ["*.part", "*.crdownload"]
//! ```
//!
//! The order of categories inside `[rules]` and `[smart_rules]` is kept as
//! written; the first matching category wins.

use crate::classifier::ARCHIVE_CATEGORY;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the configuration file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "filament.toml";

/// Errors that can occur during configuration loading and rule compilation.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// An explicitly requested configuration file does not exist.
    #[error("Configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// None of the default configuration locations held a file.
    #[error("No configuration file found (looked in {})", display_paths(.searched))]
    NoConfigFile { searched: Vec<PathBuf> },

    /// Invalid TOML syntax or structure.
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    /// An ignore pattern is not a valid glob.
    #[error("Invalid glob pattern '{pattern}': {reason}")]
    InvalidGlobPattern { pattern: String, reason: String },

    /// IO error while reading configuration or preparing directories.
    #[error("IO error for {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Policy applied when a computed destination path already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateStrategy {
    /// Append `_N` before the extension until the name is free.
    #[default]
    Rename,
    /// Replace the existing file.
    Overwrite,
    /// Leave the source file where it is.
    Skip,
}

/// An ordered table of category name to string entries.
///
/// Used for both extension rules (`*.pdf`) and keyword rules (`invoice`).
/// Iteration follows document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleTable(Vec<(String, Vec<String>)>);

impl RuleTable {
    /// Creates an empty rule table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a category with its entries, returning the table.
    pub fn with<I, S>(mut self, category: &str, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0.push((
            category.to_string(),
            entries.into_iter().map(Into::into).collect(),
        ));
        self
    }

    /// Iterates categories in configured order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(c, e)| (c.as_str(), e.as_slice()))
    }

    /// Category names in configured order.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(c, _)| c.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for RuleTable {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct RuleTableVisitor;

        impl<'de> Visitor<'de> for RuleTableVisitor {
            type Value = RuleTable;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a table mapping category names to lists of strings")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::new();
                while let Some((category, values)) = map.next_entry::<String, Vec<String>>()? {
                    entries.push((category, values));
                }
                Ok(RuleTable(entries))
            }
        }

        deserializer.deserialize_map(RuleTableVisitor)
    }
}

/// Behavioural settings from the `[settings]` table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Files older than this many whole days go to the `old` category. 0 disables.
    pub archive_days: u32,
    /// What to do when the destination already holds a file of the same name.
    pub duplicate_strategy: DuplicateStrategy,
    /// Glob patterns matched against file names; matches are left alone.
    pub ignore_patterns: Vec<String>,
    /// Whether live runs write a session log and undo file.
    pub log_sessions: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            archive_days: 0,
            duplicate_strategy: DuplicateStrategy::Rename,
            ignore_patterns: Vec::new(),
            log_sessions: true,
        }
    }
}

/// Configuration as written in the file, before path expansion.
#[derive(Debug, Deserialize)]
struct RawConfig {
    source_dir: Option<String>,
    data_dir: Option<String>,
    #[serde(default)]
    rules: RuleTable,
    #[serde(default)]
    smart_rules: RuleTable,
    #[serde(default)]
    destinations: BTreeMap<String, String>,
    #[serde(default)]
    settings: Settings,
}

/// Fully resolved organizer configuration.
///
/// All paths are expanded; nothing here is read from the environment after
/// construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizerConfig {
    /// Directory whose top-level files are organized.
    pub source_dir: PathBuf,
    /// Directory holding `logs/` and `undo/`.
    pub data_dir: PathBuf,
    /// Extension rules, category -> `*.ext` patterns.
    pub rules: RuleTable,
    /// Keyword rules, category -> keywords.
    pub smart_rules: RuleTable,
    /// Category -> destination directory.
    pub destinations: BTreeMap<String, PathBuf>,
    pub settings: Settings,
}

impl OrganizerConfig {
    /// Load configuration from a file.
    ///
    /// Looks in the following order:
    /// 1. `config_path`, if provided
    /// 2. `filament.toml` in the current directory
    /// 3. `filament/config.toml` in the platform config directory
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ConfigNotFound` or `ConfigError::NoConfigFile`
    /// if there is nothing to load, and `ConfigError::ConfigInvalid` if the
    /// document does not parse.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let mut searched = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
        if let Some(config_dir) = dirs::config_dir() {
            searched.push(config_dir.join("filament").join("config.toml"));
        }

        match searched.iter().find(|p| p.exists()) {
            Some(path) => Self::load_from_file(path),
            None => Err(ConfigError::NoConfigFile { searched }),
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        log::debug!("Loaded configuration from {}", path.display());
        Self::from_toml_str(&content)
    }

    /// Parse a configuration document, expanding `~` in every path.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig =
            toml::from_str(content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))?;

        let source_dir = match raw.source_dir {
            Some(dir) => expand_home(&dir),
            None => default_source_dir(),
        };
        let data_dir = match raw.data_dir {
            Some(dir) => expand_home(&dir),
            None => default_data_dir(),
        };
        let destinations = raw
            .destinations
            .into_iter()
            .map(|(category, dir)| (category, expand_home(&dir)))
            .collect();

        Ok(Self {
            source_dir,
            data_dir,
            rules: raw.rules,
            smart_rules: raw.smart_rules,
            destinations,
            settings: raw.settings,
        })
    }

    /// Directory for plain-text session logs.
    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    /// Directory for undo files.
    pub fn undo_dir(&self) -> PathBuf {
        self.data_dir.join("undo")
    }

    /// Creates every configured destination directory that does not exist yet.
    pub fn ensure_destinations(&self) -> Result<(), ConfigError> {
        for dir in self.destinations.values() {
            fs::create_dir_all(dir).map_err(|e| ConfigError::Io {
                path: dir.clone(),
                source: e,
            })?;
        }
        Ok(())
    }

    /// Categories that rules can produce but that have no destination.
    ///
    /// Files classified into one of these are skipped at run time.
    pub fn unmapped_categories(&self) -> Vec<String> {
        let mut referenced: Vec<&str> = self
            .smart_rules
            .categories()
            .chain(self.rules.categories())
            .collect();
        if self.settings.archive_days > 0 {
            referenced.push(ARCHIVE_CATEGORY);
        }

        let mut missing: Vec<String> = referenced
            .into_iter()
            .filter(|c| !self.destinations.contains_key(*c))
            .map(str::to_string)
            .collect();
        missing.sort();
        missing.dedup();
        missing
    }
}

/// Expands a leading `~` to the current user's home directory.
///
/// Paths without the shorthand, or on systems without a home directory,
/// are returned unchanged.
pub fn expand_home(raw: &str) -> PathBuf {
    let Some(home) = dirs::home_dir() else {
        return PathBuf::from(raw);
    };

    if raw == "~" {
        return home;
    }
    match raw.strip_prefix("~/").or_else(|| raw.strip_prefix("~\\")) {
        Some(rest) => home.join(rest),
        None => PathBuf::from(raw),
    }
}

fn default_source_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
        .unwrap_or_else(|| PathBuf::from("Downloads"))
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join("downloads_organizer"))
        .unwrap_or_else(|| PathBuf::from("downloads_organizer"))
}
