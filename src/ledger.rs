//! Session ledger: the log and undo records of a live run.
//!
//! A [`SessionLedger`] collects moves in memory while a run is in progress.
//! At the end of the run a [`LedgerStore`] writes it out once as two files
//! named after the session id:
//!
//! - `logs/session_<id>.log`: one `Moved <source> -> <destination>` line per move
//! - `undo/undo_<id>.json`: a JSON object mapping each destination to its
//!   original path
//!
//! Session ids are local timestamps (`2024-05-01_093000`), so sorting undo
//! file names finds the latest session.

use crate::config::OrganizerConfig;
use crate::error::{OrganizeError, OrganizeResult};
use crate::mover::MoveRecord;
use chrono::Local;
use regex::Regex;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Format of the timestamp part of a session id.
const SESSION_ID_FORMAT: &str = "%Y-%m-%d_%H%M%S";

static UNDO_FILE_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^undo_(\d{4}-\d{2}-\d{2}_\d{6})(?:_(\d+))?\.json$")
        .expect("Invalid undo file name pattern")
});

/// One entry of an undo map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoEntry {
    /// Where the file was moved to.
    pub destination: PathBuf,
    /// Where it came from.
    pub original: PathBuf,
}

/// The reversible record of one session: destination -> original, in move order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UndoMap {
    pub session_id: String,
    pub entries: Vec<UndoEntry>,
}

impl UndoMap {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serializes to a JSON object keyed by destination path.
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .entries
            .iter()
            .map(|entry| {
                (
                    entry.destination.to_string_lossy().into_owned(),
                    Value::String(entry.original.to_string_lossy().into_owned()),
                )
            })
            .collect();
        Value::Object(map)
    }

    /// Parses an undo file's contents.
    ///
    /// `path` is only used for error reporting.
    pub fn from_json(session_id: &str, path: &Path, content: &str) -> OrganizeResult<Self> {
        let invalid = |reason: String| OrganizeError::InvalidUndoArtifact {
            path: path.to_path_buf(),
            reason,
        };

        let json: Value =
            serde_json::from_str(content).map_err(|e| invalid(format!("JSON parse error: {}", e)))?;
        let object = json
            .as_object()
            .ok_or_else(|| invalid("expected an object of destination -> original".to_string()))?;

        let entries = object
            .iter()
            .map(|(destination, original)| -> OrganizeResult<UndoEntry> {
                let original = original.as_str().ok_or_else(|| {
                    invalid(format!("non-string original path for '{}'", destination))
                })?;
                Ok(UndoEntry {
                    destination: PathBuf::from(destination),
                    original: PathBuf::from(original),
                })
            })
            .collect::<OrganizeResult<Vec<_>>>()?;

        Ok(Self {
            session_id: session_id.to_string(),
            entries,
        })
    }
}

/// In-memory record of the moves made during one live run.
#[derive(Debug, Clone)]
pub struct SessionLedger {
    session_id: String,
    records: Vec<MoveRecord>,
}

impl SessionLedger {
    /// Starts a ledger whose session id is the current local time.
    pub fn new() -> Self {
        Self::with_session_id(Local::now().format(SESSION_ID_FORMAT).to_string())
    }

    pub fn with_session_id(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            records: Vec::new(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Adds a completed move. No IO happens until the ledger is flushed.
    pub fn append(&mut self, record: MoveRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// One description line per move, in order.
    pub fn log_lines(&self) -> Vec<String> {
        self.records.iter().map(MoveRecord::description).collect()
    }

    /// The undo map for this session.
    pub fn undo_map(&self) -> UndoMap {
        UndoMap {
            session_id: self.session_id.clone(),
            entries: self
                .records
                .iter()
                .map(|record| UndoEntry {
                    destination: record.destination.clone(),
                    original: record.source.clone(),
                })
                .collect(),
        }
    }
}

impl Default for SessionLedger {
    fn default() -> Self {
        Self::new()
    }
}

/// Paths of the files written for a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionArtifacts {
    pub session_id: String,
    pub log_path: PathBuf,
    pub undo_path: PathBuf,
}

/// Durable storage for session logs and undo files.
#[derive(Debug, Clone)]
pub struct LedgerStore {
    log_dir: PathBuf,
    undo_dir: PathBuf,
}

impl LedgerStore {
    pub fn new(log_dir: PathBuf, undo_dir: PathBuf) -> Self {
        Self { log_dir, undo_dir }
    }

    pub fn from_config(config: &OrganizerConfig) -> Self {
        Self::new(config.log_dir(), config.undo_dir())
    }

    /// Writes the session log and undo file for `ledger`.
    ///
    /// Returns `Ok(None)` without touching the disk when the ledger is
    /// empty. Both files are written once; if a session with the same id
    /// already exists, a `_N` suffix is added to the id.
    pub fn flush(&self, ledger: &SessionLedger) -> OrganizeResult<Option<SessionArtifacts>> {
        if ledger.is_empty() {
            return Ok(None);
        }

        for dir in [&self.log_dir, &self.undo_dir] {
            fs::create_dir_all(dir).map_err(|e| OrganizeError::DirectoryCreationFailed {
                path: dir.clone(),
                source: e,
            })?;
        }

        let session_id = self.free_session_id(ledger.session_id());
        let log_path = self.log_path(&session_id);
        let undo_path = self.undo_path(&session_id);

        let mut log_content = ledger.log_lines().join("\n");
        log_content.push('\n');

        let undo_content = serde_json::to_string_pretty(&ledger.undo_map().to_json())
            .map_err(|e| OrganizeError::LedgerWrite {
                path: undo_path.clone(),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("JSON serialization failed: {}", e),
                ),
            })?;

        write_atomically(&log_path, &log_content)?;
        write_atomically(&undo_path, &undo_content)?;

        log::info!(
            "Session {} recorded: {} move(s), undo file {}",
            session_id,
            ledger.len(),
            undo_path.display()
        );

        Ok(Some(SessionArtifacts {
            session_id,
            log_path,
            undo_path,
        }))
    }

    /// Loads the undo map of the most recent session.
    ///
    /// # Errors
    ///
    /// Returns `OrganizeError::UndoArtifactNotFound` if no undo file exists.
    pub fn load_latest(&self) -> OrganizeResult<UndoMap> {
        let (session_id, path) = self
            .latest_undo_file()?
            .ok_or_else(|| OrganizeError::UndoArtifactNotFound {
                dir: self.undo_dir.clone(),
            })?;

        log::info!("Loading undo file {}", path.display());
        let content = fs::read_to_string(&path).map_err(|e| OrganizeError::LedgerRead {
            path: path.clone(),
            source: e,
        })?;

        UndoMap::from_json(&session_id, &path, &content)
    }

    /// Finds the undo file with the greatest (timestamp, sequence) key.
    fn latest_undo_file(&self) -> OrganizeResult<Option<(String, PathBuf)>> {
        if !self.undo_dir.is_dir() {
            return Ok(None);
        }

        let entries = fs::read_dir(&self.undo_dir).map_err(|e| OrganizeError::LedgerRead {
            path: self.undo_dir.clone(),
            source: e,
        })?;

        let latest = entries
            .flatten()
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                let captures = UNDO_FILE_NAME.captures(&name)?;
                let timestamp = captures.get(1)?.as_str().to_string();
                let sequence: u32 = captures
                    .get(2)
                    .and_then(|m| m.as_str().parse().ok())
                    .unwrap_or(0);
                let session_id = name
                    .trim_start_matches("undo_")
                    .trim_end_matches(".json")
                    .to_string();
                Some(((timestamp, sequence), session_id, entry.path()))
            })
            .max_by(|a, b| a.0.cmp(&b.0))
            .map(|(_, session_id, path)| (session_id, path));

        Ok(latest)
    }

    fn log_path(&self, session_id: &str) -> PathBuf {
        self.log_dir.join(format!("session_{}.log", session_id))
    }

    fn undo_path(&self, session_id: &str) -> PathBuf {
        self.undo_dir.join(format!("undo_{}.json", session_id))
    }

    fn free_session_id(&self, base: &str) -> String {
        let taken = |id: &str| self.log_path(id).exists() || self.undo_path(id).exists();
        if !taken(base) {
            return base.to_string();
        }
        (1u32..)
            .map(|n| format!("{}_{}", base, n))
            .find(|id| !taken(id))
            .unwrap_or_else(|| base.to_string())
    }
}

/// Writes `content` to a temporary sibling and renames it into place, so a
/// reader never sees a half-written file.
fn write_atomically(path: &Path, content: &str) -> OrganizeResult<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = path.with_file_name(format!(".{}.tmp", file_name));

    let write_error = |e| OrganizeError::LedgerWrite {
        path: path.to_path_buf(),
        source: e,
    };
    fs::write(&temp_path, content).map_err(write_error)?;
    fs::rename(&temp_path, path).map_err(write_error)
}
