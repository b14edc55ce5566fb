use filament::cli::{OrganizeCommand, run_cli_with_config};
use filament::{OrganizeError, Organizer, OrganizerConfig, SkipReason};
/// Integration tests for filament
///
/// These tests run complete organize and undo sessions against temporary
/// directories laid out like a real downloads folder.
///
/// Test categories:
/// 1. Rule precedence scenarios
/// 2. Duplicate handling
/// 3. Dry-run mode verification
/// 4. Session ledger and undo
/// 5. Error scenarios
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

// ============================================================================
// Test Utilities
// ============================================================================

/// A temporary root holding a `Downloads` source directory, destination
/// directories, and the organizer's data directory.
struct TestFixture {
    temp_dir: TempDir,
}

impl TestFixture {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        fs::create_dir(temp_dir.path().join("Downloads")).expect("Failed to create source dir");
        TestFixture { temp_dir }
    }

    fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    fn source(&self) -> PathBuf {
        self.root().join("Downloads")
    }

    fn dest(&self, category: &str) -> PathBuf {
        self.root().join("sorted").join(category)
    }

    fn data_dir(&self) -> PathBuf {
        self.root().join("data")
    }

    /// Configuration document with the given `[settings]` body.
    fn config_toml(&self, settings: &str) -> String {
        format!(
            r#"
source_dir = '{source}'
data_dir = '{data}'

[rules]
documents = ["*.pdf", "*.txt", "*.docx"]
images = ["*.png", "*.jpg"]

[smart_rules]
finance = ["invoice", "receipt"]

[destinations]
documents = '{documents}'
images = '{images}'
finance = '{finance}'
old = '{old}'

[settings]
{settings}
"#,
            source = self.source().display(),
            data = self.data_dir().display(),
            documents = self.dest("documents").display(),
            images = self.dest("images").display(),
            finance = self.dest("finance").display(),
            old = self.dest("old").display(),
            settings = settings,
        )
    }

    fn config(&self, settings: &str) -> OrganizerConfig {
        let config = OrganizerConfig::from_toml_str(&self.config_toml(settings))
            .expect("Failed to parse config");
        config
            .ensure_destinations()
            .expect("Failed to create destinations");
        config
    }

    fn organizer(&self, settings: &str) -> Organizer {
        Organizer::new(self.config(settings)).expect("Failed to build organizer")
    }

    fn create_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.source().join(name);
        let mut file = File::create(&path).expect("Failed to create file");
        file.write_all(content.as_bytes())
            .expect("Failed to write file content");
        path
    }

    /// Sets a source file's modification time `days` days into the past.
    fn backdate(&self, name: &str, days: u64) {
        let file = File::options()
            .write(true)
            .open(self.source().join(name))
            .expect("Failed to open file");
        file.set_modified(SystemTime::now() - Duration::from_secs(days * 86_400))
            .expect("Failed to set modification time");
    }

    fn undo_files(&self) -> Vec<PathBuf> {
        list_files(&self.data_dir().join("undo"))
    }

    fn log_files(&self) -> Vec<PathBuf> {
        list_files(&self.data_dir().join("logs"))
    }

    /// All files below the fixture root, relative to it.
    fn snapshot(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        walk_dir(self.root(), &mut files);
        let mut relative: Vec<PathBuf> = files
            .into_iter()
            .map(|p| p.strip_prefix(self.root()).unwrap().to_path_buf())
            .collect();
        relative.sort();
        relative
    }
}

fn list_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = match fs::read_dir(dir) {
        Ok(entries) => entries.flatten().map(|e| e.path()).collect(),
        Err(_) => Vec::new(),
    };
    files.sort();
    files
}

fn walk_dir(dir: &Path, files: &mut Vec<PathBuf>) {
    if let Ok(entries) = fs::read_dir(dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_file() {
                files.push(path);
            } else if path.is_dir() {
                walk_dir(&path, files);
            }
        }
    }
}

const ARCHIVE_30: &str = "archive_days = 30";

// ============================================================================
// Test Suite 1: Rule Precedence
// ============================================================================

#[test]
fn test_mixed_downloads_session() {
    let fixture = TestFixture::new();
    fixture.create_file("report.pdf", "pdf");
    fixture.create_file("invoice_client.png", "png");
    fixture.create_file(".DS_Store", "meta");
    fixture.create_file("old_draft.txt", "draft");
    fixture.backdate("old_draft.txt", 40);

    let summary = fixture.organizer(ARCHIVE_30).organize(false).unwrap();

    assert_eq!(summary.moved, 3);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.errors, 0);
    assert_eq!(summary.skipped_for(SkipReason::Hidden), 1);

    assert!(fixture.dest("documents").join("report.pdf").exists());
    assert!(fixture.dest("finance").join("invoice_client.png").exists());
    assert!(fixture.dest("old").join("old_draft.txt").exists());
    assert!(fixture.source().join(".DS_Store").exists());
    assert!(!fixture.dest("images").join("invoice_client.png").exists());

    let undo_files = fixture.undo_files();
    assert_eq!(undo_files.len(), 1);
    let undo: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&undo_files[0]).unwrap()).unwrap();
    assert_eq!(undo.as_object().unwrap().len(), 3);
}

#[test]
fn test_keyword_beats_extension_for_every_file() {
    let fixture = TestFixture::new();
    for name in ["Receipt-2024.pdf", "INVOICE.jpg", "my_invoice.txt"] {
        fixture.create_file(name, name);
    }
    fixture.create_file("holiday.jpg", "jpg");

    let summary = fixture.organizer("").organize(false).unwrap();

    assert_eq!(summary.per_category.get("finance"), Some(&3));
    assert_eq!(summary.per_category.get("images"), Some(&1));
    assert!(fixture.dest("images").join("holiday.jpg").exists());
}

#[test]
fn test_age_archiving_overrides_keywords_and_extensions() {
    let fixture = TestFixture::new();
    for name in ["invoice_old.pdf", "photo.png", "unknown.bin"] {
        fixture.create_file(name, name);
        fixture.backdate(name, 90);
    }

    let summary = fixture.organizer(ARCHIVE_30).organize(false).unwrap();

    assert_eq!(summary.moved, 3);
    assert_eq!(summary.per_category.get("old"), Some(&3));
    assert_eq!(list_files(&fixture.dest("old")).len(), 3);
}

#[test]
fn test_uncategorized_and_ignored_files_stay() {
    let fixture = TestFixture::new();
    fixture.create_file("setup.exe", "exe");
    fixture.create_file("movie.mp4.crdownload", "partial");

    let summary = fixture
        .organizer(r#"ignore_patterns = ["*.crdownload"]"#)
        .organize(false)
        .unwrap();

    assert_eq!(summary.moved, 0);
    assert_eq!(summary.skipped_for(SkipReason::Uncategorized), 1);
    assert_eq!(summary.skipped_for(SkipReason::Ignored), 1);
    assert!(fixture.source().join("setup.exe").exists());
    assert!(fixture.source().join("movie.mp4.crdownload").exists());
    assert!(fixture.undo_files().is_empty());
}

// ============================================================================
// Test Suite 2: Duplicate Handling
// ============================================================================

#[test]
fn test_rename_strategy_numbers_duplicates() {
    let fixture = TestFixture::new();
    let organizer = fixture.organizer(r#"duplicate_strategy = "rename""#);
    fs::write(fixture.dest("images").join("photo.jpg"), "existing").unwrap();

    fixture.create_file("photo.jpg", "second");
    organizer.organize(false).unwrap();
    fixture.create_file("photo.jpg", "third");
    organizer.organize(false).unwrap();

    let images = fixture.dest("images");
    assert_eq!(fs::read_to_string(images.join("photo.jpg")).unwrap(), "existing");
    assert_eq!(fs::read_to_string(images.join("photo_1.jpg")).unwrap(), "second");
    assert_eq!(fs::read_to_string(images.join("photo_2.jpg")).unwrap(), "third");
}

#[test]
fn test_skip_strategy_counts_skip_not_error() {
    let fixture = TestFixture::new();
    let organizer = fixture.organizer(r#"duplicate_strategy = "skip""#);
    fs::write(fixture.dest("documents").join("report.pdf"), "existing").unwrap();
    fixture.create_file("report.pdf", "incoming");

    let summary = organizer.organize(false).unwrap();

    assert_eq!(summary.moved, 0);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.errors, 0);
    assert_eq!(summary.skipped_for(SkipReason::DuplicateSkipped), 1);
    assert_eq!(
        fs::read_to_string(fixture.source().join("report.pdf")).unwrap(),
        "incoming"
    );
}

// ============================================================================
// Test Suite 3: Dry-Run Mode
// ============================================================================

#[test]
fn test_dry_run_changes_nothing() {
    let fixture = TestFixture::new();
    fixture.create_file("report.pdf", "pdf");
    fixture.create_file("invoice.png", "png");
    fixture.create_file("old.txt", "txt");
    fixture.backdate("old.txt", 60);
    let organizer = fixture.organizer(ARCHIVE_30);
    let before = fixture.snapshot();

    let summary = organizer.organize(true).unwrap();

    assert!(summary.dry_run);
    assert_eq!(summary.moved, 3);
    assert!(summary.session.is_none());
    assert_eq!(fixture.snapshot(), before);
    assert!(!fixture.data_dir().exists());
}

#[test]
fn test_dry_run_via_command() {
    let fixture = TestFixture::new();
    fixture.create_file("report.pdf", "pdf");

    let result = run_cli_with_config(
        OrganizeCommand::Organize { dry_run: true },
        fixture.config(""),
    );

    assert!(result.is_ok());
    assert!(fixture.source().join("report.pdf").exists());
    assert!(fixture.undo_files().is_empty());
}

// ============================================================================
// Test Suite 4: Session Ledger and Undo
// ============================================================================

#[test]
fn test_live_run_writes_log_and_undo() {
    let fixture = TestFixture::new();
    let report = fixture.create_file("report.pdf", "pdf");
    let photo = fixture.create_file("photo.png", "png");

    let summary = fixture.organizer("").organize(false).unwrap();
    let session = summary.session.expect("session should be recorded");

    assert_eq!(fixture.log_files(), vec![session.log_path.clone()]);
    let log = fs::read_to_string(&session.log_path).unwrap();
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines.contains(&format!(
        "Moved {} -> {}",
        report.display(),
        fixture.dest("documents").join("report.pdf").display()
    )
    .as_str()));
    assert!(lines.contains(&format!(
        "Moved {} -> {}",
        photo.display(),
        fixture.dest("images").join("photo.png").display()
    )
    .as_str()));
}

#[test]
fn test_undo_restores_every_file() {
    let fixture = TestFixture::new();
    let names = ["report.pdf", "invoice_client.png", "old_draft.txt", "photo.jpg"];
    for name in names {
        fixture.create_file(name, name);
    }
    fixture.backdate("old_draft.txt", 40);
    let organizer = fixture.organizer(ARCHIVE_30);

    let summary = organizer.organize(false).unwrap();
    assert_eq!(summary.moved, 4);
    let undo_map = organizer.store().load_latest().unwrap();
    assert_eq!(undo_map.len(), 4);

    let report = organizer.undo().unwrap();
    assert_eq!(report.restored_files(), 4);
    assert!(report.is_complete_success());

    for name in names {
        let path = fixture.source().join(name);
        assert_eq!(fs::read_to_string(&path).unwrap(), name);
    }
    for category in ["documents", "images", "finance", "old"] {
        assert!(
            list_files(&fixture.dest(category)).is_empty(),
            "{} should be empty after undo",
            category
        );
    }
    // The undo file is kept
    assert_eq!(fixture.undo_files().len(), 1);
}

#[test]
fn test_undo_reverts_only_latest_session() {
    let fixture = TestFixture::new();
    let organizer = fixture.organizer("");

    fixture.create_file("first.pdf", "1");
    organizer.organize(false).unwrap();
    fixture.create_file("second.pdf", "2");
    organizer.organize(false).unwrap();
    assert_eq!(fixture.undo_files().len(), 2);

    let report = organizer.undo().unwrap();
    assert_eq!(report.restored_files(), 1);
    assert!(fixture.source().join("second.pdf").exists());
    assert!(fixture.dest("documents").join("first.pdf").exists());
}

#[test]
fn test_repeated_undo_is_reported_not_fatal() {
    let fixture = TestFixture::new();
    let organizer = fixture.organizer("");
    fixture.create_file("report.pdf", "pdf");
    organizer.organize(false).unwrap();

    organizer.undo().unwrap();
    let again = organizer.undo().unwrap();

    assert_eq!(again.restored_files(), 0);
    assert_eq!(again.skipped_files().len(), 1);
    assert!(fixture.source().join("report.pdf").exists());
}

#[test]
fn test_undo_without_sessions() {
    let fixture = TestFixture::new();
    let organizer = fixture.organizer("");

    assert!(matches!(
        organizer.undo(),
        Err(OrganizeError::UndoArtifactNotFound { .. })
    ));
    // Reported, not a failure of the command
    assert!(run_cli_with_config(OrganizeCommand::Undo, fixture.config("")).is_ok());
}

#[test]
fn test_no_log_setting_disables_undo() {
    let fixture = TestFixture::new();
    fixture.create_file("report.pdf", "pdf");

    let summary = fixture
        .organizer("log_sessions = false")
        .organize(false)
        .unwrap();

    assert_eq!(summary.moved, 1);
    assert!(fixture.undo_files().is_empty());
    assert!(fixture.log_files().is_empty());
}

// ============================================================================
// Test Suite 5: Error Scenarios
// ============================================================================

#[test]
fn test_failed_move_does_not_stop_run() {
    let fixture = TestFixture::new();
    let blocker = fixture.root().join("blocker");
    fs::write(&blocker, "not a directory").unwrap();

    let mut config = fixture.config("");
    config.destinations.insert("images".to_string(), blocker);
    let organizer = Organizer::new(config).unwrap();

    fixture.create_file("a.png", "png");
    fixture.create_file("b.pdf", "pdf");

    let summary = organizer.organize(false).unwrap();
    assert_eq!(summary.errors, 1);
    assert_eq!(summary.moved, 1);
    assert!(fixture.source().join("a.png").exists());
    assert!(fixture.dest("documents").join("b.pdf").exists());

    // Only the successful move is recorded
    assert_eq!(organizer.store().load_latest().unwrap().len(), 1);
}

#[cfg(target_os = "linux")]
#[test]
fn test_non_utf8_name_stays_in_place_and_undo_is_exact() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let fixture = TestFixture::new();
    let odd = fixture.source().join(OsStr::from_bytes(b"caf\xe9.pdf"));
    fs::write(&odd, "pdf").unwrap();
    let report = fixture.create_file("report.pdf", "pdf");
    let organizer = fixture.organizer("");

    let summary = organizer.organize(false).unwrap();
    assert_eq!(summary.moved, 1);
    assert_eq!(summary.errors, 0);
    assert_eq!(summary.skipped_for(SkipReason::UnrepresentableName), 1);
    assert!(odd.exists());
    assert_eq!(
        list_files(&fixture.dest("documents")),
        vec![fixture.dest("documents").join("report.pdf")]
    );
    assert_eq!(organizer.store().load_latest().unwrap().len(), 1);

    let undo = organizer.undo().unwrap();
    assert!(undo.is_complete_success());
    assert!(report.exists());
    assert!(odd.exists());
    assert!(list_files(&fixture.dest("documents")).is_empty());
}

#[test]
fn test_missing_source_directory_is_fatal() {
    let fixture = TestFixture::new();
    fs::remove_dir(fixture.source()).unwrap();

    let result = run_cli_with_config(
        OrganizeCommand::Organize { dry_run: false },
        fixture.config(""),
    );

    assert!(result.is_err());
    assert!(!fixture.data_dir().exists());
}

#[test]
fn test_missing_destination_is_a_skip() {
    let fixture = TestFixture::new();
    fixture.create_file("report.pdf", "pdf");

    let mut config = fixture.config("");
    config.destinations.remove("documents");
    let summary = Organizer::new(config).unwrap().organize(false).unwrap();

    assert_eq!(summary.errors, 0);
    assert_eq!(summary.skipped_for(SkipReason::DestinationUnresolved), 1);
    assert!(fixture.source().join("report.pdf").exists());
}

#[test]
fn test_config_file_round_trip() {
    let fixture = TestFixture::new();
    let config_path = fixture.root().join("filament.toml");
    fs::write(&config_path, fixture.config_toml(ARCHIVE_30)).unwrap();

    let config = OrganizerConfig::load(Some(&config_path)).unwrap();
    assert_eq!(config, fixture.config(ARCHIVE_30));
}
