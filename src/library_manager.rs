//! Scan orchestration: change detection, extraction, atomic batch commit.
//!
//! One scan pass loads the catalog snapshot, walks the music root, extracts
//! every new or modified file through the injected reader and commits all
//! resulting records in a single transaction. Extraction failures are
//! per-file: logged to the error log and skipped. Only storage failures
//! abort the pass, and they roll the whole batch back.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{info, warn};

use crate::db_manager::DbManager;
use crate::error_log::ErrorLog;
use crate::errors::ScanError;
use crate::media_file_discovery::{collect_audio_files, needs_rescan};
use crate::metadata_tags::{extract_record, TagReader};
use crate::models::ScanSummary;

/// Drives scan passes over a music directory.
pub struct LibraryManager<R: TagReader> {
    reader: R,
    error_log: ErrorLog,
    abort_flag: Arc<AtomicBool>,
}

impl<R: TagReader> LibraryManager<R> {
    pub fn new(reader: R, error_log: ErrorLog) -> Self {
        Self {
            reader,
            error_log,
            abort_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Checked between files. Setting it stops the scan before the batch
    /// commit, so an aborted scan leaves the catalog untouched.
    pub fn abort_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.abort_flag)
    }

    /// One end-to-end scan: diff against the stored snapshot, extract the
    /// files that need it, commit the batch atomically.
    pub fn run_scan(
        &self,
        db: &mut DbManager,
        music_dir: &Path,
    ) -> Result<ScanSummary, ScanError> {
        let snapshot = db.existing_file_snapshot()?;
        let all_files = collect_audio_files(music_dir);

        let mut summary = ScanSummary {
            discovered: all_files.len(),
            ..ScanSummary::default()
        };
        let mut records = Vec::new();

        for file_path in all_files {
            if self.abort_flag.load(Ordering::Relaxed) {
                info!("Scan aborted before {}", file_path.display());
                summary.aborted = true;
                return Ok(summary);
            }

            if !needs_rescan(&file_path, &snapshot) {
                summary.unchanged += 1;
                continue;
            }

            match extract_record(&self.reader, &file_path) {
                Ok(record) => records.push(record),
                Err(failure) => {
                    warn!("Scan: {}: {}", file_path.display(), failure);
                    self.error_log.append(&file_path, &failure.to_string());
                    summary.failed += 1;
                }
            }
        }

        if records.is_empty() {
            info!("No new or updated audio files found. Proceed ...");
            return Ok(summary);
        }

        db.upsert_batch(&records)?;
        summary.indexed = records.len();
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ExtractionFailure;
    use crate::metadata_tags::RawTags;
    use std::cell::RefCell;
    use std::fs;
    use std::path::PathBuf;

    /// Reader scripted by filename: files starting with "corrupt" fail,
    /// everything else yields a title derived from the file stem.
    struct ScriptedTagReader {
        reads: RefCell<usize>,
    }

    impl ScriptedTagReader {
        fn new() -> Self {
            Self {
                reads: RefCell::new(0),
            }
        }
    }

    impl TagReader for ScriptedTagReader {
        fn read(&self, path: &Path) -> Result<RawTags, ExtractionFailure> {
            *self.reads.borrow_mut() += 1;
            let stem = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .unwrap_or("")
                .to_string();
            if stem.starts_with("corrupt") {
                return Err(ExtractionFailure::Corrupt(
                    "can't sync to MPEG frame".to_string(),
                ));
            }
            Ok(RawTags {
                title: Some(stem),
                artist: Some("Scripted Artist".to_string()),
                ..RawTags::default()
            })
        }
    }

    struct ScanHarness {
        dir: tempfile::TempDir,
        db: DbManager,
        manager: LibraryManager<ScriptedTagReader>,
    }

    impl ScanHarness {
        fn new() -> Self {
            let dir = tempfile::tempdir().expect("failed to create temp dir");
            let db = DbManager::new_in_memory().expect("failed to create in-memory db");
            let error_log = ErrorLog::new(dir.path().join("error.log"));
            let manager = LibraryManager::new(ScriptedTagReader::new(), error_log);
            Self { dir, db, manager }
        }

        fn add_file(&self, name: &str) -> PathBuf {
            let path = self.dir.path().join(name);
            fs::write(&path, b"").expect("failed to create file");
            path
        }

        fn scan(&mut self) -> ScanSummary {
            self.manager
                .run_scan(&mut self.db, self.dir.path())
                .expect("scan should succeed")
        }

        fn reads(&self) -> usize {
            *self.manager.reader.reads.borrow()
        }
    }

    #[test]
    fn test_scan_indexes_new_files_and_skips_them_next_time() {
        let mut harness = ScanHarness::new();
        harness.add_file("one.mp3");
        harness.add_file("two.flac");

        let first = harness.scan();
        assert_eq!(first.discovered, 2);
        assert_eq!(first.indexed, 2);
        assert_eq!(first.unchanged, 0);
        assert_eq!(harness.db.audio_file_count().expect("count should succeed"), 2);

        let reads_after_first = harness.reads();
        let second = harness.scan();
        assert_eq!(second.indexed, 0);
        assert_eq!(second.unchanged, 2);
        // Unmodified files are skipped entirely, including extraction.
        assert_eq!(harness.reads(), reads_after_first);
    }

    #[test]
    fn test_corrupt_file_is_logged_and_does_not_abort_the_scan() {
        let mut harness = ScanHarness::new();
        for index in 0..9 {
            harness.add_file(&format!("track-{}.mp3", index));
        }
        harness.add_file("corrupt.mp3");

        let summary = harness.scan();
        assert_eq!(summary.discovered, 10);
        assert_eq!(summary.indexed, 9);
        assert_eq!(summary.failed, 1);
        assert_eq!(harness.db.audio_file_count().expect("count should succeed"), 9);

        let log_content = fs::read_to_string(harness.dir.path().join("error.log"))
            .expect("error log should exist");
        let lines: Vec<&str> = log_content.lines().collect();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("corrupt.mp3"));
        assert!(lines[0].contains("can't sync to MPEG frame"));
    }

    #[test]
    fn test_rescan_of_modified_file_replaces_row_without_duplicating() {
        let mut harness = ScanHarness::new();
        harness.add_file("one.mp3");
        harness.scan();

        // Age the stored marker so the file qualifies again.
        harness
            .db
            .execute_raw("UPDATE audio_files SET last_modified = 1")
            .expect("update should succeed");

        let summary = harness.scan();
        assert_eq!(summary.indexed, 1);
        assert_eq!(harness.db.audio_file_count().expect("count should succeed"), 1);
    }

    #[test]
    fn test_aborted_scan_commits_nothing() {
        let mut harness = ScanHarness::new();
        harness.add_file("one.mp3");
        harness.manager.abort_flag().store(true, Ordering::Relaxed);

        let summary = harness.scan();
        assert!(summary.aborted);
        assert_eq!(summary.indexed, 0);
        assert_eq!(harness.db.audio_file_count().expect("count should succeed"), 0);
    }

    #[test]
    fn test_scan_of_empty_directory_reports_nothing_to_do() {
        let mut harness = ScanHarness::new();
        let summary = harness.scan();
        assert_eq!(summary, ScanSummary::default());
    }
}
