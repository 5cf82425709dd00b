//! Audio file discovery and scan change detection.
//!
//! Walks the music root, filters to the supported-extension allow-list and
//! compares filesystem modification times against the catalog's snapshot to
//! decide which files need (re)extraction.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use log::debug;

/// Extensions accepted by the indexer, matched case-insensitively.
pub const SUPPORTED_AUDIO_EXTENSIONS: [&str; 22] = [
    "aac", "ac3", "adts", "aif", "aiff", "alac", "amr", "au", "dsf", "flac", "m4a", "m4b", "mka",
    "mp2", "mp3", "mpc", "oga", "ogg", "opus", "wav", "wma", "wv",
];

pub fn is_supported_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_AUDIO_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

/// Filesystem mtime in unix milliseconds, 0 when unavailable.
pub fn file_modified_unix_ms(path: &Path) -> i64 {
    std::fs::metadata(path)
        .and_then(|meta| meta.modified())
        .ok()
        .and_then(|modified| modified.duration_since(UNIX_EPOCH).ok())
        .map(|duration| duration.as_millis() as i64)
        .unwrap_or(0)
}

/// Recursively collects supported audio files under `root`, sorted.
///
/// Unreadable directories and entries are logged at debug level and skipped;
/// discovery never fails as a whole.
pub fn collect_audio_files(root: &Path) -> Vec<PathBuf> {
    let mut pending_directories = vec![root.to_path_buf()];
    let mut tracks = Vec::new();

    while let Some(directory) = pending_directories.pop() {
        let entries = match std::fs::read_dir(&directory) {
            Ok(entries) => entries,
            Err(err) => {
                debug!("Scan: failed to read {}: {}", directory.display(), err);
                continue;
            }
        };

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    debug!(
                        "Scan: failed to read an entry in {}: {}",
                        directory.display(),
                        err
                    );
                    continue;
                }
            };

            let path = entry.path();
            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(err) => {
                    debug!("Scan: failed to inspect {}: {}", path.display(), err);
                    continue;
                }
            };

            if file_type.is_dir() {
                pending_directories.push(path);
                continue;
            }

            if file_type.is_file() && is_supported_audio_file(&path) {
                tracks.push(path);
            }
        }
    }

    tracks.sort_unstable();
    tracks
}

/// A file qualifies for (re)extraction iff it is new to the snapshot or its
/// on-disk mtime is newer than the stored one.
pub fn needs_rescan(path: &Path, snapshot: &HashMap<String, i64>) -> bool {
    match snapshot.get(path.to_string_lossy().as_ref()) {
        Some(stored) => *stored < file_modified_unix_ms(path),
        None => true,
    }
}

/// Computes the minimal set of files needing (re)extraction.
///
/// `snapshot` maps a file's full path to the `last_modified` value the
/// catalog recorded for it; it is queried once per scan, so the whole check
/// is O(existing rows) + O(files on disk).
pub fn files_needing_scan(root: &Path, snapshot: &HashMap<String, i64>) -> Vec<PathBuf> {
    collect_audio_files(root)
        .into_iter()
        .filter(|path| needs_rescan(path, snapshot))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;

    fn touch(path: &Path) {
        fs::write(path, b"").expect("failed to create file");
    }

    #[test]
    fn test_is_supported_audio_file_ignores_case_and_unknown_extensions() {
        assert!(is_supported_audio_file(Path::new("/music/song.MP3")));
        assert!(is_supported_audio_file(Path::new("/music/song.FlAc")));
        assert!(!is_supported_audio_file(Path::new("/music/cover.jpg")));
        assert!(!is_supported_audio_file(Path::new("/music/noextension")));
    }

    #[test]
    fn test_collect_audio_files_walks_subdirectories_and_sorts() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let nested = dir.path().join("album");
        fs::create_dir(&nested).expect("failed to create subdir");
        touch(&dir.path().join("b.mp3"));
        touch(&nested.join("a.flac"));
        touch(&dir.path().join("notes.txt"));

        let files = collect_audio_files(dir.path());
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("album/a.flac"));
        assert!(files[1].ends_with("b.mp3"));
    }

    #[test]
    fn test_files_needing_scan_skips_unmodified_entries() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let unchanged = dir.path().join("old.mp3");
        let stale = dir.path().join("stale.mp3");
        let fresh = dir.path().join("new.mp3");
        touch(&unchanged);
        touch(&stale);
        touch(&fresh);

        let mut snapshot = HashMap::new();
        snapshot.insert(
            unchanged.to_string_lossy().to_string(),
            file_modified_unix_ms(&unchanged),
        );
        // Stored mtime predates the file on disk.
        snapshot.insert(
            stale.to_string_lossy().to_string(),
            file_modified_unix_ms(&stale) - 1,
        );

        let due = files_needing_scan(dir.path(), &snapshot);
        assert_eq!(due.len(), 2);
        assert!(due.iter().any(|path| path == &stale));
        assert!(due.iter().any(|path| path == &fresh));
        assert!(!due.iter().any(|path| path == &unchanged));
    }

    #[test]
    fn test_files_needing_scan_with_empty_snapshot_returns_everything() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        touch(&dir.path().join("one.ogg"));
        touch(&dir.path().join("two.wav"));

        let due = files_needing_scan(dir.path(), &HashMap::new());
        assert_eq!(due.len(), 2);
    }
}
