//! Catalog row models with named, typed fields.

use std::path::{Path, PathBuf};

/// Canonical placeholder for a text tag that is absent or unreadable.
pub const UNKNOWN_TAG: &str = "Unknown";

/// One indexed audio file as persisted in the `audio_files` table.
///
/// `track_number`, `disc_number` and `bpm` are kept as verbatim tag text:
/// source tags carry non-numeric forms such as "3/12", and coercing them
/// would lose information.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFileRecord {
    /// Row id; `None` before the record is first persisted.
    pub id: Option<i64>,
    /// Parent directory of the file.
    pub path: String,
    /// File basename. `(path, filename)` is the natural key.
    pub filename: String,
    pub title: String,
    pub album: String,
    pub artist: String,
    pub genre: String,
    pub composer: String,
    pub comment: String,
    /// Publisher/label tag.
    pub label: String,
    pub isrc: String,
    /// Musical key tag, e.g. "Am".
    pub key: String,
    /// Release year. `None` stands in for the "Unknown" sentinel.
    pub year: Option<i32>,
    /// Stream length in seconds, 0.0 when the container reports none.
    pub duration: f64,
    /// Average bitrate in kbps, 0 when unknown.
    pub bitrate: i64,
    pub track_number: String,
    pub disc_number: String,
    pub bpm: String,
    /// Replay-gain tag text, verbatim.
    pub replaygain: String,
    /// Embedded cover art bytes, when present.
    pub cover_art: Option<Vec<u8>>,
    /// Filesystem mtime in unix milliseconds; the scan change marker.
    pub last_modified: i64,
}

impl AudioFileRecord {
    /// Full path reassembled from the `(path, filename)` key.
    pub fn full_path(&self) -> PathBuf {
        Path::new(&self.path).join(&self.filename)
    }
}

/// A playlist known to the catalog, named after its file basename.
#[derive(Debug, Clone, PartialEq)]
pub struct Playlist {
    pub id: i64,
    pub name: String,
    pub created_at: String,
}

/// A playlist entry not yet persisted; the store assigns id and position.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPlaylistItem {
    pub track_path: String,
    pub track_title: String,
    pub track_duration: i64,
}

impl NewPlaylistItem {
    pub fn new(
        track_path: impl Into<String>,
        track_title: impl Into<String>,
        track_duration: i64,
    ) -> Self {
        Self {
            track_path: track_path.into(),
            track_title: track_title.into(),
            track_duration,
        }
    }
}

/// One entry of a playlist, ordered by `position`.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistItem {
    pub id: i64,
    pub playlist_id: i64,
    /// Track path as written in the playlist file; may be relative.
    pub track_path: String,
    pub track_title: String,
    /// Whole seconds from the `#EXTINF` annotation, 0 when unspecified.
    pub track_duration: i64,
    /// Zero-based, contiguous within the playlist.
    pub position: i64,
}

/// Counters reported by one scan pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanSummary {
    /// Audio files seen under the music root.
    pub discovered: usize,
    /// Files skipped because the catalog already holds their current state.
    pub unchanged: usize,
    /// Records extracted and committed.
    pub indexed: usize,
    /// Files whose extraction failed and was logged.
    pub failed: usize,
    /// True when the scan stopped early on the abort flag; nothing was
    /// committed in that case.
    pub aborted: bool,
}
