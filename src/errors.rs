//! Typed failure taxonomy for extraction, scanning and playlist operations.

use thiserror::Error;

/// Per-file tag extraction failure.
///
/// Logged to the scan error log and skipped; a single bad file never aborts
/// the surrounding scan.
#[derive(Debug, Error)]
pub enum ExtractionFailure {
    /// The reader does not recognize the container format.
    #[error("unsupported audio file or corrupted file")]
    Unsupported,
    /// The reader recognizes the format but cannot decode its frames.
    #[error("can't sync to media frame: {0}")]
    Corrupt(String),
    /// Anything else, including I/O errors while opening the file.
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

/// Batch-fatal scan failure. The in-flight transaction is rolled back and
/// the error is surfaced to the caller of the scan.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

/// Failure while mutating a playlist or rewriting its file on disk.
#[derive(Debug, Error)]
pub enum PlaylistError {
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no playlist named '{0}'")]
    UnknownPlaylist(String),
    #[error("no playlist item with id {0}")]
    UnknownItem(i64),
    #[error("no audio file with id {0}")]
    UnknownTrack(i64),
}
