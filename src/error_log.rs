//! Append-only log of per-file extraction failures.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use log::warn;

/// Appends timestamped failure lines to a plain text file.
///
/// One line per failed file: `{timestamp} - {path}: {message}`. The file is
/// opened per append so concurrent search readers never hold it, and a scan
/// survives the log itself being unwritable.
#[derive(Debug, Clone)]
pub struct ErrorLog {
    path: PathBuf,
}

impl ErrorLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Records one failure. Logging problems are downgraded to a warning so
    /// they cannot abort the scan that reported the failure.
    pub fn append(&self, file_path: &Path, message: &str) {
        let line = format!(
            "{} - {}: {}\n",
            Local::now().format("%Y-%m-%d %H:%M:%S%.6f"),
            file_path.display(),
            message
        );
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| file.write_all(line.as_bytes()));
        if let Err(err) = result {
            warn!(
                "Failed to append to error log {}: {}",
                self.path.display(),
                err
            );
        }
    }
}
