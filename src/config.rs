//! Persistent application configuration model and defaults.

/// Root configuration persisted to `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Config {
    #[serde(default)]
    /// Library indexing preferences.
    pub library: LibraryConfig,
    #[serde(default)]
    /// Catalog storage locations.
    pub storage: StorageConfig,
}

/// Library indexing preferences.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct LibraryConfig {
    /// Root directory walked by the scan and the playlist resync.
    #[serde(default = "default_music_directory")]
    pub music_directory: String,
    /// Directory whose playlist files app-driven edits rewrite.
    #[serde(default = "default_music_directory")]
    pub playlist_directory: String,
}

/// Catalog storage locations.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct StorageConfig {
    /// SQLite catalog path. Empty selects the per-user data directory.
    #[serde(default)]
    pub database_path: String,
    /// Append-only log of per-file extraction failures.
    #[serde(default = "default_error_log_path")]
    pub error_log_path: String,
}

fn default_music_directory() -> String {
    ".".to_string()
}

fn default_error_log_path() -> String {
    "error.log".to_string()
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            music_directory: default_music_directory(),
            playlist_directory: default_music_directory(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: String::new(),
            error_log_path: default_error_log_path(),
        }
    }
}
