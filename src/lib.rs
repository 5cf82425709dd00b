//! Incremental music library indexer.
//!
//! Walks a music directory, extracts audio tag metadata into a SQLite
//! catalog, keeps `.m3u`/`.m3u8` playlists synchronized with the database
//! and serves substring searches over the catalog. Transport layers (HTTP
//! and friends) sit on top of these modules; nothing here knows about them.

pub mod config;
pub mod db_manager;
pub mod error_log;
pub mod errors;
pub mod library_manager;
pub mod media_file_discovery;
pub mod metadata_tags;
pub mod models;
pub mod playlist_manager;
pub mod search;
