//! SQLite catalog storage for indexed audio files and playlists.
//!
//! `DbManager` exclusively owns the connection; every other component goes
//! through its operations. Audio file rows are keyed on `(path, filename)`
//! and re-extraction replaces the prior row in place, so repeated scans
//! never accumulate duplicates.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use crate::models::{AudioFileRecord, NewPlaylistItem, Playlist, PlaylistItem};

const AUDIO_FILE_COLUMNS: &str = "id, path, filename, title, album, artist, genre, composer, \
     comment, label, isrc, key, year, duration, bitrate, track_number, disc_number, bpm, \
     replaygain, cover_art, last_modified";

pub struct DbManager {
    conn: Connection,
}

impl DbManager {
    /// Opens (and if necessary creates) the catalog at `db_path`.
    pub fn open(db_path: &Path) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(db_path)?;
        let db_manager = Self { conn };
        db_manager.configure_connection()?;
        db_manager.initialize_schema()?;
        Ok(db_manager)
    }

    /// Opens the catalog at its default per-user data directory location.
    pub fn open_default() -> Result<Self, rusqlite::Error> {
        let data_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tunedex");

        if !data_dir.exists() {
            std::fs::create_dir_all(&data_dir).expect("Could not create data directory");
        }

        Self::open(&data_dir.join("audio_files.db"))
    }

    pub fn new_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        let db_manager = Self { conn };
        db_manager.configure_connection()?;
        db_manager.initialize_schema()?;
        Ok(db_manager)
    }

    /// WAL keeps concurrent search readers off the scan writer's back, and
    /// the busy timeout covers the moment a batch commits.
    fn configure_connection(&self) -> Result<(), rusqlite::Error> {
        self.conn.pragma_update(None, "journal_mode", "WAL")?;
        self.conn.pragma_update(None, "foreign_keys", "ON")?;
        self.conn.busy_timeout(Duration::from_secs(5))?;
        Ok(())
    }

    /// Idempotent: safe to invoke on an existing database.
    fn initialize_schema(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS audio_files (
                id INTEGER PRIMARY KEY,
                path TEXT NOT NULL,
                filename TEXT NOT NULL,
                title TEXT NOT NULL,
                album TEXT NOT NULL,
                artist TEXT NOT NULL,
                genre TEXT NOT NULL,
                composer TEXT NOT NULL,
                comment TEXT NOT NULL,
                label TEXT NOT NULL,
                isrc TEXT NOT NULL,
                key TEXT NOT NULL,
                year INTEGER,
                duration REAL NOT NULL,
                bitrate INTEGER NOT NULL,
                track_number TEXT NOT NULL,
                disc_number TEXT NOT NULL,
                bpm TEXT NOT NULL,
                replaygain TEXT NOT NULL,
                cover_art BLOB,
                last_modified INTEGER NOT NULL,
                UNIQUE(path, filename)
            )",
            [],
        )?;
        self.conn
            .execute("CREATE INDEX IF NOT EXISTS idx_title ON audio_files(title)", [])?;
        self.conn
            .execute("CREATE INDEX IF NOT EXISTS idx_artist ON audio_files(artist)", [])?;
        self.conn
            .execute("CREATE INDEX IF NOT EXISTS idx_album ON audio_files(album)", [])?;

        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS playlists (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                created_at TEXT NOT NULL
            )",
            [],
        )?;
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS playlist_items (
                id INTEGER PRIMARY KEY,
                playlist_id INTEGER NOT NULL REFERENCES playlists(id) ON DELETE CASCADE,
                track_path TEXT NOT NULL,
                track_title TEXT NOT NULL,
                track_duration INTEGER NOT NULL,
                position INTEGER NOT NULL
            )",
            [],
        )?;
        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_playlist_items_position
                 ON playlist_items(playlist_id, position)",
            [],
        )?;
        Ok(())
    }

    fn map_audio_file_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AudioFileRecord> {
        Ok(AudioFileRecord {
            id: row.get(0)?,
            path: row.get(1)?,
            filename: row.get(2)?,
            title: row.get(3)?,
            album: row.get(4)?,
            artist: row.get(5)?,
            genre: row.get(6)?,
            composer: row.get(7)?,
            comment: row.get(8)?,
            label: row.get(9)?,
            isrc: row.get(10)?,
            key: row.get(11)?,
            year: row.get(12)?,
            duration: row.get(13)?,
            bitrate: row.get(14)?,
            track_number: row.get(15)?,
            disc_number: row.get(16)?,
            bpm: row.get(17)?,
            replaygain: row.get(18)?,
            cover_art: row.get(19)?,
            last_modified: row.get(20)?,
        })
    }

    /// Applies a whole scan batch in one transaction: either every record
    /// lands or none does. Conflicting `(path, filename)` keys update the
    /// existing row, keeping its id stable.
    pub fn upsert_batch(&mut self, records: &[AudioFileRecord]) -> Result<(), rusqlite::Error> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO audio_files (path, filename, title, album, artist, genre, composer,
                     comment, label, isrc, key, year, duration, bitrate, track_number,
                     disc_number, bpm, replaygain, cover_art, last_modified)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                         ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)
                 ON CONFLICT(path, filename) DO UPDATE SET
                     title = excluded.title,
                     album = excluded.album,
                     artist = excluded.artist,
                     genre = excluded.genre,
                     composer = excluded.composer,
                     comment = excluded.comment,
                     label = excluded.label,
                     isrc = excluded.isrc,
                     key = excluded.key,
                     year = excluded.year,
                     duration = excluded.duration,
                     bitrate = excluded.bitrate,
                     track_number = excluded.track_number,
                     disc_number = excluded.disc_number,
                     bpm = excluded.bpm,
                     replaygain = excluded.replaygain,
                     cover_art = excluded.cover_art,
                     last_modified = excluded.last_modified",
            )?;
            for record in records {
                stmt.execute(params![
                    record.path,
                    record.filename,
                    record.title,
                    record.album,
                    record.artist,
                    record.genre,
                    record.composer,
                    record.comment,
                    record.label,
                    record.isrc,
                    record.key,
                    record.year,
                    record.duration,
                    record.bitrate,
                    record.track_number,
                    record.disc_number,
                    record.bpm,
                    record.replaygain,
                    record.cover_art,
                    record.last_modified,
                ])?;
            }
        }
        tx.commit()
    }

    /// One-query scan baseline: full path (directory joined with filename)
    /// mapped to the stored `last_modified` marker.
    pub fn existing_file_snapshot(&self) -> Result<HashMap<String, i64>, rusqlite::Error> {
        let mut stmt = self
            .conn
            .prepare("SELECT path, filename, last_modified FROM audio_files")?;
        let rows = stmt.query_map([], |row| {
            let path: String = row.get(0)?;
            let filename: String = row.get(1)?;
            let last_modified: i64 = row.get(2)?;
            let full_path = Path::new(&path).join(&filename).to_string_lossy().to_string();
            Ok((full_path, last_modified))
        })?;

        let mut snapshot = HashMap::new();
        for row in rows {
            let (full_path, last_modified) = row?;
            snapshot.insert(full_path, last_modified);
        }
        Ok(snapshot)
    }

    pub fn list_all(&self) -> Result<Vec<AudioFileRecord>, rusqlite::Error> {
        let sql = format!("SELECT {AUDIO_FILE_COLUMNS} FROM audio_files ORDER BY path, filename");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], Self::map_audio_file_row)?;
        rows.collect()
    }

    pub fn get_audio_file(&self, id: i64) -> Result<Option<AudioFileRecord>, rusqlite::Error> {
        let sql = format!("SELECT {AUDIO_FILE_COLUMNS} FROM audio_files WHERE id = ?1");
        self.conn
            .query_row(&sql, params![id], Self::map_audio_file_row)
            .optional()
    }

    pub fn audio_file_count(&self) -> Result<i64, rusqlite::Error> {
        self.conn
            .query_row("SELECT COUNT(*) FROM audio_files", [], |row| row.get(0))
    }

    /// Substring search used by the Search Engine. `fields` are column
    /// names chosen from a closed enum upstream, never caller input; the
    /// WHERE clause is OR across every field/pattern pair.
    pub fn search_audio_files(
        &self,
        fields: &[&str],
        patterns: &[String],
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AudioFileRecord>, rusqlite::Error> {
        let mut clauses = Vec::with_capacity(fields.len() * patterns.len());
        let mut bound = Vec::with_capacity(fields.len() * patterns.len());
        for field in fields {
            for pattern in patterns {
                clauses.push(format!(
                    "{} LIKE ?{} COLLATE NOCASE",
                    field,
                    clauses.len() + 1
                ));
                bound.push(pattern);
            }
        }

        let sql = format!(
            "SELECT DISTINCT {AUDIO_FILE_COLUMNS} FROM audio_files
             WHERE ({})
             ORDER BY last_modified DESC
             LIMIT {limit} OFFSET {offset}",
            clauses.join(" OR ")
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(bound), Self::map_audio_file_row)?;
        rows.collect()
    }

    #[cfg(test)]
    pub(crate) fn execute_raw(&self, sql: &str) -> Result<usize, rusqlite::Error> {
        self.conn.execute(sql, [])
    }

    pub fn playlist_by_name(&self, name: &str) -> Result<Option<Playlist>, rusqlite::Error> {
        self.conn
            .query_row(
                "SELECT id, name, created_at FROM playlists WHERE name = ?1",
                params![name],
                |row| {
                    Ok(Playlist {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                },
            )
            .optional()
    }

    pub fn get_playlist(&self, id: i64) -> Result<Option<Playlist>, rusqlite::Error> {
        self.conn
            .query_row(
                "SELECT id, name, created_at FROM playlists WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Playlist {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                },
            )
            .optional()
    }

    pub fn create_playlist(&self, name: &str) -> Result<Playlist, rusqlite::Error> {
        let created_at = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO playlists (name, created_at) VALUES (?1, ?2)",
            params![name, created_at],
        )?;
        Ok(Playlist {
            id: self.conn.last_insert_rowid(),
            name: name.to_string(),
            created_at,
        })
    }

    pub fn get_or_create_playlist(&self, name: &str) -> Result<Playlist, rusqlite::Error> {
        match self.playlist_by_name(name)? {
            Some(playlist) => Ok(playlist),
            None => self.create_playlist(name),
        }
    }

    pub fn get_all_playlists(&self) -> Result<Vec<Playlist>, rusqlite::Error> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, created_at FROM playlists ORDER BY name")?;
        let rows = stmt.query_map([], |row| {
            Ok(Playlist {
                id: row.get(0)?,
                name: row.get(1)?,
                created_at: row.get(2)?,
            })
        })?;
        rows.collect()
    }

    /// Full-replace reconciliation: drops every current item and re-inserts
    /// the parsed list with contiguous 0-based positions, atomically.
    pub fn replace_playlist_items(
        &mut self,
        playlist_id: i64,
        entries: &[NewPlaylistItem],
    ) -> Result<(), rusqlite::Error> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "DELETE FROM playlist_items WHERE playlist_id = ?1",
            params![playlist_id],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO playlist_items
                     (playlist_id, track_path, track_title, track_duration, position)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for (position, entry) in entries.iter().enumerate() {
                stmt.execute(params![
                    playlist_id,
                    entry.track_path,
                    entry.track_title,
                    entry.track_duration,
                    position as i64,
                ])?;
            }
        }
        tx.commit()
    }

    pub fn playlist_items(&self, playlist_id: i64) -> Result<Vec<PlaylistItem>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, playlist_id, track_path, track_title, track_duration, position
             FROM playlist_items WHERE playlist_id = ?1 ORDER BY position ASC",
        )?;
        let rows = stmt.query_map(params![playlist_id], |row| {
            Ok(PlaylistItem {
                id: row.get(0)?,
                playlist_id: row.get(1)?,
                track_path: row.get(2)?,
                track_title: row.get(3)?,
                track_duration: row.get(4)?,
                position: row.get(5)?,
            })
        })?;
        rows.collect()
    }

    /// Appends after the current last position (0 for an empty playlist).
    pub fn append_playlist_item(
        &self,
        playlist_id: i64,
        entry: &NewPlaylistItem,
    ) -> Result<PlaylistItem, rusqlite::Error> {
        let position: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM playlist_items WHERE playlist_id = ?1",
            params![playlist_id],
            |row| row.get(0),
        )?;
        self.conn.execute(
            "INSERT INTO playlist_items
                 (playlist_id, track_path, track_title, track_duration, position)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                playlist_id,
                entry.track_path,
                entry.track_title,
                entry.track_duration,
                position,
            ],
        )?;
        Ok(PlaylistItem {
            id: self.conn.last_insert_rowid(),
            playlist_id,
            track_path: entry.track_path.clone(),
            track_title: entry.track_title.clone(),
            track_duration: entry.track_duration,
            position,
        })
    }

    /// Deletes one item, returning the owning playlist's id, or `None` when
    /// no such item exists.
    pub fn remove_playlist_item(&self, item_id: i64) -> Result<Option<i64>, rusqlite::Error> {
        let playlist_id: Option<i64> = self
            .conn
            .query_row(
                "SELECT playlist_id FROM playlist_items WHERE id = ?1",
                params![item_id],
                |row| row.get(0),
            )
            .optional()?;
        if playlist_id.is_some() {
            self.conn
                .execute("DELETE FROM playlist_items WHERE id = ?1", params![item_id])?;
        }
        Ok(playlist_id)
    }
}
