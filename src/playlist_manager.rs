//! Playlist synchronization between `.m3u`/`.m3u8` files and the catalog.
//!
//! The database is the source of truth for ordering and identity; playlist
//! files on disk are a derived export. `resync` pulls file contents into the
//! database with full-replace semantics, while `append_track`/`remove_track`
//! mutate the database first and then regenerate the file from the stored
//! item list, so the two representations cannot drift.

use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::db_manager::DbManager;
use crate::errors::PlaylistError;
use crate::models::{NewPlaylistItem, PlaylistItem};

pub const PLAYLIST_EXTENSIONS: [&str; 2] = ["m3u", "m3u8"];

pub fn is_playlist_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            PLAYLIST_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

fn collect_playlist_files(root: &Path) -> Vec<PathBuf> {
    let mut pending_directories = vec![root.to_path_buf()];
    let mut playlists = Vec::new();

    while let Some(directory) = pending_directories.pop() {
        let entries = match std::fs::read_dir(&directory) {
            Ok(entries) => entries,
            Err(err) => {
                debug!("Playlist resync: failed to read {}: {}", directory.display(), err);
                continue;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                pending_directories.push(path);
            } else if is_playlist_file(&path) {
                playlists.push(path);
            }
        }
    }

    playlists.sort_unstable();
    playlists
}

fn title_from_path(track_path: &str) -> String {
    Path::new(track_path)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("")
        .to_string()
}

fn parse_extinf(rest: &str) -> Option<(i64, String)> {
    let (duration, title) = rest.split_once(',')?;
    let duration = duration.trim().parse::<i64>().ok()?;
    Some((duration, title.trim().to_string()))
}

/// Parses extended-M3U text into playlist entries.
///
/// `#EXTINF:<duration>,<title>` annotates the immediately following
/// non-comment line; other `#` lines and blanks are ignored. A malformed
/// annotation is skipped (the track line still enters with duration 0 and a
/// file-stem title) so one bad line never loses the rest of the file.
pub fn parse_m3u(content: &str) -> Vec<NewPlaylistItem> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut entries = Vec::new();
    let mut pending: Option<(i64, String)> = None;

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(rest) = line.strip_prefix("#EXTINF:") {
            match parse_extinf(rest) {
                Some(annotation) => pending = Some(annotation),
                None => debug!("Playlist: skipping malformed EXTINF line '{}'", line),
            }
            continue;
        }
        if line.starts_with('#') {
            continue;
        }

        let (duration, title) = pending
            .take()
            .unwrap_or_else(|| (0, title_from_path(line)));
        entries.push(NewPlaylistItem::new(line, title, duration));
    }

    entries
}

/// Serializes items (already in position order) back to extended M3U.
/// `#EXTINF` is emitted only for items carrying a positive duration.
pub fn serialize_m3u(items: &[PlaylistItem]) -> String {
    let mut content = String::from("#EXTM3U\n");
    for item in items {
        if item.track_duration > 0 {
            content.push_str(&format!(
                "#EXTINF:{},{}\n",
                item.track_duration, item.track_title
            ));
        }
        content.push_str(&item.track_path);
        content.push('\n');
    }
    content
}

/// Track path relative to the playlist's directory, with forward slashes
/// regardless of host separator, so the file stays portable. Paths outside
/// the playlist directory are kept as given.
fn portable_relative_path(track_path: &Path, playlist_dir: &Path) -> String {
    let relative = match track_path.strip_prefix(playlist_dir) {
        Ok(relative) => relative,
        Err(_) => {
            return track_path
                .to_string_lossy()
                .replace(std::path::MAIN_SEPARATOR, "/")
        }
    };
    relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Regenerates the on-disk playlist file from the stored item list. Files
/// are always rewritten whole, never patched in place.
fn rewrite_playlist_file(
    db: &DbManager,
    playlist_dir: &Path,
    playlist_id: i64,
    name: &str,
) -> Result<(), PlaylistError> {
    let items = db.playlist_items(playlist_id)?;
    std::fs::write(playlist_dir.join(name), serialize_m3u(&items))?;
    Ok(())
}

/// Reconciles every playlist file under `music_root` into the database.
///
/// Each playlist is looked up by file basename (created when missing) and
/// its items are fully replaced with the freshly parsed list. Running this
/// twice over an unchanged tree yields identical rows. Unreadable files are
/// logged and skipped; only storage failures abort the resync.
pub fn resync(db: &mut DbManager, music_root: &Path) -> Result<usize, PlaylistError> {
    let mut synced = 0;
    for file_path in collect_playlist_files(music_root) {
        let name = match file_path.file_name().and_then(|name| name.to_str()) {
            Some(name) => name.to_string(),
            None => continue,
        };
        let content = match std::fs::read_to_string(&file_path) {
            Ok(content) => content,
            Err(err) => {
                warn!(
                    "Playlist resync: failed to read {}: {}",
                    file_path.display(),
                    err
                );
                continue;
            }
        };

        let entries = parse_m3u(&content);
        let playlist = db.get_or_create_playlist(&name)?;
        db.replace_playlist_items(playlist.id, &entries)?;
        debug!(
            "Playlist resync: {} now holds {} item(s)",
            name,
            entries.len()
        );
        synced += 1;
    }
    Ok(synced)
}

/// Playlist file names directly inside `playlist_dir` (non-recursive).
pub fn list_playlists(playlist_dir: &Path) -> Vec<String> {
    let entries = match std::fs::read_dir(playlist_dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(
                "Failed to list playlists in {}: {}",
                playlist_dir.display(),
                err
            );
            return Vec::new();
        }
    };

    let mut names: Vec<String> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_playlist_file(path))
        .filter_map(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .map(str::to_string)
        })
        .collect();
    names.sort();
    names
}

/// Appends one track to the named playlist (created when missing), commits,
/// then rewrites the playlist file from the post-commit item list.
pub fn append_track(
    db: &DbManager,
    playlist_dir: &Path,
    playlist_name: &str,
    track_path: &Path,
    title: Option<&str>,
    duration: i64,
) -> Result<PlaylistItem, PlaylistError> {
    let playlist = db.get_or_create_playlist(playlist_name)?;
    let relative = portable_relative_path(track_path, playlist_dir);
    let title = title
        .map(str::to_string)
        .unwrap_or_else(|| title_from_path(&relative));

    let item =
        db.append_playlist_item(playlist.id, &NewPlaylistItem::new(relative, title, duration))?;
    rewrite_playlist_file(db, playlist_dir, playlist.id, playlist_name)?;
    Ok(item)
}

/// Appends a catalog row by id, carrying its title and whole-second
/// duration into the playlist.
pub fn append_catalog_track(
    db: &DbManager,
    playlist_dir: &Path,
    playlist_name: &str,
    audio_file_id: i64,
) -> Result<PlaylistItem, PlaylistError> {
    let record = db
        .get_audio_file(audio_file_id)?
        .ok_or(PlaylistError::UnknownTrack(audio_file_id))?;
    append_track(
        db,
        playlist_dir,
        playlist_name,
        &record.full_path(),
        Some(&record.title),
        record.duration as i64,
    )
}

/// Deletes one playlist item and regenerates the owning playlist's file.
pub fn remove_track(
    db: &DbManager,
    playlist_dir: &Path,
    item_id: i64,
) -> Result<(), PlaylistError> {
    let playlist_id = db
        .remove_playlist_item(item_id)?
        .ok_or(PlaylistError::UnknownItem(item_id))?;
    let playlist = db
        .get_playlist(playlist_id)?
        .ok_or_else(|| PlaylistError::UnknownPlaylist(playlist_id.to_string()))?;
    rewrite_playlist_file(db, playlist_dir, playlist_id, &playlist.name)
}
