//! Multi-field substring search over the catalog.

use log::warn;

use crate::db_manager::DbManager;
use crate::models::AudioFileRecord;

/// Columns the search may match against. A closed set: field names never
/// come from caller input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Artist,
    Title,
    Album,
    Genre,
    Composer,
    Label,
}

impl SearchField {
    fn column(self) -> &'static str {
        match self {
            SearchField::Artist => "artist",
            SearchField::Title => "title",
            SearchField::Album => "album",
            SearchField::Genre => "genre",
            SearchField::Composer => "composer",
            SearchField::Label => "label",
        }
    }
}

pub const DEFAULT_SEARCH_FIELDS: [SearchField; 3] =
    [SearchField::Artist, SearchField::Title, SearchField::Album];

/// Case-insensitive substring search with broad recall: a record matches
/// when ANY selected field contains ANY term (OR across terms and fields,
/// deliberately not an AND filter). Results are distinct, ordered by
/// `last_modified` descending, and paginated with 1-based page numbers.
///
/// An empty term list returns empty without touching storage, and any
/// storage error degrades to an empty result rather than propagating.
pub fn search(
    db: &DbManager,
    terms: &[String],
    fields: &[SearchField],
    page: usize,
    page_size: usize,
) -> Vec<AudioFileRecord> {
    let patterns: Vec<String> = terms
        .iter()
        .map(|term| term.trim().to_lowercase())
        .filter(|term| !term.is_empty())
        .map(|term| format!("%{}%", term))
        .collect();
    if patterns.is_empty() || fields.is_empty() || page_size == 0 {
        return Vec::new();
    }

    let columns: Vec<&'static str> = fields.iter().map(|field| field.column()).collect();
    let page = page.max(1);
    let offset = ((page - 1) * page_size) as i64;

    match db.search_audio_files(&columns, &patterns, page_size as i64, offset) {
        Ok(records) => records,
        Err(err) => {
            warn!("Search failed, returning no results: {}", err);
            Vec::new()
        }
    }
}

/// Single-query-string convenience over the default field set.
pub fn search_text(
    db: &DbManager,
    query: &str,
    page: usize,
    page_size: usize,
) -> Vec<AudioFileRecord> {
    search(
        db,
        &[query.to_string()],
        &DEFAULT_SEARCH_FIELDS,
        page,
        page_size,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UNKNOWN_TAG;

    fn record(artist: &str, title: &str, last_modified: i64) -> AudioFileRecord {
        AudioFileRecord {
            id: None,
            path: "/music".to_string(),
            filename: format!("{}.mp3", title.to_lowercase().replace(' ', "-")),
            title: title.to_string(),
            album: UNKNOWN_TAG.to_string(),
            artist: artist.to_string(),
            genre: UNKNOWN_TAG.to_string(),
            composer: UNKNOWN_TAG.to_string(),
            comment: UNKNOWN_TAG.to_string(),
            label: UNKNOWN_TAG.to_string(),
            isrc: UNKNOWN_TAG.to_string(),
            key: UNKNOWN_TAG.to_string(),
            year: None,
            duration: 0.0,
            bitrate: 0,
            track_number: UNKNOWN_TAG.to_string(),
            disc_number: UNKNOWN_TAG.to_string(),
            bpm: UNKNOWN_TAG.to_string(),
            replaygain: UNKNOWN_TAG.to_string(),
            cover_art: None,
            last_modified,
        }
    }

    #[test]
    fn test_search_matches_substring_case_insensitively() {
        let mut db = DbManager::new_in_memory().expect("failed to create in-memory db");
        db.upsert_batch(&[record("The Beatles", "Taxman", 10)])
            .expect("upsert should succeed");

        let results = search_text(&db, "beatles", 1, 20);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].artist, "The Beatles");
    }

    #[test]
    fn test_search_empty_query_returns_empty() {
        let db = DbManager::new_in_memory().expect("failed to create in-memory db");
        assert!(search_text(&db, "", 1, 20).is_empty());
        assert!(search_text(&db, "   ", 1, 20).is_empty());
        assert!(search(&db, &[], &DEFAULT_SEARCH_FIELDS, 1, 20).is_empty());
    }

    #[test]
    fn test_search_is_or_across_terms_and_fields() {
        let mut db = DbManager::new_in_memory().expect("failed to create in-memory db");
        db.upsert_batch(&[
            record("The Beatles", "Taxman", 10),
            record("Orbital", "Halcyon", 20),
        ])
        .expect("upsert should succeed");

        let results = search(
            &db,
            &["beatles".to_string(), "halcyon".to_string()],
            &DEFAULT_SEARCH_FIELDS,
            1,
            20,
        );
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_search_orders_by_last_modified_and_paginates() {
        let mut db = DbManager::new_in_memory().expect("failed to create in-memory db");
        db.upsert_batch(&[
            record("Sharers", "Oldest", 10),
            record("Sharers", "Middle", 20),
            record("Sharers", "Newest", 30),
        ])
        .expect("upsert should succeed");

        let first_page = search_text(&db, "sharers", 1, 2);
        assert_eq!(first_page.len(), 2);
        assert_eq!(first_page[0].title, "Newest");
        assert_eq!(first_page[1].title, "Middle");

        let second_page = search_text(&db, "sharers", 2, 2);
        assert_eq!(second_page.len(), 1);
        assert_eq!(second_page[0].title, "Oldest");
    }

    #[test]
    fn test_search_swallows_storage_errors() {
        let db = DbManager::new_in_memory().expect("failed to create in-memory db");
        db.execute_raw("DROP TABLE audio_files")
            .expect("drop should succeed");

        assert!(search_text(&db, "anything", 1, 20).is_empty());
    }
}
