//! Tag extraction behind an injectable reader seam, backed by `lofty`.
//!
//! A [`TagReader`] hands back the raw tag set of one file; this module
//! normalizes it into the canonical [`AudioFileRecord`]: absent text tags
//! become the "Unknown" sentinel, the year falls back from a full date to a
//! bare year, and `last_modified` always comes from the filesystem.

use std::path::Path;

use chrono::{Datelike, NaiveDate};

use lofty::error::{ErrorKind, LoftyError};
use lofty::file::{AudioFile, TaggedFileExt};
use lofty::prelude::Accessor;
use lofty::read_from_path;
use lofty::tag::{ItemKey, Tag};

use crate::errors::ExtractionFailure;
use crate::media_file_discovery::file_modified_unix_ms;
use crate::models::{AudioFileRecord, UNKNOWN_TAG};

/// Raw tag values handed over by a reader; `None` marks an absent tag.
#[derive(Debug, Clone, Default)]
pub struct RawTags {
    pub title: Option<String>,
    pub album: Option<String>,
    pub artist: Option<String>,
    pub genre: Option<String>,
    pub composer: Option<String>,
    pub comment: Option<String>,
    pub publisher: Option<String>,
    pub isrc: Option<String>,
    pub key: Option<String>,
    /// Date-like tag text, e.g. "2020-05-01" or "2020".
    pub date: Option<String>,
    pub track_number: Option<String>,
    pub disc_number: Option<String>,
    pub bpm: Option<String>,
    pub replaygain: Option<String>,
    pub cover_art: Option<Vec<u8>>,
    /// Stream length in seconds, 0.0 when the container reports none.
    pub duration_seconds: f64,
    /// Audio bitrate in kbps, 0 when unknown.
    pub bitrate_kbps: i64,
}

/// The injected metadata-reading capability.
pub trait TagReader {
    fn read(&self, path: &Path) -> Result<RawTags, ExtractionFailure>;
}

/// Production reader backed by `lofty`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoftyTagReader;

fn classify_lofty_error(err: LoftyError) -> ExtractionFailure {
    match err.kind() {
        ErrorKind::UnknownFormat => ExtractionFailure::Unsupported,
        ErrorKind::FileDecoding(decode_err) => ExtractionFailure::Corrupt(decode_err.to_string()),
        _ => ExtractionFailure::Unexpected(err.to_string()),
    }
}

fn first_non_empty_value<F>(primary_tag: Option<&Tag>, tags: &[Tag], mut extractor: F) -> Option<String>
where
    F: FnMut(&Tag) -> Option<String>,
{
    if let Some(tag) = primary_tag {
        if let Some(value) = extractor(tag) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }

    for tag in tags {
        if let Some(value) = extractor(tag) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
    }

    None
}

fn first_cover_art(primary_tag: Option<&Tag>, tags: &[Tag]) -> Option<Vec<u8>> {
    if let Some(tag) = primary_tag {
        if let Some(picture) = tag.pictures().first() {
            return Some(picture.data().to_vec());
        }
    }

    for tag in tags {
        if let Some(picture) = tag.pictures().first() {
            return Some(picture.data().to_vec());
        }
    }

    None
}

impl TagReader for LoftyTagReader {
    fn read(&self, path: &Path) -> Result<RawTags, ExtractionFailure> {
        let tagged_file = read_from_path(path).map_err(classify_lofty_error)?;
        let properties = tagged_file.properties();
        let primary_tag = tagged_file.primary_tag();
        let tags = tagged_file.tags();

        Ok(RawTags {
            title: first_non_empty_value(primary_tag, tags, |tag| {
                tag.title().map(|value| value.into_owned())
            }),
            album: first_non_empty_value(primary_tag, tags, |tag| {
                tag.album().map(|value| value.into_owned())
            }),
            artist: first_non_empty_value(primary_tag, tags, |tag| {
                tag.artist().map(|value| value.into_owned())
            }),
            genre: first_non_empty_value(primary_tag, tags, |tag| {
                tag.genre().map(|value| value.into_owned())
            }),
            composer: first_non_empty_value(primary_tag, tags, |tag| {
                tag.get_string(ItemKey::Composer).map(str::to_string)
            }),
            comment: first_non_empty_value(primary_tag, tags, |tag| {
                tag.comment()
                    .map(|value| value.into_owned())
                    .or_else(|| tag.get_string(ItemKey::Comment).map(str::to_string))
            }),
            publisher: first_non_empty_value(primary_tag, tags, |tag| {
                tag.get_string(ItemKey::Publisher).map(str::to_string)
            }),
            isrc: first_non_empty_value(primary_tag, tags, |tag| {
                tag.get_string(ItemKey::Isrc).map(str::to_string)
            }),
            key: first_non_empty_value(primary_tag, tags, |tag| {
                tag.get_string(ItemKey::InitialKey).map(str::to_string)
            }),
            date: first_non_empty_value(primary_tag, tags, |tag| {
                tag.get_string(ItemKey::RecordingDate)
                    .or_else(|| tag.get_string(ItemKey::OriginalReleaseDate))
                    .or_else(|| tag.get_string(ItemKey::Year))
                    .map(str::to_string)
            }),
            track_number: first_non_empty_value(primary_tag, tags, |tag| {
                tag.get_string(ItemKey::TrackNumber)
                    .map(str::to_string)
                    .or_else(|| tag.track().map(|value| value.to_string()))
            }),
            disc_number: first_non_empty_value(primary_tag, tags, |tag| {
                tag.get_string(ItemKey::DiscNumber)
                    .map(str::to_string)
                    .or_else(|| tag.disk().map(|value| value.to_string()))
            }),
            bpm: first_non_empty_value(primary_tag, tags, |tag| {
                tag.get_string(ItemKey::Bpm)
                    .or_else(|| tag.get_string(ItemKey::IntegerBpm))
                    .map(str::to_string)
            }),
            replaygain: first_non_empty_value(primary_tag, tags, |tag| {
                tag.get_string(ItemKey::ReplayGainTrackGain).map(str::to_string)
            }),
            cover_art: first_cover_art(primary_tag, tags),
            duration_seconds: properties.duration().as_secs_f64(),
            bitrate_kbps: properties
                .audio_bitrate()
                .or_else(|| properties.overall_bitrate())
                .map(i64::from)
                .unwrap_or(0),
        })
    }
}

/// Two-stage year fallback: full `%Y-%m-%d` date first, then a bare year.
/// Anything else is the "Unknown" sentinel (`None`).
fn parse_year_tag(raw: &str) -> Option<i32> {
    let trimmed = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Some(date.year());
    }
    trimmed.parse::<i32>().ok()
}

fn text_or_unknown(value: Option<String>) -> String {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| UNKNOWN_TAG.to_string())
}

/// Reads one file through `reader` and normalizes the result into the
/// canonical catalog record. `last_modified` comes from the filesystem,
/// never from tags.
pub fn extract_record(
    reader: &dyn TagReader,
    file_path: &Path,
) -> Result<AudioFileRecord, ExtractionFailure> {
    let tags = reader.read(file_path)?;

    let path = file_path
        .parent()
        .map(|parent| parent.to_string_lossy().to_string())
        .unwrap_or_default();
    let filename = file_path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    let year = tags.date.as_deref().and_then(parse_year_tag);

    Ok(AudioFileRecord {
        id: None,
        path,
        filename,
        title: text_or_unknown(tags.title),
        album: text_or_unknown(tags.album),
        artist: text_or_unknown(tags.artist),
        genre: text_or_unknown(tags.genre),
        composer: text_or_unknown(tags.composer),
        comment: text_or_unknown(tags.comment),
        label: text_or_unknown(tags.publisher),
        isrc: text_or_unknown(tags.isrc),
        key: text_or_unknown(tags.key),
        year,
        duration: tags.duration_seconds,
        bitrate: tags.bitrate_kbps,
        track_number: text_or_unknown(tags.track_number),
        disc_number: text_or_unknown(tags.disc_number),
        bpm: text_or_unknown(tags.bpm),
        replaygain: text_or_unknown(tags.replaygain),
        cover_art: tags.cover_art,
        last_modified: file_modified_unix_ms(file_path),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct FixedTagReader {
        tags: RawTags,
    }

    impl TagReader for FixedTagReader {
        fn read(&self, _path: &Path) -> Result<RawTags, ExtractionFailure> {
            Ok(self.tags.clone())
        }
    }

    #[test]
    fn test_parse_year_tag_accepts_full_date() {
        assert_eq!(parse_year_tag("2020-05-01"), Some(2020));
    }

    #[test]
    fn test_parse_year_tag_accepts_bare_year() {
        assert_eq!(parse_year_tag("2020"), Some(2020));
    }

    #[test]
    fn test_parse_year_tag_rejects_everything_else() {
        assert_eq!(parse_year_tag("not-a-date"), None);
        assert_eq!(parse_year_tag("2020-13-45"), None);
        assert_eq!(parse_year_tag(""), None);
    }

    #[test]
    fn test_extract_record_fills_unknown_sentinels() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let file_path = dir.path().join("silence.mp3");
        std::fs::write(&file_path, b"").expect("failed to create file");

        let reader = FixedTagReader {
            tags: RawTags::default(),
        };
        let record = extract_record(&reader, &file_path).expect("extraction should succeed");

        assert_eq!(record.title, UNKNOWN_TAG);
        assert_eq!(record.artist, UNKNOWN_TAG);
        assert_eq!(record.album, UNKNOWN_TAG);
        assert_eq!(record.bpm, UNKNOWN_TAG);
        assert_eq!(record.year, None);
        assert_eq!(record.duration, 0.0);
        assert_eq!(record.bitrate, 0);
        assert_eq!(record.cover_art, None);
        assert_eq!(record.filename, "silence.mp3");
        assert_eq!(PathBuf::from(&record.path), dir.path());
        assert!(record.last_modified > 0);
    }

    #[test]
    fn test_extract_record_keeps_verbatim_numeric_text_fields() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let file_path = dir.path().join("tagged.flac");
        std::fs::write(&file_path, b"").expect("failed to create file");

        let reader = FixedTagReader {
            tags: RawTags {
                title: Some("Ten Stories".to_string()),
                artist: Some("  The Narrators  ".to_string()),
                date: Some("1998-10-31".to_string()),
                track_number: Some("3/12".to_string()),
                bpm: Some("174".to_string()),
                duration_seconds: 241.5,
                bitrate_kbps: 320,
                ..RawTags::default()
            },
        };
        let record = extract_record(&reader, &file_path).expect("extraction should succeed");

        assert_eq!(record.title, "Ten Stories");
        assert_eq!(record.artist, "The Narrators");
        assert_eq!(record.year, Some(1998));
        assert_eq!(record.track_number, "3/12");
        assert_eq!(record.bpm, "174");
        assert_eq!(record.duration, 241.5);
        assert_eq!(record.bitrate, 320);
    }
}
