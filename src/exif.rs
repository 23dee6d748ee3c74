//! Metadata extraction from in-memory image bytes.
//!
//! Both readers are total: any non-image, truncated, or corrupt input yields
//! `None`, never an error. They are called on bytes that already passed the
//! fetcher's content-type gate, so a miss here just means the image carries
//! no usable metadata.

use std::io::Cursor;

use chrono::NaiveDateTime;
use nom_exif::{EntryValue, Exif, ExifIter, ExifTag, MediaParser, MediaSource};

use crate::report::Dimensions;

/// Extract the EXIF capture time as an ISO-8601 string.
///
/// Prefers `DateTimeOriginal` and falls back to `CreateDate`.
pub fn capture_time(bytes: &[u8]) -> Option<String> {
    if bytes.is_empty() {
        return None;
    }
    let source = MediaSource::seekable(Cursor::new(bytes)).ok()?;
    if !source.has_exif() {
        return None;
    }

    let mut parser = MediaParser::new();
    let iter: ExifIter = parser.parse(source).ok()?;
    let exif: Exif = iter.into();

    let entry = exif
        .get(ExifTag::DateTimeOriginal)
        .or_else(|| exif.get(ExifTag::CreateDate))?;
    entry_to_timestamp(entry)
}

/// Normalize an EXIF date entry to ISO-8601.
fn entry_to_timestamp(entry: &EntryValue) -> Option<String> {
    if let EntryValue::Time(time) = entry {
        return Some(time.to_rfc3339());
    }
    // Some files carry the raw "YYYY:MM:DD HH:MM:SS" text instead.
    normalize_exif_datetime(&entry.to_string())
}

fn normalize_exif_datetime(raw: &str) -> Option<String> {
    let raw = raw.trim().trim_matches('"');
    NaiveDateTime::parse_from_str(raw, "%Y:%m:%d %H:%M:%S")
        .ok()
        .map(|t| t.format("%Y-%m-%dT%H:%M:%S").to_string())
}

/// Probe the pixel dimensions without decoding the full image.
pub fn dimensions(bytes: &[u8]) -> Option<Dimensions> {
    let reader = image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?;
    let (width, height) = reader.into_dimensions().ok()?;
    if width == 0 || height == 0 {
        return None;
    }
    Some(Dimensions { width, height })
}
