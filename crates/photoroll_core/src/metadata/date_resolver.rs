//! Capture-date resolution over a prioritized source chain.
//!
//! Sources, first success wins:
//! 1. EXIF capture tags (`DateTimeOriginal`, `DateTime`, `DateTimeDigitized`),
//!    validated as real calendar dates.
//! 2. An eight-digit `YYYYMMDD` file-name prefix, split without calendar
//!    validation.
//! 3. The generic creation timestamp, decomposed in UTC.
//!
//! Exhausting all sources yields `TakenDate::Unknown`, which is not an error.

use crate::metadata::RawImageMetadata;
use crate::model::taken_date::TakenDate;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

static CAPTURE_TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]{4}):([0-9]{2}):([0-9]{2})(?:[ T][0-9]{2}:[0-9]{2}:[0-9]{2})?")
        .expect("valid capture tag regex")
});
static FILE_NAME_PREFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]{4})([0-9]{2})([0-9]{2})(?:[^0-9]|$)").expect("valid file name regex")
});

/// Source that produced a resolved date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSource {
    CaptureTag,
    FileName,
    CreatedTimestamp,
}

impl DateSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CaptureTag => "capture_tag",
            Self::FileName => "file_name",
            Self::CreatedTimestamp => "created_timestamp",
        }
    }
}

/// Resolved date plus the source that produced it (`None` when unknown).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateResolution {
    pub date: TakenDate,
    pub source: Option<DateSource>,
}

/// Resolves the capture date of one image.
pub fn resolve_date(metadata: &RawImageMetadata) -> TakenDate {
    resolve_date_detailed(metadata).date
}

/// Resolves the capture date and reports which source won.
pub fn resolve_date_detailed(metadata: &RawImageMetadata) -> DateResolution {
    let capture_tags = [
        metadata.date_time_original.as_deref(),
        metadata.date_time.as_deref(),
        metadata.date_time_digitized.as_deref(),
    ];
    if let Some(date) = capture_tags.into_iter().flatten().find_map(parse_capture_tag) {
        return DateResolution {
            date,
            source: Some(DateSource::CaptureTag),
        };
    }

    if let Some(date) = file_stem(metadata).and_then(|stem| parse_file_name_prefix(&stem)) {
        return DateResolution {
            date,
            source: Some(DateSource::FileName),
        };
    }

    if let Some(date) = metadata.created_timestamp.and_then(parse_created_timestamp) {
        return DateResolution {
            date,
            source: Some(DateSource::CreatedTimestamp),
        };
    }

    DateResolution {
        date: TakenDate::Unknown,
        source: None,
    }
}

/// Parses `YYYY:MM:DD[ HH:MM:SS]`; rejects impossible calendar dates.
fn parse_capture_tag(value: &str) -> Option<TakenDate> {
    let captures = CAPTURE_TAG_RE.captures(value.trim())?;
    let (year, month, day) = (&captures[1], &captures[2], &captures[3]);
    let iso = format!("{year}-{month}-{day}");
    NaiveDate::parse_from_str(&iso, "%Y-%m-%d").ok()?;
    Some(TakenDate::known(year, month, day))
}

fn parse_file_name_prefix(stem: &str) -> Option<TakenDate> {
    let captures = FILE_NAME_PREFIX_RE.captures(stem)?;
    Some(TakenDate::known(&captures[1], &captures[2], &captures[3]))
}

fn parse_created_timestamp(timestamp: i64) -> Option<TakenDate> {
    if timestamp <= 0 {
        return None;
    }
    let date = DateTime::<Utc>::from_timestamp(timestamp, 0)?.date_naive();
    Some(TakenDate::known(
        format!("{:04}", date.year()),
        format!("{:02}", date.month()),
        format!("{:02}", date.day()),
    ))
}

fn file_stem(metadata: &RawImageMetadata) -> Option<String> {
    let name = metadata
        .file_name
        .as_deref()
        .or(metadata.file_path.as_deref())?;
    Path::new(name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::{parse_capture_tag, parse_file_name_prefix, resolve_date_detailed, DateSource};
    use crate::metadata::RawImageMetadata;
    use crate::model::taken_date::TakenDate;

    #[test]
    fn capture_tag_rejects_impossible_dates() {
        assert!(parse_capture_tag("2023:13:01 10:00:00").is_none());
        assert!(parse_capture_tag("2023:02:30 10:00:00").is_none());
        assert!(parse_capture_tag("0000:00:00 00:00:00").is_none());
        assert_eq!(
            parse_capture_tag(" 2024:02:29 23:59:59 "),
            Some(TakenDate::known("2024", "02", "29"))
        );
    }

    #[test]
    fn file_name_prefix_needs_exactly_eight_leading_digits() {
        assert_eq!(
            parse_file_name_prefix("20240701-sunset"),
            Some(TakenDate::known("2024", "07", "01"))
        );
        assert_eq!(
            parse_file_name_prefix("20240701"),
            Some(TakenDate::known("2024", "07", "01"))
        );
        assert!(parse_file_name_prefix("202407011-burst").is_none());
        assert!(parse_file_name_prefix("IMG_20240701").is_none());
        assert!(parse_file_name_prefix("2024070").is_none());
    }

    #[test]
    fn non_ascii_digits_fall_through_to_created_timestamp() {
        let metadata = RawImageMetadata {
            date_time_original: Some(
                "\u{0662}\u{0660}\u{0662}\u{0664}:07:01 10:00:00".to_string(),
            ),
            file_name: Some(
                "\u{0662}\u{0660}\u{0662}\u{0664}\u{0660}\u{0667}\u{0660}\u{0661}-sunset.jpg"
                    .to_string(),
            ),
            // 2021-03-04T05:06:07Z
            created_timestamp: Some(1_614_834_367),
            ..RawImageMetadata::default()
        };
        let resolution = resolve_date_detailed(&metadata);
        assert_eq!(resolution.date, TakenDate::known("2021", "03", "04"));
        assert_eq!(resolution.source, Some(DateSource::CreatedTimestamp));
    }

    #[test]
    fn ascii_prefix_followed_by_non_ascii_digit_is_accepted() {
        assert_eq!(
            parse_file_name_prefix("20240701\u{0661}"),
            Some(TakenDate::known("2024", "07", "01"))
        );
    }

    #[test]
    fn file_name_prefix_is_not_calendar_checked() {
        assert_eq!(
            parse_file_name_prefix("20241399_scan"),
            Some(TakenDate::known("2024", "13", "99"))
        );
    }

    #[test]
    fn invalid_original_tag_falls_through_to_next_tag() {
        let metadata = RawImageMetadata {
            date_time_original: Some("2023:02:30 10:00:00".to_string()),
            date_time: Some("2023:03:01 08:00:00".to_string()),
            ..RawImageMetadata::default()
        };
        let resolution = resolve_date_detailed(&metadata);
        assert_eq!(resolution.date, TakenDate::known("2023", "03", "01"));
        assert_eq!(resolution.source, Some(DateSource::CaptureTag));
    }

    #[test]
    fn zero_created_timestamp_counts_as_absent() {
        let metadata = RawImageMetadata {
            created_timestamp: Some(0),
            ..RawImageMetadata::default()
        };
        let resolution = resolve_date_detailed(&metadata);
        assert!(resolution.date.is_unknown());
        assert_eq!(resolution.source, None);
    }

    #[test]
    fn file_path_is_used_when_file_name_missing() {
        let metadata = RawImageMetadata {
            file_path: Some("/uploads/2024/07/20240715-beach.jpeg".to_string()),
            ..RawImageMetadata::default()
        };
        assert_eq!(
            resolve_date_detailed(&metadata).source,
            Some(DateSource::FileName)
        );
    }
}
