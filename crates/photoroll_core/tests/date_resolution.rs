use photoroll_core::{resolve_date, resolve_date_detailed, DateSource, RawImageMetadata, TakenDate};

#[test]
fn capture_tag_wins_over_file_name() {
    let metadata = RawImageMetadata {
        date_time_original: Some("2023:11:15 10:20:00".to_string()),
        file_name: Some("20200101-x.jpg".to_string()),
        ..RawImageMetadata::default()
    };

    let resolution = resolve_date_detailed(&metadata);
    assert_eq!(resolution.date, TakenDate::known("2023", "11", "15"));
    assert_eq!(resolution.source, Some(DateSource::CaptureTag));
}

#[test]
fn file_name_alone_resolves_date() {
    let metadata = RawImageMetadata {
        file_name: Some("20240701-sunset.jpg".to_string()),
        ..RawImageMetadata::default()
    };

    assert_eq!(resolve_date(&metadata), TakenDate::known("2024", "07", "01"));
}

#[test]
fn later_capture_tags_are_used_when_earlier_ones_are_missing() {
    let metadata = RawImageMetadata {
        date_time_digitized: Some("2019:02:03 04:05:06".to_string()),
        file_name: Some("20200101.jpg".to_string()),
        ..RawImageMetadata::default()
    };

    assert_eq!(resolve_date(&metadata), TakenDate::known("2019", "02", "03"));
}

#[test]
fn created_timestamp_is_last_resort() {
    let metadata = RawImageMetadata {
        file_name: Some("IMG_0042.jpg".to_string()),
        // 2021-03-04T05:06:07Z
        created_timestamp: Some(1_614_834_367),
        ..RawImageMetadata::default()
    };

    let resolution = resolve_date_detailed(&metadata);
    assert_eq!(resolution.date, TakenDate::known("2021", "03", "04"));
    assert_eq!(resolution.source, Some(DateSource::CreatedTimestamp));
}

#[test]
fn exhausted_sources_resolve_to_unknown() {
    let metadata = RawImageMetadata {
        date_time_original: Some("not a date".to_string()),
        file_name: Some("holiday.jpg".to_string()),
        created_timestamp: Some(0),
        ..RawImageMetadata::default()
    };

    let resolution = resolve_date_detailed(&metadata);
    assert!(resolution.date.is_unknown());
    assert_eq!(resolution.source, None);
}
