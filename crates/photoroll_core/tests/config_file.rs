use photoroll_core::{ConfigError, CoreConfig, TaxonomyKind};
use std::fs;

#[test]
fn missing_config_file_is_written_with_defaults() {
    let dir = tempfile::tempdir().unwrap();

    let config = CoreConfig::load_or_init(dir.path()).unwrap();
    assert_eq!(config, CoreConfig::default());

    let written = fs::read_to_string(dir.path().join("photoroll.json")).unwrap();
    assert!(written.contains("\"genre_taxonomy\": \"photo_genre\""));
    assert!(written.contains("\"hierarchical\""));
}

#[test]
fn existing_config_file_is_loaded() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("photoroll.json"),
        r#"{
            "genre_taxonomy": "genre",
            "taken_date_taxonomies": [{ "name": "shot_on", "kind": "flat" }],
            "all_genre_label": "Everything"
        }"#,
    )
    .unwrap();

    let config = CoreConfig::load_or_init(dir.path()).unwrap();
    assert_eq!(config.genre_taxonomy, "genre");
    assert_eq!(config.all_genre_label, "Everything");
    assert_eq!(config.taken_date_taxonomies.len(), 1);
    assert_eq!(config.taken_date_taxonomies[0].kind, TaxonomyKind::Flat);
    assert_eq!(config.published_date_taxonomy, "published_date");
}

#[test]
fn invalid_config_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("photoroll.json"),
        r#"{ "unknown_slug": "Not A Slug" }"#,
    )
    .unwrap();
    assert!(matches!(
        CoreConfig::load_or_init(dir.path()),
        Err(ConfigError::Invalid(_))
    ));

    fs::write(dir.path().join("photoroll.json"), "{ not json").unwrap();
    assert!(matches!(
        CoreConfig::load_or_init(dir.path()),
        Err(ConfigError::Parse(_))
    ));
}
