#![allow(dead_code)]

use chrono::NaiveDate;
use photoroll_core::{
    open_db_in_memory, CoreConfig, Image, ImageId, ImageMetadataReader, Item, ItemId,
    ItemRepository, MetadataReadError, RawImageMetadata, SqliteItemRepository,
    SqliteTermRepository, TermId, TermRepository, TermSpec,
};
use rusqlite::Connection;
use std::collections::HashMap;

/// Migrated in-memory database with every default taxonomy registered.
pub fn setup() -> (Connection, CoreConfig) {
    let conn = open_db_in_memory().unwrap();
    let config = CoreConfig::default();
    let terms = SqliteTermRepository::try_new(&conn).unwrap();
    config.register_taxonomies(&terms).unwrap();
    (conn, config)
}

pub fn day(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn add_genre(
    terms: &impl TermRepository,
    config: &CoreConfig,
    slug: &str,
    name: &str,
) -> TermId {
    terms
        .ensure_term(&TermSpec::flat(config.genre_taxonomy.as_str(), slug, name))
        .unwrap()
        .term_id
}

/// Inserts a published item with a published image and assigns `genres`.
pub fn add_photo(
    items: &SqliteItemRepository<'_>,
    config: &CoreConfig,
    published_on: NaiveDate,
    genres: &[TermId],
    file_path: &str,
) -> (ItemId, ImageId) {
    let image = Image::new(file_path);
    items.insert_image(&image).unwrap();
    let item = Item::new(file_path, Some(published_on)).with_image(image.image_id);
    items.insert_item(&item).unwrap();
    items
        .replace_item_terms(item.item_id, &config.genre_taxonomy, genres)
        .unwrap();
    (item.item_id, image.image_id)
}

/// Metadata reader answering from a fixed table keyed by file path.
#[derive(Default)]
pub struct FakeMetadataReader {
    entries: HashMap<String, RawImageMetadata>,
}

impl FakeMetadataReader {
    pub fn with(mut self, file_path: &str, metadata: RawImageMetadata) -> Self {
        self.entries.insert(file_path.to_string(), metadata);
        self
    }
}

impl ImageMetadataReader for FakeMetadataReader {
    fn read_metadata(&self, image: &Image) -> Result<RawImageMetadata, MetadataReadError> {
        self.entries
            .get(&image.file_path)
            .cloned()
            .ok_or_else(|| MetadataReadError {
                file_path: image.file_path.clone(),
                message: "no such file".to_string(),
            })
    }
}
