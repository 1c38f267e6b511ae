//! Photo item and attached image records.
//!
//! Items are created and mutated by the ingestion collaborator. The core only
//! reads status, dates and genres, and writes taken-date assignments back.

use crate::model::taken_date::TakenDate;
use crate::model::term::TermId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of an uploaded photo item.
pub type ItemId = Uuid;

/// Stable identifier of an attached image resource.
pub type ImageId = Uuid;

/// Publication state shared by items and images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    Published,
    NotPublished,
}

impl PostStatus {
    pub fn is_published(self) -> bool {
        self == Self::Published
    }

    pub(crate) fn as_db(self) -> &'static str {
        match self {
            Self::Published => "published",
            Self::NotPublished => "not_published",
        }
    }

    pub(crate) fn parse_db(value: &str) -> Option<Self> {
        match value {
            "published" => Some(Self::Published),
            "not_published" => Some(Self::NotPublished),
            _ => None,
        }
    }
}

/// Attached image resource of an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub image_id: ImageId,
    pub status: PostStatus,
    /// Path handed to the metadata reader.
    pub file_path: String,
    /// Upload time in Unix seconds, if the ingestion side recorded one.
    pub uploaded_at: Option<i64>,
}

impl Image {
    /// Creates a published image with a generated id.
    pub fn new(file_path: impl Into<String>) -> Self {
        Self {
            image_id: Uuid::new_v4(),
            status: PostStatus::Published,
            file_path: file_path.into(),
            uploaded_at: None,
        }
    }
}

/// Uploaded photo record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub item_id: ItemId,
    pub title: String,
    pub status: PostStatus,
    /// Date the item went live. `None` means not yet eligible for grouping.
    pub published_on: Option<NaiveDate>,
    /// Resolved capture date; `Unknown` until synchronized or when unresolved.
    pub taken_on: TakenDate,
    pub image_id: Option<ImageId>,
}

impl Item {
    /// Creates a published item with a generated id and no image attached.
    pub fn new(title: impl Into<String>, published_on: Option<NaiveDate>) -> Self {
        Self {
            item_id: Uuid::new_v4(),
            title: title.into(),
            status: PostStatus::Published,
            published_on,
            taken_on: TakenDate::Unknown,
            image_id: None,
        }
    }

    /// Attaches an image reference.
    pub fn with_image(mut self, image_id: ImageId) -> Self {
        self.image_id = Some(image_id);
        self
    }
}

/// Read model used for grouping and gallery building.
///
/// One row per published item with a publication date, carrying everything
/// the grouper and the gallery aggregator need without further lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMember {
    pub item_id: ItemId,
    pub item_status: PostStatus,
    pub published_on: NaiveDate,
    /// Genre terms assigned to the item, in assignment order.
    pub genre_ids: Vec<TermId>,
    pub image_id: Option<ImageId>,
    pub image_status: Option<PostStatus>,
}

impl GroupMember {
    /// Returns the attached image id when both item and image are published.
    pub fn published_image(&self) -> Option<ImageId> {
        if !self.item_status.is_published() {
            return None;
        }
        match (self.image_id, self.image_status) {
            (Some(image_id), Some(status)) if status.is_published() => Some(image_id),
            _ => None,
        }
    }
}
