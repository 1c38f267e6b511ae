//! Collection aggregate records.
//!
//! # Invariants
//! - At most one aggregate exists per `(date term, genre)` key.
//! - `image_ids` is the authoritative ordered gallery state with no
//!   duplicates; `body` and `layout` are rendered from it.

use crate::model::item::ImageId;
use crate::model::term::TermId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of a collection aggregate.
pub type AggregateId = Uuid;

/// Genre axis of a group key.
///
/// `All` is the sentinel bucket for items without any genre tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GenreKey {
    All,
    Term(TermId),
}

impl GenreKey {
    pub fn from_term_id(term_id: Option<TermId>) -> Self {
        term_id.map_or(Self::All, Self::Term)
    }

    pub fn term_id(self) -> Option<TermId> {
        match self {
            Self::All => None,
            Self::Term(term_id) => Some(term_id),
        }
    }
}

/// Grouping key: one aggregate per `(publication date, genre)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey {
    pub published_on: NaiveDate,
    pub genre: GenreKey,
}

/// Image-count-dependent layout marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GalleryLayout {
    Empty,
    Single,
    Grid,
}

impl GalleryLayout {
    pub fn for_count(count: usize) -> Self {
        match count {
            0 => Self::Empty,
            1 => Self::Single,
            _ => Self::Grid,
        }
    }

    pub(crate) fn as_db(self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Single => "single",
            Self::Grid => "grid",
        }
    }

    pub(crate) fn parse_db(value: &str) -> Option<Self> {
        match value {
            "empty" => Some(Self::Empty),
            "single" => Some(Self::Single),
            "grid" => Some(Self::Grid),
            _ => None,
        }
    }
}

/// Grouped collection record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregate {
    pub aggregate_id: AggregateId,
    pub title: String,
    pub body: String,
    pub layout: GalleryLayout,
    pub image_ids: Vec<ImageId>,
    pub genre: GenreKey,
    pub date_term_id: TermId,
}

impl Aggregate {
    /// Creates an aggregate with a generated id and a body rendered from
    /// `image_ids`.
    pub fn new(
        title: impl Into<String>,
        image_ids: Vec<ImageId>,
        genre: GenreKey,
        date_term_id: TermId,
    ) -> Self {
        let mut aggregate = Self {
            aggregate_id: Uuid::new_v4(),
            title: title.into(),
            body: String::new(),
            layout: GalleryLayout::Empty,
            image_ids: Vec::new(),
            genre,
            date_term_id,
        };
        aggregate.set_images(image_ids);
        aggregate
    }

    /// Replaces the gallery state and re-renders body and layout from it.
    pub fn set_images(&mut self, image_ids: Vec<ImageId>) {
        self.layout = GalleryLayout::for_count(image_ids.len());
        self.body = render_gallery_body(&image_ids);
        self.image_ids = image_ids;
    }
}

/// Renders the embedded gallery body for an ordered image-id list.
///
/// - no images: empty body
/// - one image: `[image id="…"]`
/// - more: `[gallery ids="…,…"]`
pub fn render_gallery_body(image_ids: &[ImageId]) -> String {
    match image_ids {
        [] => String::new(),
        [single] => format!("[image id=\"{single}\"]"),
        many => {
            let joined = many
                .iter()
                .map(ImageId::to_string)
                .collect::<Vec<_>>()
                .join(",");
            format!("[gallery ids=\"{joined}\"]")
        }
    }
}
