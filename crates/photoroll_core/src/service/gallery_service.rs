//! Gallery aggregate build and merge use-cases.
//!
//! # Responsibility
//! - Build a new aggregate for one group from its published images.
//! - Merge the current published images of a group into its existing
//!   aggregate, dropping images whose source is no longer published.
//!
//! # Invariants
//! - Only images whose item and image are both published are embedded.
//! - Image ids are unique within an aggregate and keep first-seen order.
//! - An empty merge clears the gallery body but keeps the aggregate.
//! - Genre and date term assignments are single-valued and overwritten on
//!   every update.

use crate::config::CoreConfig;
use crate::model::aggregate::{Aggregate, GenreKey};
use crate::model::item::{GroupMember, ImageId};
use crate::model::term::TermId;
use crate::repo::aggregate_repo::{AggregateRepoError, AggregateRepository};
use crate::repo::term_repo::{TermRepoError, TermRepository};
use chrono::NaiveDate;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from gallery build/merge operations.
#[derive(Debug)]
pub enum GalleryError {
    /// Genre term referenced by the group key does not exist.
    GenreNotFound(TermId),
    /// Genre name lookup failed.
    Terms(TermRepoError),
    /// Aggregate insert/update was rejected.
    Write(AggregateRepoError),
}

impl Display for GalleryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GenreNotFound(id) => write!(f, "genre term not found: {id}"),
            Self::Terms(err) => write!(f, "{err}"),
            Self::Write(err) => write!(f, "aggregate write failed: {err}"),
        }
    }
}

impl Error for GalleryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::GenreNotFound(_) => None,
            Self::Terms(err) => Some(err),
            Self::Write(err) => Some(err),
        }
    }
}

impl From<TermRepoError> for GalleryError {
    fn from(value: TermRepoError) -> Self {
        Self::Terms(value)
    }
}

impl From<AggregateRepoError> for GalleryError {
    fn from(value: AggregateRepoError) -> Self {
        Self::Write(value)
    }
}

/// Result of the create path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Created(Aggregate),
    /// No published image in the group; nothing was created.
    NoPublishedImages,
}

/// Result of the update path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated(Aggregate),
    /// Merged state equals the stored state; nothing was written.
    Unchanged,
}

/// Builds and merges collection aggregates.
pub struct GalleryService<A: AggregateRepository, T: TermRepository> {
    aggregates: A,
    terms: T,
    all_genre_label: String,
    title_separator: String,
}

impl<A: AggregateRepository, T: TermRepository> GalleryService<A, T> {
    /// Creates service from repository implementations.
    pub fn new(aggregates: A, terms: T, config: &CoreConfig) -> Self {
        Self {
            aggregates,
            terms,
            all_genre_label: config.all_genre_label.clone(),
            title_separator: config.title_separator.clone(),
        }
    }

    /// Creates the aggregate of one group.
    ///
    /// Returns `NoPublishedImages` without writing when no member carries a
    /// published image.
    pub fn create(
        &self,
        genre: GenreKey,
        members: &[GroupMember],
        published_on: NaiveDate,
        date_term_id: TermId,
    ) -> Result<CreateOutcome, GalleryError> {
        let image_ids = collect_published_images(members);
        if image_ids.is_empty() {
            return Ok(CreateOutcome::NoPublishedImages);
        }

        let title = self.build_title(published_on, genre)?;
        let aggregate = Aggregate::new(title, image_ids, genre, date_term_id);
        self.aggregates.insert_aggregate(&aggregate)?;
        Ok(CreateOutcome::Created(aggregate))
    }

    /// Merges the group's current published images into `existing`.
    pub fn update(
        &self,
        existing: &Aggregate,
        members: &[GroupMember],
        genre: GenreKey,
        published_on: NaiveDate,
        date_term_id: TermId,
    ) -> Result<UpdateOutcome, GalleryError> {
        let current = collect_published_images(members);
        let merged = merge_image_ids(&existing.image_ids, &current);

        let mut next = existing.clone();
        next.title = self.build_title(published_on, genre)?;
        next.genre = genre;
        next.date_term_id = date_term_id;
        next.set_images(merged);

        if next == *existing {
            return Ok(UpdateOutcome::Unchanged);
        }
        self.aggregates.update_aggregate(&next)?;
        Ok(UpdateOutcome::Updated(next))
    }

    /// Builds `"{date}{separator}{genre name}"`.
    pub fn build_title(
        &self,
        published_on: NaiveDate,
        genre: GenreKey,
    ) -> Result<String, GalleryError> {
        let genre_name = match genre {
            GenreKey::All => self.all_genre_label.clone(),
            GenreKey::Term(term_id) => {
                self.terms
                    .get_term(term_id)?
                    .ok_or(GalleryError::GenreNotFound(term_id))?
                    .display_name
            }
        };
        Ok(format!(
            "{}{}{}",
            published_on.format("%Y-%m-%d"),
            self.title_separator,
            genre_name
        ))
    }
}

/// Published image ids of `members`, deduplicated in first-seen order.
pub fn collect_published_images(members: &[GroupMember]) -> Vec<ImageId> {
    let mut seen = HashSet::new();
    members
        .iter()
        .filter_map(GroupMember::published_image)
        .filter(|image_id| seen.insert(*image_id))
        .collect()
}

/// Keeps previously embedded ids that are still published, then appends
/// newly published ids in encounter order.
pub fn merge_image_ids(previous: &[ImageId], current: &[ImageId]) -> Vec<ImageId> {
    let current_set: HashSet<ImageId> = current.iter().copied().collect();
    let mut merged: Vec<ImageId> = Vec::with_capacity(current.len());
    let mut seen = HashSet::new();

    for image_id in previous {
        if current_set.contains(image_id) && seen.insert(*image_id) {
            merged.push(*image_id);
        }
    }
    for image_id in current {
        if seen.insert(*image_id) {
            merged.push(*image_id);
        }
    }
    merged
}
