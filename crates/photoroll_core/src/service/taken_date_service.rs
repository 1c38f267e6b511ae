//! Taken-date synchronization use-cases.
//!
//! # Responsibility
//! - Resolve each item's capture date from its image metadata.
//! - Store the resolved date on the item and assign the matching date term
//!   nodes in every configured taken-date taxonomy.
//!
//! # Invariants
//! - Unresolvable dates land in the per-taxonomy unknown bucket.
//! - A metadata read failure leaves the item's stored date untouched.
//! - Levels whose node could not be ensured are skipped, the rest assigned.

use crate::config::{CoreConfig, DateTaxonomyConfig};
use crate::metadata::date_resolver::{resolve_date_detailed, DateResolution};
use crate::metadata::{ImageMetadataReader, MetadataReadError};
use crate::model::item::ItemId;
use crate::model::taken_date::TakenDate;
use crate::repo::item_repo::{DateScope, ItemRepoError, ItemRepository};
use crate::repo::term_repo::TermRepository;
use crate::service::date_tree_service::DateTreeService;
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from taken-date synchronization.
#[derive(Debug)]
pub enum SyncError {
    /// Sync scope contained no item.
    NoEligibleItems,
    /// Target item does not exist.
    ItemNotFound(ItemId),
    /// Image metadata could not be read.
    Metadata(MetadataReadError),
    /// Item storage failure.
    Items(ItemRepoError),
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoEligibleItems => write!(f, "no eligible items"),
            Self::ItemNotFound(item_id) => write!(f, "item not found: {item_id}"),
            Self::Metadata(err) => write!(f, "{err}"),
            Self::Items(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Metadata(err) => Some(err),
            Self::Items(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ItemRepoError> for SyncError {
    fn from(value: ItemRepoError) -> Self {
        match value {
            ItemRepoError::ItemNotFound(item_id) => Self::ItemNotFound(item_id),
            other => Self::Items(other),
        }
    }
}

impl From<MetadataReadError> for SyncError {
    fn from(value: MetadataReadError) -> Self {
        Self::Metadata(value)
    }
}

/// Outcome counts of one sync run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub resolved: usize,
    pub unknown: usize,
    pub failed: usize,
}

/// Writes resolved taken dates back to items.
pub struct TakenDateService<I, T, M>
where
    I: ItemRepository,
    T: TermRepository,
    M: ImageMetadataReader,
{
    items: I,
    dates: DateTreeService<T>,
    reader: M,
    taxonomies: Vec<DateTaxonomyConfig>,
}

impl<I, T, M> TakenDateService<I, T, M>
where
    I: ItemRepository,
    T: TermRepository,
    M: ImageMetadataReader,
{
    pub fn new(items: I, terms: T, reader: M, config: &CoreConfig) -> Self {
        Self {
            items,
            dates: DateTreeService::new(terms, config),
            reader,
            taxonomies: config.taken_date_taxonomies.clone(),
        }
    }

    /// Resolves, stores and assigns the taken date of one item.
    pub fn sync_item(&self, item_id: ItemId) -> Result<TakenDate, SyncError> {
        let item = self
            .items
            .get_item(item_id)?
            .ok_or(SyncError::ItemNotFound(item_id))?;

        let resolution = match item.image_id {
            Some(image_id) => match self.items.get_image(image_id)? {
                Some(image) => resolve_date_detailed(&self.reader.read_metadata(&image)?),
                None => unresolved(),
            },
            None => unresolved(),
        };
        debug!(
            "event=date_resolve module=service item_id={} source={}",
            item_id,
            resolution.source.map_or("none", |source| source.as_str())
        );

        self.items.set_taken_on(item_id, &resolution.date)?;
        for taxonomy in &self.taxonomies {
            let term_ids = self.dates.ensure_taken_date(&resolution.date, taxonomy);
            self.items
                .replace_item_terms(item_id, &taxonomy.name, &term_ids)?;
        }
        Ok(resolution.date)
    }

    /// Syncs every item in `scope`.
    pub fn run_sync(&self, scope: DateScope) -> Result<SyncReport, SyncError> {
        let items = self.items.list_items(scope)?;
        if items.is_empty() {
            info!("event=taken_date_sync module=service status=noop reason=no_eligible_items");
            return Err(SyncError::NoEligibleItems);
        }

        let mut report = SyncReport::default();
        for item in items {
            match self.sync_item(item.item_id) {
                Ok(TakenDate::Unknown) => report.unknown += 1,
                Ok(TakenDate::Known { .. }) => report.resolved += 1,
                Err(err) => {
                    warn!(
                        "event=taken_date_sync module=service status=error item_id={} error={}",
                        item.item_id, err
                    );
                    report.failed += 1;
                }
            }
        }
        info!(
            "event=taken_date_sync module=service status=ok resolved={} unknown={} failed={}",
            report.resolved, report.unknown, report.failed
        );
        Ok(report)
    }
}

fn unresolved() -> DateResolution {
    DateResolution {
        date: TakenDate::Unknown,
        source: None,
    }
}
