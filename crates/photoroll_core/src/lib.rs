//! Reconciliation core for photo collections.
//!
//! Resolves capture dates, keeps date taxonomy trees in sync, and maintains
//! one gallery aggregate per `(publication date, genre)` group.

pub mod config;
pub mod db;
pub mod logging;
pub mod metadata;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig, DateTaxonomyConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use metadata::date_resolver::{
    resolve_date, resolve_date_detailed, DateResolution, DateSource,
};
pub use metadata::{ImageMetadataReader, MetadataReadError, RawImageMetadata};
pub use model::aggregate::{Aggregate, AggregateId, GalleryLayout, GenreKey, GroupKey};
pub use model::item::{GroupMember, Image, ImageId, Item, ItemId, PostStatus};
pub use model::taken_date::TakenDate;
pub use model::term::{TaxonomyKind, Term, TermId, TermLevel, TermSpec};
pub use repo::aggregate_repo::{AggregateRepoError, AggregateRepository, SqliteAggregateRepository};
pub use repo::item_repo::{DateScope, ItemRepoError, ItemRepository, SqliteItemRepository};
pub use repo::term_repo::{
    SqliteTermRepository, TermRepoError, TermRepository, TermValidationError,
};
pub use service::aggregation_service::{
    AggregationService, PassError, PassMode, PassReport, PassResult,
};
pub use service::date_tree_service::{DatePath, DateTreeService};
pub use service::gallery_service::{CreateOutcome, GalleryError, GalleryService, UpdateOutcome};
pub use service::taken_date_service::{SyncError, SyncReport, TakenDateService};
pub use service::upload_grouper::group_uploads;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
