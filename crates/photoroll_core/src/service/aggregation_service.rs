//! Aggregation pass orchestration.
//!
//! # Responsibility
//! - Run the four pass modes (full rebuild, full refresh, bounded create,
//!   bounded update) over current storage contents.
//! - Resolve each group's publication-date term and existing aggregate by
//!   explicit slug and genre keys.
//! - Count per-group outcomes and fold them into one pass result.
//!
//! # Invariants
//! - Passes are stateless between invocations.
//! - Create passes never touch existing aggregates.
//! - A per-group failure is logged and counted; it never aborts the pass.
//! - A pass that changed nothing returns a typed "nothing to do" error.

use crate::config::CoreConfig;
use crate::model::aggregate::{Aggregate, GroupKey};
use crate::model::item::GroupMember;
use crate::model::term::TermId;
use crate::repo::aggregate_repo::{AggregateRepoError, AggregateRepository};
use crate::repo::item_repo::{DateScope, ItemRepoError, ItemRepository};
use crate::repo::term_repo::{TermRepoError, TermRepository};
use crate::service::date_tree_service::DateTreeService;
use crate::service::gallery_service::{
    collect_published_images, CreateOutcome, GalleryError, GalleryService, UpdateOutcome,
};
use crate::service::upload_grouper::group_uploads;
use chrono::NaiveDate;
use log::{info, warn};
use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::fmt::{Display, Formatter};

const SLUG_DATE_FORMAT: &str = "%Y-%m-%d";

/// Invocation mode of one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassMode {
    FullRebuild,
    FullRefresh,
    BoundedCreate,
    BoundedUpdate,
}

impl PassMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FullRebuild => "full_rebuild",
            Self::FullRefresh => "full_refresh",
            Self::BoundedCreate => "bounded_create",
            Self::BoundedUpdate => "bounded_update",
        }
    }
}

/// Per-group outcome counts of one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Groups intentionally left alone: existing aggregate on a create pass,
    /// no published image, or a concurrent insert of the same key.
    pub skipped: usize,
    pub failed: usize,
}

impl PassReport {
    /// Whether at least one aggregate was created or updated.
    pub fn changed(&self) -> bool {
        self.created + self.updated > 0
    }
}

/// Pass-level failure.
#[derive(Debug)]
pub enum PassError {
    /// Pass scope contained nothing to work on.
    NoEligibleItems,
    /// Every group was skipped, unchanged or failed.
    NoChangesMade(PassReport),
    /// Item scope could not be read.
    Items(ItemRepoError),
    /// Date scope term could not be read.
    Terms(TermRepoError),
    /// Aggregate scope could not be read.
    Aggregates(AggregateRepoError),
}

impl PassError {
    /// `true` for the steady-state outcomes callers must not treat as faults.
    pub fn is_nothing_to_do(&self) -> bool {
        matches!(self, Self::NoEligibleItems | Self::NoChangesMade(_))
    }
}

impl Display for PassError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoEligibleItems => write!(f, "no eligible items"),
            Self::NoChangesMade(report) => write!(
                f,
                "no changes made (unchanged={}, skipped={}, failed={})",
                report.unchanged, report.skipped, report.failed
            ),
            Self::Items(err) => write!(f, "{err}"),
            Self::Terms(err) => write!(f, "{err}"),
            Self::Aggregates(err) => write!(f, "{err}"),
        }
    }
}

impl Error for PassError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Items(err) => Some(err),
            Self::Terms(err) => Some(err),
            Self::Aggregates(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ItemRepoError> for PassError {
    fn from(value: ItemRepoError) -> Self {
        Self::Items(value)
    }
}

impl From<TermRepoError> for PassError {
    fn from(value: TermRepoError) -> Self {
        Self::Terms(value)
    }
}

impl From<AggregateRepoError> for PassError {
    fn from(value: AggregateRepoError) -> Self {
        Self::Aggregates(value)
    }
}

pub type PassResult = Result<PassReport, PassError>;

type GroupedMembers = BTreeMap<GroupKey, Vec<GroupMember>>;

/// Reconciles collection aggregates with the current item corpus.
pub struct AggregationService<'a, I, T, A>
where
    I: ItemRepository,
    T: TermRepository,
    A: AggregateRepository,
{
    items: &'a I,
    terms: &'a T,
    aggregates: &'a A,
    dates: DateTreeService<&'a T>,
    gallery: GalleryService<&'a A, &'a T>,
    genre_taxonomy: String,
    published_date_taxonomy: String,
}

impl<'a, I, T, A> AggregationService<'a, I, T, A>
where
    I: ItemRepository,
    T: TermRepository,
    A: AggregateRepository,
{
    pub fn new(items: &'a I, terms: &'a T, aggregates: &'a A, config: &CoreConfig) -> Self {
        Self {
            items,
            terms,
            aggregates,
            dates: DateTreeService::new(terms, config),
            gallery: GalleryService::new(aggregates, terms, config),
            genre_taxonomy: config.genre_taxonomy.clone(),
            published_date_taxonomy: config.published_date_taxonomy.clone(),
        }
    }

    /// Creates aggregates for every group of all published items that has
    /// none yet.
    pub fn run_full_rebuild(&self) -> PassResult {
        self.run_create(PassMode::FullRebuild, DateScope::All)
    }

    /// Re-merges every existing aggregate with its current item group.
    pub fn run_full_refresh(&self) -> PassResult {
        self.run_refresh(PassMode::FullRefresh, None)
    }

    /// Full rebuild restricted to items published on `date`.
    pub fn run_bounded_create(&self, date: NaiveDate) -> PassResult {
        self.run_create(PassMode::BoundedCreate, DateScope::Day(date))
    }

    /// Full refresh restricted to aggregates of publication date `date`.
    pub fn run_bounded_update(&self, date: NaiveDate) -> PassResult {
        self.run_refresh(PassMode::BoundedUpdate, Some(date))
    }

    fn run_create(&self, mode: PassMode, scope: DateScope) -> PassResult {
        let members = self
            .items
            .list_group_members(&self.genre_taxonomy, scope)
            .map_err(|err| log_pass_error(mode, err.into()))?;
        if members.is_empty() {
            return finish(mode, Err(PassError::NoEligibleItems));
        }

        let mut report = PassReport::default();
        for (key, group) in group_uploads(members) {
            self.create_group(key, &group, &mut report);
        }
        finish(mode, settle(report))
    }

    fn create_group(&self, key: GroupKey, group: &[GroupMember], report: &mut PassReport) {
        if collect_published_images(group).is_empty() {
            report.skipped += 1;
            return;
        }
        let Some(date_term_id) = self.ensure_date_term(key.published_on) else {
            report.failed += 1;
            return;
        };

        match self.aggregates.find_by_key(date_term_id, key.genre) {
            Ok(Some(_)) => {
                report.skipped += 1;
                return;
            }
            Ok(None) => {}
            Err(err) => {
                log_group_failure("lookup", key, &err);
                report.failed += 1;
                return;
            }
        }

        match self
            .gallery
            .create(key.genre, group, key.published_on, date_term_id)
        {
            Ok(CreateOutcome::Created(_)) => report.created += 1,
            Ok(CreateOutcome::NoPublishedImages) => report.skipped += 1,
            Err(GalleryError::Write(AggregateRepoError::Conflict { .. })) => report.skipped += 1,
            Err(err) => {
                log_group_failure("create", key, &err);
                report.failed += 1;
            }
        }
    }

    fn run_refresh(&self, mode: PassMode, date: Option<NaiveDate>) -> PassResult {
        let existing = self
            .load_refresh_scope(date)
            .map_err(|err| log_pass_error(mode, err))?;
        if existing.is_empty() {
            return finish(mode, Err(PassError::NoEligibleItems));
        }

        let mut groups_by_date: HashMap<NaiveDate, GroupedMembers> = HashMap::new();
        let mut report = PassReport::default();
        for aggregate in &existing {
            self.refresh_aggregate(aggregate, &mut groups_by_date, &mut report);
        }
        finish(mode, settle(report))
    }

    fn load_refresh_scope(&self, date: Option<NaiveDate>) -> Result<Vec<Aggregate>, PassError> {
        let Some(date) = date else {
            return Ok(self.aggregates.list_aggregates(None)?);
        };
        let slug = date.format(SLUG_DATE_FORMAT).to_string();
        match self.terms.find_by_slug(&self.published_date_taxonomy, &slug)? {
            Some(term) => Ok(self.aggregates.list_aggregates(Some(term.term_id))?),
            None => Ok(Vec::new()),
        }
    }

    fn refresh_aggregate(
        &self,
        aggregate: &Aggregate,
        groups_by_date: &mut HashMap<NaiveDate, GroupedMembers>,
        report: &mut PassReport,
    ) {
        let published_on = match self.published_on_of(aggregate.date_term_id) {
            Ok(date) => date,
            Err(reason) => {
                warn!(
                    "event=aggregation_group module=service step=refresh status=error aggregate_id={} error={}",
                    aggregate.aggregate_id, reason
                );
                report.failed += 1;
                return;
            }
        };
        let key = GroupKey {
            published_on,
            genre: aggregate.genre,
        };

        if !groups_by_date.contains_key(&published_on) {
            match self
                .items
                .list_group_members(&self.genre_taxonomy, DateScope::Day(published_on))
            {
                Ok(members) => {
                    groups_by_date.insert(published_on, group_uploads(members));
                }
                Err(err) => {
                    log_group_failure("members", key, &err);
                    report.failed += 1;
                    return;
                }
            }
        }
        let members = groups_by_date
            .get(&published_on)
            .and_then(|groups| groups.get(&key))
            .map(Vec::as_slice)
            .unwrap_or_default();

        match self.gallery.update(
            aggregate,
            members,
            key.genre,
            published_on,
            aggregate.date_term_id,
        ) {
            Ok(UpdateOutcome::Updated(_)) => report.updated += 1,
            Ok(UpdateOutcome::Unchanged) => report.unchanged += 1,
            Err(err) => {
                log_group_failure("update", key, &err);
                report.failed += 1;
            }
        }
    }

    /// Publication date encoded in the slug of a date term.
    fn published_on_of(&self, date_term_id: TermId) -> Result<NaiveDate, String> {
        let term = self
            .terms
            .get_term(date_term_id)
            .map_err(|err| err.to_string())?
            .ok_or_else(|| format!("date term not found: {date_term_id}"))?;
        NaiveDate::parse_from_str(&term.slug, SLUG_DATE_FORMAT)
            .map_err(|_| format!("date term slug is not a date: {}", term.slug))
    }

    fn ensure_date_term(&self, published_on: NaiveDate) -> Option<TermId> {
        self.dates.ensure_flat_date(
            &published_on.format(SLUG_DATE_FORMAT).to_string(),
            &self.published_date_taxonomy,
        )
    }
}

fn settle(report: PassReport) -> PassResult {
    if report.changed() {
        Ok(report)
    } else {
        Err(PassError::NoChangesMade(report))
    }
}

fn finish(mode: PassMode, result: PassResult) -> PassResult {
    match &result {
        Ok(report) => info!(
            "event=aggregation_pass module=service mode={} status=ok created={} updated={} unchanged={} skipped={} failed={}",
            mode.as_str(),
            report.created,
            report.updated,
            report.unchanged,
            report.skipped,
            report.failed
        ),
        Err(err) if err.is_nothing_to_do() => info!(
            "event=aggregation_pass module=service mode={} status=noop reason={}",
            mode.as_str(),
            err
        ),
        Err(err) => warn!(
            "event=aggregation_pass module=service mode={} status=error error={}",
            mode.as_str(),
            err
        ),
    }
    result
}

fn log_pass_error(mode: PassMode, err: PassError) -> PassError {
    warn!(
        "event=aggregation_pass module=service mode={} status=error error={}",
        mode.as_str(),
        err
    );
    err
}

fn log_group_failure(step: &str, key: GroupKey, err: &dyn Error) {
    warn!(
        "event=aggregation_group module=service step={} status=error published_on={} genre={:?} error={}",
        step,
        key.published_on.format(SLUG_DATE_FORMAT),
        key.genre.term_id(),
        err
    );
}

#[cfg(test)]
mod tests {
    use super::{settle, PassError, PassReport};

    #[test]
    fn report_without_creates_or_updates_is_nothing_to_do() {
        let report = PassReport {
            unchanged: 3,
            skipped: 1,
            ..PassReport::default()
        };
        let err = settle(report).expect_err("no change must not succeed");
        assert!(err.is_nothing_to_do());
        assert!(matches!(err, PassError::NoChangesMade(r) if r == report));
    }

    #[test]
    fn one_update_is_success() {
        let report = PassReport {
            updated: 1,
            failed: 2,
            ..PassReport::default()
        };
        assert_eq!(settle(report).expect("changed pass"), report);
    }
}
