//! Date taxonomy tree synchronization.
//!
//! # Responsibility
//! - Get-or-create year/month/day paths in hierarchical date taxonomies.
//! - Get-or-create single-level date nodes in flat taxonomies.
//! - Maintain one shared unknown-date node per taxonomy.
//!
//! # Invariants
//! - Paths are ensured strictly top-down, so a month never exists without
//!   its year and a day never without its month.
//! - Node creation failures are logged and reported as absent ids; they never
//!   abort the caller.

use crate::config::{CoreConfig, DateTaxonomyConfig};
use crate::model::taken_date::TakenDate;
use crate::model::term::{TaxonomyKind, TermId, TermLevel, TermSpec};
use crate::repo::term_repo::TermRepository;
use chrono::{Month, NaiveDate};
use log::warn;

/// Ids of one ensured year/month/day path. A level is `None` when its node
/// (or one of its ancestors) could not be ensured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DatePath {
    pub year: Option<TermId>,
    pub month: Option<TermId>,
    pub day: Option<TermId>,
}

impl DatePath {
    /// Present ids in top-down order.
    pub fn term_ids(&self) -> Vec<TermId> {
        [self.year, self.month, self.day]
            .into_iter()
            .flatten()
            .collect()
    }
}

/// Idempotent get-or-create over date taxonomy trees.
pub struct DateTreeService<T: TermRepository> {
    repo: T,
    unknown_slug: String,
    unknown_label: String,
}

impl<T: TermRepository> DateTreeService<T> {
    /// Creates service from repository implementation and configured
    /// unknown-bucket identity.
    pub fn new(repo: T, config: &CoreConfig) -> Self {
        Self {
            repo,
            unknown_slug: config.unknown_slug.clone(),
            unknown_label: config.unknown_label.clone(),
        }
    }

    /// Ensures `year`, `year-month` and `year-month-day` nodes, top-down.
    pub fn ensure_date_path(
        &self,
        year: &str,
        month: &str,
        day: &str,
        taxonomy: &str,
    ) -> DatePath {
        let year_id = self.ensure_node(TermSpec {
            taxonomy: taxonomy.to_string(),
            slug: year.to_string(),
            display_name: year.to_string(),
            level: TermLevel::Year,
            parent_id: None,
        });
        let Some(year_id) = year_id else {
            return DatePath::default();
        };

        let month_id = self.ensure_node(TermSpec {
            taxonomy: taxonomy.to_string(),
            slug: format!("{year}-{month}"),
            display_name: month_display_name(year, month),
            level: TermLevel::Month,
            parent_id: Some(year_id),
        });
        let Some(month_id) = month_id else {
            return DatePath {
                year: Some(year_id),
                ..DatePath::default()
            };
        };

        let day_id = self.ensure_node(TermSpec {
            taxonomy: taxonomy.to_string(),
            slug: format!("{year}-{month}-{day}"),
            display_name: day_display_name(year, month, day),
            level: TermLevel::Day,
            parent_id: Some(month_id),
        });

        DatePath {
            year: Some(year_id),
            month: Some(month_id),
            day: day_id,
        }
    }

    /// Ensures one flat node whose slug is the date string itself.
    pub fn ensure_flat_date(&self, date: &str, taxonomy: &str) -> Option<TermId> {
        if date == self.unknown_slug {
            return self.ensure_unknown(taxonomy);
        }
        let display_name = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map(|parsed| parsed.format("%B %-d, %Y").to_string())
            .unwrap_or_else(|_| date.to_string());
        self.ensure_node(TermSpec::flat(taxonomy, date, display_name))
    }

    /// Ensures the single unknown-date node of `taxonomy`.
    pub fn ensure_unknown(&self, taxonomy: &str) -> Option<TermId> {
        self.ensure_node(TermSpec::flat(
            taxonomy,
            self.unknown_slug.as_str(),
            self.unknown_label.as_str(),
        ))
    }

    /// Ensures the node(s) representing `date` in one configured taxonomy and
    /// returns the ids to assign, top-down.
    pub fn ensure_taken_date(
        &self,
        date: &TakenDate,
        taxonomy: &DateTaxonomyConfig,
    ) -> Vec<TermId> {
        match (date, taxonomy.kind) {
            (TakenDate::Unknown, _) => self.ensure_unknown(&taxonomy.name).into_iter().collect(),
            (TakenDate::Known { year, month, day }, TaxonomyKind::Hierarchical) => self
                .ensure_date_path(year, month, day, &taxonomy.name)
                .term_ids(),
            (TakenDate::Known { year, month, day }, TaxonomyKind::Flat) => self
                .ensure_flat_date(&format!("{year}-{month}-{day}"), &taxonomy.name)
                .into_iter()
                .collect(),
        }
    }

    fn ensure_node(&self, spec: TermSpec) -> Option<TermId> {
        match self.repo.ensure_term(&spec) {
            Ok(term) => Some(term.term_id),
            Err(err) => {
                warn!(
                    "event=term_ensure module=service status=error taxonomy={} slug={} level={:?} error={}",
                    spec.taxonomy, spec.slug, spec.level, err
                );
                None
            }
        }
    }
}

fn month_display_name(year: &str, month: &str) -> String {
    month
        .parse::<u8>()
        .ok()
        .and_then(|number| Month::try_from(number).ok())
        .map(|parsed| format!("{} {year}", parsed.name()))
        .unwrap_or_else(|| format!("{year}-{month}"))
}

fn day_display_name(year: &str, month: &str, day: &str) -> String {
    NaiveDate::parse_from_str(&format!("{year}-{month}-{day}"), "%Y-%m-%d")
        .map(|parsed| parsed.format("%B %-d, %Y").to_string())
        .unwrap_or_else(|_| format!("{year}-{month}-{day}"))
}
