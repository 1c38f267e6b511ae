//! Taxonomy term nodes.
//!
//! # Invariants
//! - Exactly one node exists per `(taxonomy, slug)`.
//! - Hierarchical date trees are `year -> month -> day`; a parent is always
//!   created before its children.
//! - The unknown bucket is a parentless `flat` node, even inside a
//!   hierarchical taxonomy.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of a taxonomy term node.
pub type TermId = Uuid;

/// Shape of a registered taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxonomyKind {
    /// Single-level nodes keyed directly by slug.
    Flat,
    /// Year/month/day tree.
    Hierarchical,
}

impl TaxonomyKind {
    pub(crate) fn as_db(self) -> &'static str {
        match self {
            Self::Flat => "flat",
            Self::Hierarchical => "hierarchical",
        }
    }

    pub(crate) fn parse_db(value: &str) -> Option<Self> {
        match value {
            "flat" => Some(Self::Flat),
            "hierarchical" => Some(Self::Hierarchical),
            _ => None,
        }
    }
}

/// Level of a term node inside its taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermLevel {
    Year,
    Month,
    Day,
    /// Parentless single-level node (flat taxonomies, genres, unknown bucket).
    Flat,
}

impl TermLevel {
    pub(crate) fn as_db(self) -> &'static str {
        match self {
            Self::Year => "year",
            Self::Month => "month",
            Self::Day => "day",
            Self::Flat => "flat",
        }
    }

    pub(crate) fn parse_db(value: &str) -> Option<Self> {
        match value {
            "year" => Some(Self::Year),
            "month" => Some(Self::Month),
            "day" => Some(Self::Day),
            "flat" => Some(Self::Flat),
            _ => None,
        }
    }

    /// Level a parent must have for a node of this level, if any.
    pub fn required_parent(self) -> Option<TermLevel> {
        match self {
            Self::Month => Some(Self::Year),
            Self::Day => Some(Self::Month),
            Self::Year | Self::Flat => None,
        }
    }
}

/// Persisted term node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub term_id: TermId,
    pub taxonomy: String,
    pub slug: String,
    pub display_name: String,
    pub level: TermLevel,
    pub parent_id: Option<TermId>,
}

/// Get-or-create request for one term node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermSpec {
    pub taxonomy: String,
    pub slug: String,
    pub display_name: String,
    pub level: TermLevel,
    pub parent_id: Option<TermId>,
}

impl TermSpec {
    /// Parentless flat node.
    pub fn flat(
        taxonomy: impl Into<String>,
        slug: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            taxonomy: taxonomy.into(),
            slug: slug.into(),
            display_name: display_name.into(),
            level: TermLevel::Flat,
            parent_id: None,
        }
    }
}
