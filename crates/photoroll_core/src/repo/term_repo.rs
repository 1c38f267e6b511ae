//! Taxonomy term repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist taxonomies and their term nodes (flat and year/month/day trees).
//! - Provide one atomic get-or-create primitive (`ensure_term`) so callers
//!   never split existence checks from inserts.
//!
//! # Invariants
//! - `(taxonomy, slug)` is unique; `ensure_term` returns the surviving row.
//! - A node's parent exists, lives in the same taxonomy and has the level
//!   required by the child (`year <- month <- day`).
//! - Terms are never deleted by this repository.

use crate::db::DbError;
use crate::model::term::{TaxonomyKind, Term, TermId, TermLevel, TermSpec};
use crate::repo::{ensure_schema_ready, parse_uuid, SchemaMismatch};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

static SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("valid slug regex"));

const TERM_SELECT_SQL: &str = "SELECT
    term_uuid,
    taxonomy,
    slug,
    display_name,
    level,
    parent_uuid
FROM terms";

/// Result type used by term repository operations.
pub type TermRepoResult<T> = Result<T, TermRepoError>;

/// Rejection reasons for a term insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermValidationError {
    UnknownTaxonomy(String),
    InvalidSlug(String),
    BlankDisplayName,
    LevelNotAllowed {
        taxonomy: String,
        level: TermLevel,
    },
    MissingParent(TermLevel),
    UnexpectedParent(TermLevel),
    ParentNotFound(TermId),
    ParentMismatch {
        parent_id: TermId,
        expected: TermLevel,
    },
    TaxonomyKindConflict {
        taxonomy: String,
        registered: TaxonomyKind,
    },
}

impl Display for TermValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownTaxonomy(name) => write!(f, "taxonomy `{name}` is not registered"),
            Self::InvalidSlug(slug) => write!(f, "invalid term slug `{slug}`"),
            Self::BlankDisplayName => write!(f, "term display name must not be blank"),
            Self::LevelNotAllowed { taxonomy, level } => write!(
                f,
                "level `{}` is not allowed in taxonomy `{taxonomy}`",
                level.as_db()
            ),
            Self::MissingParent(level) => {
                write!(f, "`{}` term requires a parent", level.as_db())
            }
            Self::UnexpectedParent(level) => {
                write!(f, "`{}` term must not have a parent", level.as_db())
            }
            Self::ParentNotFound(id) => write!(f, "parent term not found: {id}"),
            Self::ParentMismatch {
                parent_id,
                expected,
            } => write!(
                f,
                "parent term {parent_id} is not a `{}` node of the same taxonomy",
                expected.as_db()
            ),
            Self::TaxonomyKindConflict {
                taxonomy,
                registered,
            } => write!(
                f,
                "taxonomy `{taxonomy}` is already registered as `{}`",
                registered.as_db()
            ),
        }
    }
}

impl Error for TermValidationError {}

/// Errors from term repository operations.
#[derive(Debug)]
pub enum TermRepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Insert rejected by term validation.
    Validation(TermValidationError),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
}

impl Display for TermRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "term repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "term repository requires table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid term data: {message}"),
        }
    }
}

impl Error for TermRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::UninitializedConnection { .. } => None,
            Self::MissingRequiredTable(_) => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<TermValidationError> for TermRepoError {
    fn from(value: TermValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<rusqlite::Error> for TermRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<SchemaMismatch> for TermRepoError {
    fn from(value: SchemaMismatch) -> Self {
        match value {
            SchemaMismatch::Sqlite(err) => err.into(),
            SchemaMismatch::Version { expected, actual } => Self::UninitializedConnection {
                expected_version: expected,
                actual_version: actual,
            },
            SchemaMismatch::MissingTable(table) => Self::MissingRequiredTable(table),
        }
    }
}

/// Repository interface for taxonomy terms.
pub trait TermRepository {
    /// Registers a taxonomy. Re-registering with the same kind is a no-op.
    fn register_taxonomy(&self, name: &str, kind: TaxonomyKind) -> TermRepoResult<()>;
    /// Returns the kind of a registered taxonomy.
    fn taxonomy_kind(&self, name: &str) -> TermRepoResult<Option<TaxonomyKind>>;
    /// Loads one node by id.
    fn get_term(&self, term_id: TermId) -> TermRepoResult<Option<Term>>;
    /// Loads one node by `(taxonomy, slug)`.
    fn find_by_slug(&self, taxonomy: &str, slug: &str) -> TermRepoResult<Option<Term>>;
    /// Returns the existing node for `spec.slug`, creating it if absent.
    fn ensure_term(&self, spec: &TermSpec) -> TermRepoResult<Term>;
    /// Lists nodes of one taxonomy ordered by slug.
    fn list_terms(&self, taxonomy: &str) -> TermRepoResult<Vec<Term>>;
    /// Lists direct children of one node ordered by slug.
    fn list_children(&self, parent_id: TermId) -> TermRepoResult<Vec<Term>>;
}

impl<R: TermRepository + ?Sized> TermRepository for &R {
    fn register_taxonomy(&self, name: &str, kind: TaxonomyKind) -> TermRepoResult<()> {
        (**self).register_taxonomy(name, kind)
    }
    fn taxonomy_kind(&self, name: &str) -> TermRepoResult<Option<TaxonomyKind>> {
        (**self).taxonomy_kind(name)
    }
    fn get_term(&self, term_id: TermId) -> TermRepoResult<Option<Term>> {
        (**self).get_term(term_id)
    }
    fn find_by_slug(&self, taxonomy: &str, slug: &str) -> TermRepoResult<Option<Term>> {
        (**self).find_by_slug(taxonomy, slug)
    }
    fn ensure_term(&self, spec: &TermSpec) -> TermRepoResult<Term> {
        (**self).ensure_term(spec)
    }
    fn list_terms(&self, taxonomy: &str) -> TermRepoResult<Vec<Term>> {
        (**self).list_terms(taxonomy)
    }
    fn list_children(&self, parent_id: TermId) -> TermRepoResult<Vec<Term>> {
        (**self).list_children(parent_id)
    }
}

/// SQLite-backed term repository.
pub struct SqliteTermRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTermRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> TermRepoResult<Self> {
        ensure_schema_ready(conn, &["taxonomies", "terms"])?;
        Ok(Self { conn })
    }

    fn validate(&self, spec: &TermSpec) -> TermRepoResult<()> {
        let kind = self
            .taxonomy_kind(&spec.taxonomy)?
            .ok_or_else(|| TermValidationError::UnknownTaxonomy(spec.taxonomy.clone()))?;

        if !is_valid_slug(&spec.slug) {
            return Err(TermValidationError::InvalidSlug(spec.slug.clone()).into());
        }
        if spec.display_name.trim().is_empty() {
            return Err(TermValidationError::BlankDisplayName.into());
        }

        let level_allowed = match kind {
            TaxonomyKind::Flat => spec.level == TermLevel::Flat,
            TaxonomyKind::Hierarchical => true,
        };
        if !level_allowed {
            return Err(TermValidationError::LevelNotAllowed {
                taxonomy: spec.taxonomy.clone(),
                level: spec.level,
            }
            .into());
        }

        match (spec.level.required_parent(), spec.parent_id) {
            (None, None) => Ok(()),
            (None, Some(_)) => Err(TermValidationError::UnexpectedParent(spec.level).into()),
            (Some(_), None) => Err(TermValidationError::MissingParent(spec.level).into()),
            (Some(expected), Some(parent_id)) => {
                let parent = self
                    .get_term(parent_id)?
                    .ok_or(TermValidationError::ParentNotFound(parent_id))?;
                if parent.level != expected || parent.taxonomy != spec.taxonomy {
                    return Err(TermValidationError::ParentMismatch {
                        parent_id,
                        expected,
                    }
                    .into());
                }
                Ok(())
            }
        }
    }
}

impl TermRepository for SqliteTermRepository<'_> {
    fn register_taxonomy(&self, name: &str, kind: TaxonomyKind) -> TermRepoResult<()> {
        self.conn.execute(
            "INSERT INTO taxonomies (name, kind)
             VALUES (?1, ?2)
             ON CONFLICT(name) DO NOTHING;",
            params![name, kind.as_db()],
        )?;

        match self.taxonomy_kind(name)? {
            Some(registered) if registered == kind => Ok(()),
            Some(registered) => Err(TermValidationError::TaxonomyKindConflict {
                taxonomy: name.to_string(),
                registered,
            }
            .into()),
            None => Err(TermRepoError::InvalidData(format!(
                "taxonomy `{name}` missing after registration"
            ))),
        }
    }

    fn taxonomy_kind(&self, name: &str) -> TermRepoResult<Option<TaxonomyKind>> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT kind FROM taxonomies WHERE name = ?1;",
                [name],
                |row| row.get(0),
            )
            .optional()?;

        value
            .map(|text| {
                TaxonomyKind::parse_db(&text).ok_or_else(|| {
                    TermRepoError::InvalidData(format!(
                        "invalid taxonomy kind `{text}` in taxonomies.kind"
                    ))
                })
            })
            .transpose()
    }

    fn get_term(&self, term_id: TermId) -> TermRepoResult<Option<Term>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TERM_SELECT_SQL} WHERE term_uuid = ?1;"))?;
        let mut rows = stmt.query([term_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_term_row(row)?));
        }
        Ok(None)
    }

    fn find_by_slug(&self, taxonomy: &str, slug: &str) -> TermRepoResult<Option<Term>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TERM_SELECT_SQL} WHERE taxonomy = ?1 AND slug = ?2;"
        ))?;
        let mut rows = stmt.query(params![taxonomy, slug])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_term_row(row)?));
        }
        Ok(None)
    }

    fn ensure_term(&self, spec: &TermSpec) -> TermRepoResult<Term> {
        if let Some(existing) = self.find_by_slug(&spec.taxonomy, &spec.slug)? {
            return Ok(existing);
        }

        self.validate(spec)?;
        self.conn.execute(
            "INSERT INTO terms (
                term_uuid,
                taxonomy,
                slug,
                display_name,
                level,
                parent_uuid
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(taxonomy, slug) DO NOTHING;",
            params![
                Uuid::new_v4().to_string(),
                spec.taxonomy.as_str(),
                spec.slug.as_str(),
                spec.display_name.trim(),
                spec.level.as_db(),
                spec.parent_id.map(|value| value.to_string()),
            ],
        )?;

        self.find_by_slug(&spec.taxonomy, &spec.slug)?
            .ok_or_else(|| {
                TermRepoError::InvalidData(format!(
                    "term `{}` missing in `{}` after insert",
                    spec.slug, spec.taxonomy
                ))
            })
    }

    fn list_terms(&self, taxonomy: &str) -> TermRepoResult<Vec<Term>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TERM_SELECT_SQL} WHERE taxonomy = ?1 ORDER BY slug ASC;"
        ))?;
        let mut rows = stmt.query([taxonomy])?;
        let mut terms = Vec::new();
        while let Some(row) = rows.next()? {
            terms.push(parse_term_row(row)?);
        }
        Ok(terms)
    }

    fn list_children(&self, parent_id: TermId) -> TermRepoResult<Vec<Term>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TERM_SELECT_SQL} WHERE parent_uuid = ?1 ORDER BY slug ASC;"
        ))?;
        let mut rows = stmt.query([parent_id.to_string()])?;
        let mut terms = Vec::new();
        while let Some(row) = rows.next()? {
            terms.push(parse_term_row(row)?);
        }
        Ok(terms)
    }
}

/// Returns whether `slug` is lowercase ASCII alphanumerics joined by single `-`.
pub fn is_valid_slug(slug: &str) -> bool {
    SLUG_RE.is_match(slug)
}

fn parse_term_row(row: &Row<'_>) -> TermRepoResult<Term> {
    let term_uuid_text: String = row.get("term_uuid")?;
    let term_id =
        parse_uuid(&term_uuid_text, "terms.term_uuid").map_err(TermRepoError::InvalidData)?;

    let parent_id = row
        .get::<_, Option<String>>("parent_uuid")?
        .map(|value| parse_uuid(&value, "terms.parent_uuid"))
        .transpose()
        .map_err(TermRepoError::InvalidData)?;

    let level_text: String = row.get("level")?;
    let level = TermLevel::parse_db(&level_text).ok_or_else(|| {
        TermRepoError::InvalidData(format!("invalid term level `{level_text}` in terms.level"))
    })?;

    Ok(Term {
        term_id,
        taxonomy: row.get("taxonomy")?,
        slug: row.get("slug")?,
        display_name: row.get("display_name")?,
        level,
        parent_id,
    })
}
