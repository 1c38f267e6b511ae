//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the collaborator contracts the reconciliation core consumes
//!   (items, terms, aggregates).
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Repositories refuse connections that are not migrated to the latest
//!   schema version.
//! - Repository APIs return semantic errors (`NotFound`, `Conflict`,
//!   `Validation`) in addition to DB transport errors.

use crate::db::migrations::latest_version;
use rusqlite::Connection;
use uuid::Uuid;

pub mod aggregate_repo;
pub mod item_repo;
pub mod term_repo;

/// Reason a connection cannot back a repository.
#[derive(Debug)]
pub(crate) enum SchemaMismatch {
    Sqlite(rusqlite::Error),
    Version { expected: u32, actual: u32 },
    MissingTable(&'static str),
}

impl From<rusqlite::Error> for SchemaMismatch {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Checks schema version and presence of `tables`.
pub(crate) fn ensure_schema_ready(
    conn: &Connection,
    tables: &[&'static str],
) -> Result<(), SchemaMismatch> {
    let expected = latest_version();
    let actual: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual != expected {
        return Err(SchemaMismatch::Version { expected, actual });
    }

    for table in tables {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(SchemaMismatch::MissingTable(table));
        }
    }
    Ok(())
}

/// Parses a UUID column value, reporting the column on failure.
pub(crate) fn parse_uuid(value: &str, column: &'static str) -> Result<Uuid, String> {
    Uuid::parse_str(value).map_err(|_| format!("invalid uuid `{value}` in {column}"))
}

pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(inner, _)
            if inner.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}
