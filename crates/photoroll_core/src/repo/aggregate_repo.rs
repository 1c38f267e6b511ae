//! Collection aggregate repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist aggregates together with their ordered image-id list.
//! - Look aggregates up by `(date term, genre)` key.
//!
//! # Invariants
//! - The `(date_term_uuid, genre_term_uuid)` unique index allows at most one
//!   aggregate per key; a second insert fails with `Conflict`.
//! - `aggregate_images.position` is dense from 0 and mirrors
//!   `Aggregate::image_ids` order.
//! - Aggregates are never deleted here.

use crate::db::DbError;
use crate::model::aggregate::{Aggregate, AggregateId, GalleryLayout, GenreKey};
use crate::model::item::ImageId;
use crate::model::term::TermId;
use crate::repo::{ensure_schema_ready, is_unique_violation, parse_uuid, SchemaMismatch};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

const AGGREGATE_SELECT_SQL: &str = "SELECT
    aggregate_uuid,
    title,
    body,
    layout,
    genre_term_uuid,
    date_term_uuid
FROM aggregates";

/// Result type used by aggregate repository operations.
pub type AggregateRepoResult<T> = Result<T, AggregateRepoError>;

/// Errors from aggregate repository operations.
#[derive(Debug)]
pub enum AggregateRepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Target aggregate does not exist.
    NotFound(AggregateId),
    /// Another aggregate already owns the `(date term, genre)` key.
    Conflict {
        date_term_id: TermId,
        genre: GenreKey,
    },
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

impl Display for AggregateRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "aggregate not found: {id}"),
            Self::Conflict {
                date_term_id,
                genre,
            } => write!(
                f,
                "aggregate already exists for date term {date_term_id} and genre {genre:?}"
            ),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "aggregate repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "aggregate repository requires table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid aggregate data: {message}"),
        }
    }
}

impl Error for AggregateRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for AggregateRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<SchemaMismatch> for AggregateRepoError {
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

/// Repository interface for collection aggregates.
pub trait AggregateRepository {
    /// Inserts a new aggregate with its image list.
    fn insert_aggregate(&self, aggregate: &Aggregate) -> AggregateRepoResult<()>;
    /// Overwrites title, body, layout, terms and image list of an aggregate.
    fn update_aggregate(&self, aggregate: &Aggregate) -> AggregateRepoResult<()>;
    /// Loads one aggregate by id.
    fn get_aggregate(&self, aggregate_id: AggregateId) -> AggregateRepoResult<Option<Aggregate>>;
    /// Loads the aggregate owning one `(date term, genre)` key.
    fn find_by_key(
        &self,
        date_term_id: TermId,
        genre: GenreKey,
    ) -> AggregateRepoResult<Option<Aggregate>>;
    /// Lists aggregates, optionally restricted to one date term.
    fn list_aggregates(&self, date_term_id: Option<TermId>) -> AggregateRepoResult<Vec<Aggregate>>;
}

impl<R: AggregateRepository + ?Sized> AggregateRepository for &R {
    fn insert_aggregate(&self, aggregate: &Aggregate) -> AggregateRepoResult<()> {
        (**self).insert_aggregate(aggregate)
    }
    fn update_aggregate(&self, aggregate: &Aggregate) -> AggregateRepoResult<()> {
        (**self).update_aggregate(aggregate)
    }
    fn get_aggregate(&self, aggregate_id: AggregateId) -> AggregateRepoResult<Option<Aggregate>> {
        (**self).get_aggregate(aggregate_id)
    }
    fn find_by_key(
        &self,
        date_term_id: TermId,
        genre: GenreKey,
    ) -> AggregateRepoResult<Option<Aggregate>> {
        (**self).find_by_key(date_term_id, genre)
    }
    fn list_aggregates(
        &self,
        date_term_id: Option<TermId>,
    ) -> AggregateRepoResult<Vec<Aggregate>> {
        (**self).list_aggregates(date_term_id)
    }
}

/// SQLite-backed aggregate repository.
pub struct SqliteAggregateRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteAggregateRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> AggregateRepoResult<Self> {
        ensure_schema_ready(conn, &["aggregates", "aggregate_images"])?;
        Ok(Self { conn })
    }

    fn load_image_ids(&self, aggregate_id: AggregateId) -> AggregateRepoResult<Vec<ImageId>> {
        let mut stmt = self.conn.prepare(
            "SELECT image_uuid
             FROM aggregate_images
             WHERE aggregate_uuid = ?1
             ORDER BY position ASC;",
        )?;
        let mut rows = stmt.query([aggregate_id.to_string()])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            let value: String = row.get(0)?;
            ids.push(
                parse_uuid(&value, "aggregate_images.image_uuid")
                    .map_err(AggregateRepoError::InvalidData)?,
            );
        }
        Ok(ids)
    }

    fn query_aggregates(
        &self,
        sql: &str,
        bind_values: Vec<Value>,
    ) -> AggregateRepoResult<Vec<Aggregate>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut aggregates = Vec::new();
        while let Some(row) = rows.next()? {
            let mut aggregate = parse_aggregate_row(row)?;
            aggregate.image_ids = self.load_image_ids(aggregate.aggregate_id)?;
            aggregates.push(aggregate);
        }
        Ok(aggregates)
    }
}

impl AggregateRepository for SqliteAggregateRepository<'_> {
    fn insert_aggregate(&self, aggregate: &Aggregate) -> AggregateRepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let inserted = tx.execute(
            "INSERT INTO aggregates (
                aggregate_uuid,
                title,
                body,
                layout,
                genre_term_uuid,
                date_term_uuid
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                aggregate.aggregate_id.to_string(),
                aggregate.title.as_str(),
                aggregate.body.as_str(),
                aggregate.layout.as_db(),
                aggregate.genre.term_id().map(|value| value.to_string()),
                aggregate.date_term_id.to_string(),
            ],
        );
        if let Err(err) = inserted {
            if is_unique_violation(&err) {
                return Err(AggregateRepoError::Conflict {
                    date_term_id: aggregate.date_term_id,
                    genre: aggregate.genre,
                });
            }
            return Err(err.into());
        }

        write_image_ids(&tx, aggregate)?;
        tx.commit()?;
        Ok(())
    }

    fn update_aggregate(&self, aggregate: &Aggregate) -> AggregateRepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE aggregates
             SET title = ?2,
                 body = ?3,
                 layout = ?4,
                 genre_term_uuid = ?5,
                 date_term_uuid = ?6,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE aggregate_uuid = ?1;",
            params![
                aggregate.aggregate_id.to_string(),
                aggregate.title.as_str(),
                aggregate.body.as_str(),
                aggregate.layout.as_db(),
                aggregate.genre.term_id().map(|value| value.to_string()),
                aggregate.date_term_id.to_string(),
            ],
        );
        let changed = match changed {
            Ok(changed) => changed,
            Err(err) if is_unique_violation(&err) => {
                return Err(AggregateRepoError::Conflict {
                    date_term_id: aggregate.date_term_id,
                    genre: aggregate.genre,
                });
            }
            Err(err) => return Err(err.into()),
        };
        if changed == 0 {
            return Err(AggregateRepoError::NotFound(aggregate.aggregate_id));
        }

        tx.execute(
            "DELETE FROM aggregate_images WHERE aggregate_uuid = ?1;",
            [aggregate.aggregate_id.to_string()],
        )?;
        write_image_ids(&tx, aggregate)?;
        tx.commit()?;
        Ok(())
    }

    fn get_aggregate(&self, aggregate_id: AggregateId) -> AggregateRepoResult<Option<Aggregate>> {
        let mut found = self.query_aggregates(
            &format!("{AGGREGATE_SELECT_SQL} WHERE aggregate_uuid = ?;"),
            vec![Value::Text(aggregate_id.to_string())],
        )?;
        Ok(found.pop())
    }

    fn find_by_key(
        &self,
        date_term_id: TermId,
        genre: GenreKey,
    ) -> AggregateRepoResult<Option<Aggregate>> {
        let mut found = self.query_aggregates(
            &format!(
                "{AGGREGATE_SELECT_SQL}
                 WHERE date_term_uuid = ?
                   AND COALESCE(genre_term_uuid, '') = ?;"
            ),
            vec![
                Value::Text(date_term_id.to_string()),
                Value::Text(
                    genre
                        .term_id()
                        .map(|value| value.to_string())
                        .unwrap_or_default(),
                ),
            ],
        )?;
        Ok(found.pop())
    }

    fn list_aggregates(
        &self,
        date_term_id: Option<TermId>,
    ) -> AggregateRepoResult<Vec<Aggregate>> {
        match date_term_id {
            Some(date_term_id) => self.query_aggregates(
                &format!(
                    "{AGGREGATE_SELECT_SQL}
                     WHERE date_term_uuid = ?
                     ORDER BY rowid ASC;"
                ),
                vec![Value::Text(date_term_id.to_string())],
            ),
            None => self.query_aggregates(
                &format!("{AGGREGATE_SELECT_SQL} ORDER BY rowid ASC;"),
                Vec::new(),
            ),
        }
    }
}

fn write_image_ids(tx: &Transaction<'_>, aggregate: &Aggregate) -> AggregateRepoResult<()> {
    for (position, image_id) in aggregate.image_ids.iter().enumerate() {
        tx.execute(
            "INSERT INTO aggregate_images (aggregate_uuid, position, image_uuid)
             VALUES (?1, ?2, ?3);",
            params![
                aggregate.aggregate_id.to_string(),
                position as i64,
                image_id.to_string(),
            ],
        )?;
    }
    Ok(())
}

fn parse_aggregate_row(row: &Row<'_>) -> AggregateRepoResult<Aggregate> {
    let aggregate_text: String = row.get("aggregate_uuid")?;
    let aggregate_id = parse_uuid(&aggregate_text, "aggregates.aggregate_uuid")
        .map_err(AggregateRepoError::InvalidData)?;

    let genre_term_id = row
        .get::<_, Option<String>>("genre_term_uuid")?
        .map(|value| parse_uuid(&value, "aggregates.genre_term_uuid"))
        .transpose()
        .map_err(AggregateRepoError::InvalidData)?;
    let date_text: String = row.get("date_term_uuid")?;
    let date_term_id = parse_uuid(&date_text, "aggregates.date_term_uuid")
        .map_err(AggregateRepoError::InvalidData)?;

    let layout_text: String = row.get("layout")?;
    let layout = GalleryLayout::parse_db(&layout_text).ok_or_else(|| {
        AggregateRepoError::InvalidData(format!(
            "invalid layout `{layout_text}` in aggregates.layout"
        ))
    })?;

    Ok(Aggregate {
        aggregate_id,
        title: row.get("title")?,
        body: row.get("body")?,
        layout,
        image_ids: Vec::new(),
        genre: GenreKey::from_term_id(genre_term_id),
        date_term_id,
    })
}
