//! Photo item repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Query items by status, publication-date scope and genre assignments.
//! - Read an item's status and attached image reference.
//! - Write taken-date values and per-taxonomy term assignments back to items.
//!
//! # Invariants
//! - Group member listings only return published items with a publication
//!   date, ordered by `published_on ASC` then insertion order.
//! - `replace_item_terms` swaps the whole assignment set of one taxonomy in a
//!   single transaction.

use crate::db::DbError;
use crate::model::item::{GroupMember, Image, ImageId, Item, ItemId, PostStatus};
use crate::model::taken_date::TakenDate;
use crate::model::term::TermId;
use crate::repo::{ensure_schema_ready, parse_uuid, SchemaMismatch};
use chrono::NaiveDate;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Result type used by item repository operations.
pub type ItemRepoResult<T> = Result<T, ItemRepoError>;

/// Errors from item repository operations.
#[derive(Debug)]
pub enum ItemRepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Target item does not exist.
    ItemNotFound(ItemId),
    /// Target image does not exist.
    ImageNotFound(ImageId),
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

impl Display for ItemRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::ItemNotFound(id) => write!(f, "item not found: {id}"),
            Self::ImageNotFound(id) => write!(f, "image not found: {id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "item repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "item repository requires table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid item data: {message}"),
        }
    }
}

impl Error for ItemRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for ItemRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<SchemaMismatch> for ItemRepoError {
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

/// Publication-date scope of a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateScope {
    /// Whole corpus.
    All,
    /// Items published on one day.
    Day(NaiveDate),
}

/// Repository interface for photo items and their images.
pub trait ItemRepository {
    /// Inserts one image resource.
    fn insert_image(&self, image: &Image) -> ItemRepoResult<()>;
    /// Loads one image by id.
    fn get_image(&self, image_id: ImageId) -> ItemRepoResult<Option<Image>>;
    /// Changes one image's publication status.
    fn set_image_status(&self, image_id: ImageId, status: PostStatus) -> ItemRepoResult<()>;
    /// Inserts one item.
    fn insert_item(&self, item: &Item) -> ItemRepoResult<()>;
    /// Loads one item by id.
    fn get_item(&self, item_id: ItemId) -> ItemRepoResult<Option<Item>>;
    /// Changes one item's publication status.
    fn set_item_status(&self, item_id: ItemId, status: PostStatus) -> ItemRepoResult<()>;
    /// Lists items of any status in a publication-date scope.
    ///
    /// `DateScope::All` includes items without a publication date.
    fn list_items(&self, scope: DateScope) -> ItemRepoResult<Vec<Item>>;
    /// Lists published, dated items with their genre ids from `genre_taxonomy`.
    fn list_group_members(
        &self,
        genre_taxonomy: &str,
        scope: DateScope,
    ) -> ItemRepoResult<Vec<GroupMember>>;
    /// Stores the resolved taken date of one item.
    fn set_taken_on(&self, item_id: ItemId, taken_on: &TakenDate) -> ItemRepoResult<()>;
    /// Replaces the item's assignments inside one taxonomy.
    fn replace_item_terms(
        &self,
        item_id: ItemId,
        taxonomy: &str,
        term_ids: &[TermId],
    ) -> ItemRepoResult<()>;
    /// Lists the item's assignments inside one taxonomy in assignment order.
    fn item_term_ids(&self, item_id: ItemId, taxonomy: &str) -> ItemRepoResult<Vec<TermId>>;
}

impl<R: ItemRepository + ?Sized> ItemRepository for &R {
    fn insert_image(&self, image: &Image) -> ItemRepoResult<()> {
        (**self).insert_image(image)
    }
    fn get_image(&self, image_id: ImageId) -> ItemRepoResult<Option<Image>> {
        (**self).get_image(image_id)
    }
    fn set_image_status(&self, image_id: ImageId, status: PostStatus) -> ItemRepoResult<()> {
        (**self).set_image_status(image_id, status)
    }
    fn insert_item(&self, item: &Item) -> ItemRepoResult<()> {
        (**self).insert_item(item)
    }
    fn get_item(&self, item_id: ItemId) -> ItemRepoResult<Option<Item>> {
        (**self).get_item(item_id)
    }
    fn set_item_status(&self, item_id: ItemId, status: PostStatus) -> ItemRepoResult<()> {
        (**self).set_item_status(item_id, status)
    }
    fn list_items(&self, scope: DateScope) -> ItemRepoResult<Vec<Item>> {
        (**self).list_items(scope)
    }
    fn list_group_members(
        &self,
        genre_taxonomy: &str,
        scope: DateScope,
    ) -> ItemRepoResult<Vec<GroupMember>> {
        (**self).list_group_members(genre_taxonomy, scope)
    }
    fn set_taken_on(&self, item_id: ItemId, taken_on: &TakenDate) -> ItemRepoResult<()> {
        (**self).set_taken_on(item_id, taken_on)
    }
    fn replace_item_terms(
        &self,
        item_id: ItemId,
        taxonomy: &str,
        term_ids: &[TermId],
    ) -> ItemRepoResult<()> {
        (**self).replace_item_terms(item_id, taxonomy, term_ids)
    }
    fn item_term_ids(&self, item_id: ItemId, taxonomy: &str) -> ItemRepoResult<Vec<TermId>> {
        (**self).item_term_ids(item_id, taxonomy)
    }
}

/// SQLite-backed item repository.
pub struct SqliteItemRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteItemRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> ItemRepoResult<Self> {
        ensure_schema_ready(conn, &["images", "items", "item_terms"])?;
        Ok(Self { conn })
    }

    fn item_exists(&self, item_id: ItemId) -> ItemRepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM items WHERE item_uuid = ?1);",
            [item_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn genre_ids_by_item(
        &self,
        genre_taxonomy: &str,
    ) -> ItemRepoResult<HashMap<ItemId, Vec<TermId>>> {
        let mut stmt = self.conn.prepare(
            "SELECT item_uuid, term_uuid
             FROM item_terms
             WHERE taxonomy = ?1
             ORDER BY rowid ASC;",
        )?;
        let mut rows = stmt.query([genre_taxonomy])?;
        let mut genres: HashMap<ItemId, Vec<TermId>> = HashMap::new();
        while let Some(row) = rows.next()? {
            let item_text: String = row.get(0)?;
            let term_text: String = row.get(1)?;
            let item_id =
                parse_uuid(&item_text, "item_terms.item_uuid").map_err(ItemRepoError::InvalidData)?;
            let term_id =
                parse_uuid(&term_text, "item_terms.term_uuid").map_err(ItemRepoError::InvalidData)?;
            genres.entry(item_id).or_default().push(term_id);
        }
        Ok(genres)
    }
}

impl ItemRepository for SqliteItemRepository<'_> {
    fn insert_image(&self, image: &Image) -> ItemRepoResult<()> {
        self.conn.execute(
            "INSERT INTO images (image_uuid, status, file_path, uploaded_at)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                image.image_id.to_string(),
                image.status.as_db(),
                image.file_path.as_str(),
                image.uploaded_at,
            ],
        )?;
        Ok(())
    }

    fn get_image(&self, image_id: ImageId) -> ItemRepoResult<Option<Image>> {
        let mut stmt = self.conn.prepare(
            "SELECT image_uuid, status, file_path, uploaded_at
             FROM images
             WHERE image_uuid = ?1;",
        )?;
        let mut rows = stmt.query([image_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_image_row(row)?));
        }
        Ok(None)
    }

    fn set_image_status(&self, image_id: ImageId, status: PostStatus) -> ItemRepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE images SET status = ?2 WHERE image_uuid = ?1;",
            params![image_id.to_string(), status.as_db()],
        )?;
        if changed == 0 {
            return Err(ItemRepoError::ImageNotFound(image_id));
        }
        Ok(())
    }

    fn insert_item(&self, item: &Item) -> ItemRepoResult<()> {
        self.conn.execute(
            "INSERT INTO items (
                item_uuid,
                title,
                status,
                published_on,
                taken_on,
                image_uuid
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                item.item_id.to_string(),
                item.title.as_str(),
                item.status.as_db(),
                item.published_on.map(|date| date.format(DATE_FORMAT).to_string()),
                item.taken_on.to_date_string(),
                item.image_id.map(|value| value.to_string()),
            ],
        )?;
        Ok(())
    }

    fn get_item(&self, item_id: ItemId) -> ItemRepoResult<Option<Item>> {
        let mut stmt = self.conn.prepare(
            "SELECT item_uuid, title, status, published_on, taken_on, image_uuid
             FROM items
             WHERE item_uuid = ?1;",
        )?;
        let mut rows = stmt.query([item_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_item_row(row)?));
        }
        Ok(None)
    }

    fn set_item_status(&self, item_id: ItemId, status: PostStatus) -> ItemRepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE items
             SET status = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE item_uuid = ?1;",
            params![item_id.to_string(), status.as_db()],
        )?;
        if changed == 0 {
            return Err(ItemRepoError::ItemNotFound(item_id));
        }
        Ok(())
    }

    fn list_items(&self, scope: DateScope) -> ItemRepoResult<Vec<Item>> {
        let mut sql = String::from(
            "SELECT item_uuid, title, status, published_on, taken_on, image_uuid
             FROM items",
        );
        let mut bind_values: Vec<Value> = Vec::new();
        if let DateScope::Day(date) = scope {
            sql.push_str(" WHERE published_on = ?");
            bind_values.push(Value::Text(date.format(DATE_FORMAT).to_string()));
        }
        sql.push_str(" ORDER BY rowid ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_item_row(row)?);
        }
        Ok(items)
    }

    fn list_group_members(
        &self,
        genre_taxonomy: &str,
        scope: DateScope,
    ) -> ItemRepoResult<Vec<GroupMember>> {
        let mut sql = String::from(
            "SELECT
                i.item_uuid AS item_uuid,
                i.status AS item_status,
                i.published_on AS published_on,
                i.image_uuid AS image_uuid,
                img.status AS image_status
             FROM items i
             LEFT JOIN images img ON img.image_uuid = i.image_uuid
             WHERE i.status = 'published'
               AND i.published_on IS NOT NULL",
        );
        let mut bind_values: Vec<Value> = Vec::new();
        if let DateScope::Day(date) = scope {
            sql.push_str(" AND i.published_on = ?");
            bind_values.push(Value::Text(date.format(DATE_FORMAT).to_string()));
        }
        sql.push_str(" ORDER BY i.published_on ASC, i.rowid ASC;");

        let mut genres = self.genre_ids_by_item(genre_taxonomy)?;
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut members = Vec::new();
        while let Some(row) = rows.next()? {
            let item_text: String = row.get("item_uuid")?;
            let item_id =
                parse_uuid(&item_text, "items.item_uuid").map_err(ItemRepoError::InvalidData)?;

            let published_text: String = row.get("published_on")?;
            let published_on = parse_date(&published_text, "items.published_on")?;

            let image_id = row
                .get::<_, Option<String>>("image_uuid")?
                .map(|value| parse_uuid(&value, "items.image_uuid"))
                .transpose()
                .map_err(ItemRepoError::InvalidData)?;
            let image_status = row
                .get::<_, Option<String>>("image_status")?
                .map(|value| parse_status(&value, "images.status"))
                .transpose()?;

            let item_status_text: String = row.get("item_status")?;
            members.push(GroupMember {
                item_id,
                item_status: parse_status(&item_status_text, "items.status")?,
                published_on,
                genre_ids: genres.remove(&item_id).unwrap_or_default(),
                image_id,
                image_status,
            });
        }
        Ok(members)
    }

    fn set_taken_on(&self, item_id: ItemId, taken_on: &TakenDate) -> ItemRepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE items
             SET taken_on = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE item_uuid = ?1;",
            params![item_id.to_string(), taken_on.to_date_string()],
        )?;
        if changed == 0 {
            return Err(ItemRepoError::ItemNotFound(item_id));
        }
        Ok(())
    }

    fn replace_item_terms(
        &self,
        item_id: ItemId,
        taxonomy: &str,
        term_ids: &[TermId],
    ) -> ItemRepoResult<()> {
        if !self.item_exists(item_id)? {
            return Err(ItemRepoError::ItemNotFound(item_id));
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "DELETE FROM item_terms WHERE item_uuid = ?1 AND taxonomy = ?2;",
            params![item_id.to_string(), taxonomy],
        )?;
        for term_id in term_ids {
            tx.execute(
                "INSERT INTO item_terms (item_uuid, taxonomy, term_uuid)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(item_uuid, term_uuid) DO NOTHING;",
                params![item_id.to_string(), taxonomy, term_id.to_string()],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn item_term_ids(&self, item_id: ItemId, taxonomy: &str) -> ItemRepoResult<Vec<TermId>> {
        let mut stmt = self.conn.prepare(
            "SELECT term_uuid
             FROM item_terms
             WHERE item_uuid = ?1 AND taxonomy = ?2
             ORDER BY rowid ASC;",
        )?;
        let mut rows = stmt.query(params![item_id.to_string(), taxonomy])?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            let value: String = row.get(0)?;
            ids.push(
                parse_uuid(&value, "item_terms.term_uuid").map_err(ItemRepoError::InvalidData)?,
            );
        }
        Ok(ids)
    }
}

fn parse_item_row(row: &Row<'_>) -> ItemRepoResult<Item> {
    let item_text: String = row.get("item_uuid")?;
    let item_id = parse_uuid(&item_text, "items.item_uuid").map_err(ItemRepoError::InvalidData)?;

    let published_on = row
        .get::<_, Option<String>>("published_on")?
        .map(|value| parse_date(&value, "items.published_on"))
        .transpose()?;
    let image_id = row
        .get::<_, Option<String>>("image_uuid")?
        .map(|value| parse_uuid(&value, "items.image_uuid"))
        .transpose()
        .map_err(ItemRepoError::InvalidData)?;
    let status_text: String = row.get("status")?;
    let taken_text: Option<String> = row.get("taken_on")?;

    Ok(Item {
        item_id,
        title: row.get("title")?,
        status: parse_status(&status_text, "items.status")?,
        published_on,
        taken_on: TakenDate::from_stored(taken_text.as_deref()),
        image_id,
    })
}

fn parse_image_row(row: &Row<'_>) -> ItemRepoResult<Image> {
    let image_text: String = row.get("image_uuid")?;
    let status_text: String = row.get("status")?;
    Ok(Image {
        image_id: parse_uuid(&image_text, "images.image_uuid")
            .map_err(ItemRepoError::InvalidData)?,
        status: parse_status(&status_text, "images.status")?,
        file_path: row.get("file_path")?,
        uploaded_at: row.get("uploaded_at")?,
    })
}

fn parse_status(value: &str, column: &'static str) -> ItemRepoResult<PostStatus> {
    PostStatus::parse_db(value)
        .ok_or_else(|| ItemRepoError::InvalidData(format!("invalid status `{value}` in {column}")))
}

fn parse_date(value: &str, column: &'static str) -> ItemRepoResult<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|_| ItemRepoError::InvalidData(format!("invalid date `{value}` in {column}")))
}
