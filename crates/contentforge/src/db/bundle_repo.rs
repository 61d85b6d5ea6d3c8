//! Bundle repository: CRUD operations for the `bundles` table.
//!
//! Every lookup and mutation except `insert` is scoped to the owning user.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;

use super::{decode_ids, encode_ids, Database, DatabaseError};

/// A named, ordered set of content item ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Bundle {
    pub id: String,
    pub user_id: String,
    pub name: Option<String>,
    pub content_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bundle {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let raw_ids: String = row.get("content_ids")?;
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            name: row.get("name")?,
            content_ids: decode_ids(&raw_ids)?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Inserts a new bundle row.
pub fn insert(db: &Database, bundle: &Bundle) -> Result<(), DatabaseError> {
    let content_ids = encode_ids(&bundle.content_ids)?;
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO bundles (id, user_id, name, content_ids, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                bundle.id,
                bundle.user_id,
                bundle.name,
                content_ids,
                bundle.created_at,
                bundle.updated_at,
            ],
        )?;
        Ok(())
    })
}

/// Finds a bundle by ID, only if it belongs to `user_id`.
pub fn find_owned(db: &Database, id: &str, user_id: &str) -> Result<Option<Bundle>, DatabaseError> {
    db.with_conn(|conn| {
        let bundle = conn
            .query_row(
                "SELECT * FROM bundles WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
                Bundle::from_row,
            )
            .optional()?;
        Ok(bundle)
    })
}

/// Lists a user's bundles newest-first, returning (rows, total_count).
pub fn query_by_user(
    db: &Database,
    user_id: &str,
    limit: u64,
    offset: u64,
) -> Result<(Vec<Bundle>, u64), DatabaseError> {
    db.with_conn(|conn| {
        let total: u64 = conn.query_row(
            "SELECT COUNT(*) FROM bundles WHERE user_id = ?1",
            params![user_id],
            |r| r.get(0),
        )?;

        let mut stmt = conn.prepare(
            "SELECT * FROM bundles WHERE user_id = ?1
             ORDER BY created_at DESC, rowid DESC LIMIT ?2 OFFSET ?3",
        )?;
        let rows: Vec<Bundle> = stmt
            .query_map(params![user_id, limit as i64, offset as i64], Bundle::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok((rows, total))
    })
}

/// Partially updates a bundle. `None` leaves a field unchanged.
///
/// Returns `false` when no bundle with this id belongs to `user_id`.
pub fn update_owned(
    db: &Database,
    id: &str,
    user_id: &str,
    name: Option<&str>,
    content_ids: Option<&[String]>,
    now: DateTime<Utc>,
) -> Result<bool, DatabaseError> {
    let content_ids = content_ids.map(encode_ids).transpose()?;
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE bundles SET name = COALESCE(?3, name),
             content_ids = COALESCE(?4, content_ids), updated_at = ?5
             WHERE id = ?1 AND user_id = ?2",
            params![id, user_id, name, content_ids, now],
        )?;
        Ok(changed > 0)
    })
}

/// Deletes a bundle owned by `user_id`. Attempts cascade; content items are
/// never touched.
pub fn delete_owned(db: &Database, id: &str, user_id: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "DELETE FROM bundles WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        Ok(changed > 0)
    })
}
