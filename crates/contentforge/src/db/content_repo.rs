//! Content item repository: read access to the `content_items` table.
//!
//! Rows are written by the ingestion side; this crate only reads them
//! (`insert` exists for ingestion and tests).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;
use serde_json::Value;

use super::{Database, DatabaseError};
use crate::models::{ContentStatus, SourceType};

/// A previously extracted piece of source content.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentItem {
    pub id: String,
    pub content_hash: String,
    pub source_type: SourceType,
    pub source_url: Option<String>,
    pub file_reference: Option<String>,
    pub extracted_text_path: Option<String>,
    pub metadata: Value,
    pub user_id: String,
    pub processing_status: ContentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContentItem {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            content_hash: row.get("content_hash")?,
            source_type: row.get("source_type")?,
            source_url: row.get("source_url")?,
            file_reference: row.get("file_reference")?,
            extracted_text_path: row.get("extracted_text_path")?,
            metadata: row.get("metadata")?,
            user_id: row.get("user_id")?,
            processing_status: row.get("processing_status")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    /// Display title: `metadata.title`, then the source URL, then the file
    /// reference.
    pub fn title(&self) -> &str {
        self.metadata
            .get("title")
            .and_then(Value::as_str)
            .filter(|t| !t.trim().is_empty())
            .or(self.source_url.as_deref())
            .or(self.file_reference.as_deref())
            .unwrap_or("Untitled")
    }
}

/// The slice of a content item shown alongside a bundle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentSummary {
    pub id: String,
    pub source_type: SourceType,
    pub metadata: Value,
}

/// Lookup of content items by id.
#[async_trait]
pub trait ContentSource: Send + Sync {
    async fn get_content_by_id(&self, id: &str) -> Result<Option<ContentItem>, DatabaseError>;
}

#[async_trait]
impl ContentSource for Database {
    async fn get_content_by_id(&self, id: &str) -> Result<Option<ContentItem>, DatabaseError> {
        find_by_id(self, id)
    }
}

/// Inserts a new content item row.
pub fn insert(db: &Database, item: &ContentItem) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO content_items (id, content_hash, source_type, source_url, file_reference,
             extracted_text_path, metadata, user_id, processing_status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                item.id,
                item.content_hash,
                item.source_type,
                item.source_url,
                item.file_reference,
                item.extracted_text_path,
                item.metadata,
                item.user_id,
                item.processing_status,
                item.created_at,
                item.updated_at,
            ],
        )?;
        Ok(())
    })
}

/// Finds a content item by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<ContentItem>, DatabaseError> {
    db.with_conn(|conn| {
        let item = conn
            .query_row(
                "SELECT * FROM content_items WHERE id = ?1",
                params![id],
                ContentItem::from_row,
            )
            .optional()?;
        Ok(item)
    })
}

/// Loads summaries for `ids`, in the given order. Ids that do not resolve
/// are left out.
pub fn find_summaries(db: &Database, ids: &[String]) -> Result<Vec<ContentSummary>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt =
            conn.prepare("SELECT id, source_type, metadata FROM content_items WHERE id = ?1")?;
        let mut summaries = Vec::with_capacity(ids.len());
        for id in ids {
            let summary = stmt
                .query_row(params![id], |row| {
                    Ok(ContentSummary {
                        id: row.get(0)?,
                        source_type: row.get(1)?,
                        metadata: row.get(2)?,
                    })
                })
                .optional()?;
            if let Some(summary) = summary {
                summaries.push(summary);
            }
        }
        Ok(summaries)
    })
}
