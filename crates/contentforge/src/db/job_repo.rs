//! Job repository: CRUD operations for the `processing_jobs` table.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;

use super::{decode_ids, encode_ids, Database, DatabaseError};
use crate::models::{JobStatus, ProcessingType};

/// What a job runs over. The two shapes are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum JobTarget {
    /// A single content item.
    Content { content_id: String },
    /// A snapshot of a bundle's content ids taken when the job was created.
    /// `bundle_id` becomes `None` once the bundle is deleted.
    Bundle {
        bundle_id: Option<String>,
        content_ids: Vec<String>,
    },
}

impl JobTarget {
    pub fn is_bundle(&self) -> bool {
        matches!(self, JobTarget::Bundle { .. })
    }

    fn columns(&self) -> (Option<&str>, Option<&str>, Option<&[String]>) {
        match self {
            JobTarget::Content { content_id } => (Some(content_id.as_str()), None, None),
            JobTarget::Bundle {
                bundle_id,
                content_ids,
            } => (None, bundle_id.as_deref(), Some(content_ids.as_slice())),
        }
    }
}

/// A processing job row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessingJob {
    pub id: String,
    #[serde(flatten)]
    pub target: JobTarget,
    pub processing_type: ProcessingType,
    pub status: JobStatus,
    pub result_path: Option<String>,
    pub user_prompt: Option<String>,
    pub output_language: String,
    pub error_message: Option<String>,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProcessingJob {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        let content_id: Option<String> = row.get("content_id")?;
        let bundle_id: Option<String> = row.get("bundle_id")?;
        let content_ids: Option<String> = row.get("content_ids")?;

        let target = match (content_id, bundle_id, content_ids) {
            (_, bundle_id, Some(raw)) => JobTarget::Bundle {
                bundle_id,
                content_ids: decode_ids(&raw)?,
            },
            (_, Some(bundle_id), None) => JobTarget::Bundle {
                bundle_id: Some(bundle_id),
                content_ids: Vec::new(),
            },
            (Some(content_id), None, None) => JobTarget::Content { content_id },
            (None, None, None) => {
                return Err(rusqlite::Error::InvalidColumnType(
                    0,
                    "content_id".to_string(),
                    rusqlite::types::Type::Null,
                ))
            }
        };

        Ok(Self {
            id: row.get("id")?,
            target,
            processing_type: row.get("processing_type")?,
            status: row.get("status")?,
            result_path: row.get("result_path")?,
            user_prompt: row.get("user_prompt")?,
            output_language: row.get("output_language")?,
            error_message: row.get("error_message")?,
            user_id: row.get("user_id")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Query filter parameters for job listing.
#[derive(Debug, Clone)]
pub struct JobFilter {
    pub user_id: String,
    pub status: Option<JobStatus>,
    pub content_id: Option<String>,
    pub limit: u64,
    pub offset: u64,
}

/// Inserts a new job row.
pub fn insert(db: &Database, job: &ProcessingJob) -> Result<(), DatabaseError> {
    let (content_id, bundle_id, content_ids) = job.target.columns();
    let content_ids = content_ids.map(encode_ids).transpose()?;
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO processing_jobs (id, content_id, bundle_id, content_ids, processing_type,
             status, result_path, user_prompt, output_language, error_message, user_id,
             created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                job.id,
                content_id,
                bundle_id,
                content_ids,
                job.processing_type,
                job.status,
                job.result_path,
                job.user_prompt,
                job.output_language,
                job.error_message,
                job.user_id,
                job.created_at,
                job.updated_at,
            ],
        )?;
        Ok(())
    })
}

/// Finds a job by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<ProcessingJob>, DatabaseError> {
    db.with_conn(|conn| {
        let job = conn
            .query_row(
                "SELECT * FROM processing_jobs WHERE id = ?1",
                params![id],
                ProcessingJob::from_row,
            )
            .optional()?;
        Ok(job)
    })
}

/// Finds a job by ID, only if it belongs to `user_id`.
pub fn find_owned(
    db: &Database,
    id: &str,
    user_id: &str,
) -> Result<Option<ProcessingJob>, DatabaseError> {
    db.with_conn(|conn| {
        let job = conn
            .query_row(
                "SELECT * FROM processing_jobs WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
                ProcessingJob::from_row,
            )
            .optional()?;
        Ok(job)
    })
}

/// Queries a user's jobs newest-first, returning (rows, total_count).
pub fn query(db: &Database, filter: &JobFilter) -> Result<(Vec<ProcessingJob>, u64), DatabaseError> {
    db.with_conn(|conn| {
        let mut conditions = vec!["user_id = ?1".to_string()];
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> =
            vec![Box::new(filter.user_id.clone())];

        if let Some(status) = filter.status {
            conditions.push(format!("status = ?{}", param_values.len() + 1));
            param_values.push(Box::new(status));
        }
        if let Some(ref content_id) = filter.content_id {
            conditions.push(format!("content_id = ?{}", param_values.len() + 1));
            param_values.push(Box::new(content_id.clone()));
        }

        let where_clause = format!("WHERE {}", conditions.join(" AND "));

        let count_sql = format!("SELECT COUNT(*) FROM processing_jobs {}", where_clause);
        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        let total: u64 = conn.query_row(&count_sql, params_ref.as_slice(), |r| r.get(0))?;

        param_values.push(Box::new(filter.limit as i64));
        param_values.push(Box::new(filter.offset as i64));
        let query_sql = format!(
            "SELECT * FROM processing_jobs {} ORDER BY created_at DESC, rowid DESC LIMIT ?{} OFFSET ?{}",
            where_clause,
            param_values.len() - 1,
            param_values.len()
        );

        let params_ref: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&query_sql)?;
        let rows: Vec<ProcessingJob> = stmt
            .query_map(params_ref.as_slice(), ProcessingJob::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok((rows, total))
    })
}

/// Moves a job into `processing`. Any previous result or error is cleared so
/// that readers never observe a stale outcome while the job runs.
pub fn mark_processing(db: &Database, id: &str, now: DateTime<Utc>) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE processing_jobs SET status = ?2, result_path = NULL, error_message = NULL,
             updated_at = ?3 WHERE id = ?1",
            params![id, JobStatus::Processing, now],
        )?;
        Ok(changed > 0)
    })
}

/// Moves a job into `completed` with its result location.
pub fn mark_completed(
    db: &Database,
    id: &str,
    result_path: &str,
    now: DateTime<Utc>,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE processing_jobs SET status = ?2, result_path = ?3, error_message = NULL,
             updated_at = ?4 WHERE id = ?1",
            params![id, JobStatus::Completed, result_path, now],
        )?;
        Ok(changed > 0)
    })
}

/// Moves a job into `failed` with the error message.
pub fn mark_failed(
    db: &Database,
    id: &str,
    error_message: &str,
    now: DateTime<Utc>,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE processing_jobs SET status = ?2, error_message = ?3, updated_at = ?4
             WHERE id = ?1",
            params![id, JobStatus::Failed, error_message, now],
        )?;
        Ok(changed > 0)
    })
}

/// Deletes a job owned by `user_id`. Attempts referencing it keep their row
/// with `job_id` set to NULL.
pub fn delete_owned(db: &Database, id: &str, user_id: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "DELETE FROM processing_jobs WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;
        Ok(changed > 0)
    })
}
