//! Bundle attempt repository: append-only numbered runs against a bundle.
//!
//! Attempt numbers come from `bundle_attempt_counters`, a per-bundle high
//! water mark, so a number is never handed out twice even after the attempt
//! that held it is deleted.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row, Transaction};
use serde::Serialize;

use super::{Database, DatabaseError};
use crate::models::{new_id, ProcessingType};

/// How often numbering is retried when the unique index rejects a number.
const MAX_NUMBERING_TRIES: usize = 3;

/// One recorded processing run against a bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BundleAttempt {
    pub id: String,
    pub bundle_id: String,
    pub attempt_number: u32,
    pub processing_type: ProcessingType,
    pub output_language: String,
    pub system_prompt: String,
    pub user_prompt: Option<String>,
    pub combined_content_preview: Option<String>,
    pub custom_instructions: Option<String>,
    pub result_path: Option<String>,
    pub job_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl BundleAttempt {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            bundle_id: row.get("bundle_id")?,
            attempt_number: row.get("attempt_number")?,
            processing_type: row.get("processing_type")?,
            output_language: row.get("output_language")?,
            system_prompt: row.get("system_prompt")?,
            user_prompt: row.get("user_prompt")?,
            combined_content_preview: row.get("combined_content_preview")?,
            custom_instructions: row.get("custom_instructions")?,
            result_path: row.get("result_path")?,
            job_id: row.get("job_id")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Everything needed to record a new attempt. The id and number are
/// assigned on insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttempt {
    pub bundle_id: String,
    pub processing_type: ProcessingType,
    pub output_language: String,
    pub system_prompt: String,
    pub user_prompt: Option<String>,
    pub combined_content_preview: Option<String>,
    pub custom_instructions: Option<String>,
    pub job_id: Option<String>,
}

/// Allocates the next attempt number for the bundle and inserts the attempt
/// in one transaction. Returns `None` when the bundle does not exist.
pub fn insert_next(
    db: &Database,
    new: &NewAttempt,
    now: DateTime<Utc>,
) -> Result<Option<BundleAttempt>, DatabaseError> {
    let mut tries = 0;
    loop {
        tries += 1;
        match db.with_transaction(|tx| allocate_and_insert(tx, new, now)) {
            Err(e) if e.is_unique_violation() && tries < MAX_NUMBERING_TRIES => {
                log::warn!(
                    "Attempt number conflict on bundle {} (try {}), retrying",
                    new.bundle_id,
                    tries
                );
            }
            result => return result,
        }
    }
}

fn allocate_and_insert(
    tx: &Transaction<'_>,
    new: &NewAttempt,
    now: DateTime<Utc>,
) -> Result<Option<BundleAttempt>, DatabaseError> {
    let exists: bool = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM bundles WHERE id = ?1)",
        params![new.bundle_id],
        |r| r.get(0),
    )?;
    if !exists {
        return Ok(None);
    }

    // The counter is seeded from the highest stored number the first time a
    // bundle is seen, then only ever incremented.
    let attempt_number: u32 = tx.query_row(
        "INSERT INTO bundle_attempt_counters (bundle_id, last_number)
         VALUES (?1, (SELECT COALESCE(MAX(attempt_number), 0) + 1
                      FROM bundle_attempts WHERE bundle_id = ?1))
         ON CONFLICT(bundle_id) DO UPDATE SET last_number = last_number + 1
         RETURNING last_number",
        params![new.bundle_id],
        |r| r.get(0),
    )?;

    let attempt = BundleAttempt {
        id: new_id(),
        bundle_id: new.bundle_id.clone(),
        attempt_number,
        processing_type: new.processing_type,
        output_language: new.output_language.clone(),
        system_prompt: new.system_prompt.clone(),
        user_prompt: new.user_prompt.clone(),
        combined_content_preview: new.combined_content_preview.clone(),
        custom_instructions: new.custom_instructions.clone(),
        result_path: None,
        job_id: new.job_id.clone(),
        created_at: now,
    };

    tx.execute(
        "INSERT INTO bundle_attempts (id, bundle_id, attempt_number, processing_type,
         output_language, system_prompt, user_prompt, combined_content_preview,
         custom_instructions, result_path, job_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            attempt.id,
            attempt.bundle_id,
            attempt.attempt_number,
            attempt.processing_type,
            attempt.output_language,
            attempt.system_prompt,
            attempt.user_prompt,
            attempt.combined_content_preview,
            attempt.custom_instructions,
            attempt.result_path,
            attempt.job_id,
            attempt.created_at,
        ],
    )?;

    Ok(Some(attempt))
}

/// Finds an attempt whose bundle belongs to `user_id`.
pub fn find_owned(
    db: &Database,
    id: &str,
    user_id: &str,
) -> Result<Option<BundleAttempt>, DatabaseError> {
    db.with_conn(|conn| {
        let attempt = conn
            .query_row(
                "SELECT a.* FROM bundle_attempts a
                 JOIN bundles b ON b.id = a.bundle_id
                 WHERE a.id = ?1 AND b.user_id = ?2",
                params![id, user_id],
                BundleAttempt::from_row,
            )
            .optional()?;
        Ok(attempt)
    })
}

/// Lists a bundle's attempts by ascending attempt number.
pub fn list_for_bundle(db: &Database, bundle_id: &str) -> Result<Vec<BundleAttempt>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM bundle_attempts WHERE bundle_id = ?1 ORDER BY attempt_number ASC",
        )?;
        let rows = stmt
            .query_map(params![bundle_id], BundleAttempt::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Counts a bundle's attempts.
pub fn count_for_bundle(db: &Database, bundle_id: &str) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM bundle_attempts WHERE bundle_id = ?1",
            params![bundle_id],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}

/// Records the result location of an attempt. Only the first call has an
/// effect; later calls report `false`.
pub fn set_result_path(db: &Database, id: &str, result_path: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE bundle_attempts SET result_path = ?2 WHERE id = ?1 AND result_path IS NULL",
            params![id, result_path],
        )?;
        Ok(changed > 0)
    })
}

/// Deletes an attempt whose bundle belongs to `user_id`. The bundle's
/// counter is left untouched.
pub fn delete_owned(db: &Database, id: &str, user_id: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "DELETE FROM bundle_attempts
             WHERE id = ?1 AND bundle_id IN (SELECT id FROM bundles WHERE user_id = ?2)",
            params![id, user_id],
        )?;
        Ok(changed > 0)
    })
}
