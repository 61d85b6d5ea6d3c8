//! Enumerations shared by the repositories and managers.
//!
//! Every enum is stored as lowercase snake_case text in SQLite and
//! serialized the same way.

use std::fmt;
use std::str::FromStr;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ForgeError;

/// Raised when a stored or user-supplied value names no known variant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown {kind} '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! text_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(ParseEnumError {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e| FromSqlError::Other(Box::new(e)))
            }
        }
    };
}

/// The kind of artifact an AI job produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingType {
    Summary,
    MvpPlan,
    ContentIdeas,
    BlogPost,
}

text_enum!(ProcessingType, "processing type", {
    Summary => "summary",
    MvpPlan => "mvp_plan",
    ContentIdeas => "content_ideas",
    BlogPost => "blog_post",
});

/// Lifecycle of a processing job.
///
/// `pending -> processing -> completed | failed`, and `failed -> processing`
/// only through an explicit retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

text_enum!(JobStatus, "job status", {
    Pending => "pending",
    Processing => "processing",
    Completed => "completed",
    Failed => "failed",
});

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

/// Where a content item was ingested from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    PdfUrl,
    PdfFile,
    Youtube,
    Web,
}

text_enum!(SourceType, "source type", {
    PdfUrl => "pdf_url",
    PdfFile => "pdf_file",
    Youtube => "youtube",
    Web => "web",
});

/// Extraction status of a content item, owned by the ingestion side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    Pending,
    Extracting,
    Completed,
    Failed,
}

text_enum!(ContentStatus, "content status", {
    Pending => "pending",
    Extracting => "extracting",
    Completed => "completed",
    Failed => "failed",
});

/// Upper bound for a single page of listing results.
pub const MAX_PAGE_SIZE: u64 = 100;

/// Offset pagination for listing operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u64,
    pub offset: u64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: 20,
            offset: 0,
        }
    }
}

impl Page {
    pub fn new(limit: u64, offset: u64) -> Self {
        Self { limit, offset }
    }

    pub fn validate(&self) -> Result<(), ForgeError> {
        if self.limit == 0 || self.limit > MAX_PAGE_SIZE {
            return Err(ForgeError::Validation(format!(
                "limit must be between 1 and {}, got {}",
                MAX_PAGE_SIZE, self.limit
            )));
        }
        Ok(())
    }
}

/// Generates a new entity identifier.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
