pub mod filesystem;

use async_trait::async_trait;

use crate::error::StorageError;

pub use filesystem::FileResultStore;

/// Access to extracted source text and generated results.
///
/// Paths handed out by `save_processing_result` are opaque to callers and
/// only meaningful to the same store.
#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Reads extracted text. `Ok(None)` when nothing is stored at `path`.
    async fn read_extracted_text(&self, path: &str) -> Result<Option<String>, StorageError>;

    /// Persists a job's result, replacing any earlier result for the same
    /// job, and returns its path.
    async fn save_processing_result(&self, job_id: &str, text: &str)
        -> Result<String, StorageError>;

    /// Reads a stored result. `Ok(None)` when nothing is stored at `path`.
    async fn read_processing_result(&self, path: &str) -> Result<Option<String>, StorageError>;
}
