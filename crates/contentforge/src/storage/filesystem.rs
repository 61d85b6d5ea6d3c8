use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::ResultStore;
use crate::error::StorageError;
use crate::sanitize;

const RESULTS_DIR: &str = "results";
const RESULT_EXTENSION: &str = "md";

/// Move a file from `src` to `dst`. Uses `rename` first (atomic on the same
/// filesystem) and falls back to copy + delete for cross-device moves.
async fn move_file(src: &Path, dst: &Path) -> Result<(), StorageError> {
    if tokio::fs::rename(src, dst).await.is_ok() {
        return Ok(());
    }

    tokio::fs::copy(src, dst)
        .await
        .map_err(|e| StorageError::MoveFile {
            from: src.to_path_buf(),
            to: dst.to_path_buf(),
            source: e,
        })?;
    tokio::fs::remove_file(src)
        .await
        .map_err(|e| StorageError::MoveFile {
            from: src.to_path_buf(),
            to: dst.to_path_buf(),
            source: e,
        })?;
    Ok(())
}

/// Reads a UTF-8 file, mapping "not found" to `None`.
async fn read_optional(path: &Path) -> Result<Option<String>, StorageError> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StorageError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Result store rooted at a local directory.
///
/// Extracted-text paths are resolved against the root unless absolute.
/// Results live at `<root>/results/<job_id>.md` and are returned as paths
/// relative to the root.
pub struct FileResultStore {
    root: PathBuf,
}

impl FileResultStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    async fn ensure_directory(&self, path: &Path) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(path)
            .await
            .map_err(|e| StorageError::CreateDirectory {
                path: path.to_path_buf(),
                source: e,
            })
    }
}

#[async_trait]
impl ResultStore for FileResultStore {
    async fn read_extracted_text(&self, path: &str) -> Result<Option<String>, StorageError> {
        read_optional(&self.resolve(path)).await
    }

    async fn save_processing_result(
        &self,
        job_id: &str,
        text: &str,
    ) -> Result<String, StorageError> {
        if !sanitize::is_safe_key(job_id) {
            return Err(StorageError::InvalidKey(job_id.to_string()));
        }

        let dir = self.root.join(RESULTS_DIR);
        self.ensure_directory(&dir).await?;

        let filename = format!("{}.{}", job_id, RESULT_EXTENSION);
        let final_path = dir.join(&filename);
        let temp_path = dir.join(format!(".{}.tmp", filename));

        // Write to a temp file first so a reader never sees a partial result.
        tokio::fs::write(&temp_path, text)
            .await
            .map_err(|e| StorageError::WriteFile {
                path: temp_path.clone(),
                source: e,
            })?;
        move_file(&temp_path, &final_path).await?;

        log::debug!("Stored result for job {} at {}", job_id, final_path.display());

        Ok(format!("{}/{}", RESULTS_DIR, filename))
    }

    async fn read_processing_result(&self, path: &str) -> Result<Option<String>, StorageError> {
        read_optional(&self.resolve(path)).await
    }
}
