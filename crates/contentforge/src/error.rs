use std::path::PathBuf;
use thiserror::Error;

use crate::ai::AiError;
use crate::db::DatabaseError;

/// Errors raised by the job and bundle managers.
#[derive(Error, Debug)]
pub enum ForgeError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("AI provider error: {0}")]
    Ai(#[from] AiError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Coarse classification used by callers that map errors onto a transport
/// (HTTP status codes, CLI exit codes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    Processing,
    Transport,
}

impl ForgeError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidState(_) | Self::Validation(_) => ErrorKind::InvalidState,
            Self::Processing(_) => ErrorKind::Processing,
            Self::Database(_) | Self::Storage(_) | Self::Ai(_) | Self::Config(_) => {
                ErrorKind::Transport
            }
        }
    }

    /// HTTP status an API layer should answer with.
    pub fn http_status(&self) -> u16 {
        match self.kind() {
            ErrorKind::NotFound => 404,
            ErrorKind::InvalidState => 400,
            ErrorKind::Processing | ErrorKind::Transport => 500,
        }
    }

    /// Message safe to show to an end user. Server-side failures are
    /// reduced to a generic text; the detail belongs in the logs.
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::NotFound | ErrorKind::InvalidState => self.to_string(),
            ErrorKind::Processing | ErrorKind::Transport => {
                "Processing failed due to an internal error".to_string()
            }
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("Failed to initialize logging: {0}")]
    Logging(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to move file from '{from}' to '{to}': {source}")]
    MoveFile {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid result key: {0}")]
    InvalidKey(String),
}

pub type Result<T> = std::result::Result<T, ForgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_maps_to_404() {
        let err = ForgeError::not_found("job", "j-1");
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.http_status(), 404);
        assert_eq!(err.to_string(), "job not found: j-1");
    }

    #[test]
    fn test_validation_maps_to_400() {
        let err = ForgeError::Validation("content_ids must not be empty".to_string());
        assert_eq!(err.http_status(), 400);
        assert!(err.public_message().contains("content_ids"));
    }

    #[test]
    fn test_server_errors_hide_detail() {
        let err = ForgeError::Processing("model returned nothing for secret prompt".to_string());
        assert_eq!(err.http_status(), 500);
        assert!(!err.public_message().contains("secret"));

        let err = ForgeError::Database(DatabaseError::LockPoisoned);
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(err.http_status(), 500);
    }
}
