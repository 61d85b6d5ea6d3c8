//! The AI text-generation capability consumed by the job manager.

use async_trait::async_trait;
use thiserror::Error;

use super::prompts::PromptSource;
use crate::models::ProcessingType;

/// Errors that can occur when talking to an AI provider.
#[derive(Debug, Error)]
pub enum AiError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("API key not set: environment variable {0} is missing or empty")]
    MissingApiKey(String),
}

/// Input for one generation call.
#[derive(Debug, Clone, Copy)]
pub struct ProcessRequest<'a> {
    pub text: &'a str,
    pub processing_type: ProcessingType,
    pub source: PromptSource,
    pub user_id: &'a str,
    pub language: &'a str,
}

/// Text-in/text-out generation, independent of model and provider.
///
/// `Ok(None)` (or empty text) means the provider answered without usable
/// output; `Err` is reserved for transport and authentication failures.
#[async_trait]
pub trait ContentProcessor: Send + Sync {
    async fn process_content(&self, request: ProcessRequest<'_>) -> Result<Option<String>, AiError>;

    async fn process_content_with_prompt(
        &self,
        request: ProcessRequest<'_>,
        user_prompt: &str,
    ) -> Result<Option<String>, AiError>;
}
