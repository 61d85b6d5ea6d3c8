//! `ContentProcessor` backed by the Anthropic Messages API.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::processor::{AiError, ContentProcessor, ProcessRequest};
use super::prompts;
use crate::config::AiConfig;

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct MessageRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: String,
    messages: Vec<Message>,
    metadata: RequestMetadata<'a>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct RequestMetadata<'a> {
    user_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}

/// Joins the text blocks of a response. `None` when there is no text.
fn extract_text(response: MessageResponse) -> Option<String> {
    let text = response
        .content
        .into_iter()
        .filter(|block| block.block_type == "text")
        .filter_map(|block| block.text)
        .collect::<Vec<_>>()
        .join("\n");

    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

pub struct AnthropicProcessor {
    client: Client,
    api_key: SecretString,
    endpoint: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicProcessor {
    /// Builds a processor from config, reading the API key from the
    /// configured environment variable.
    pub fn from_config(config: &AiConfig) -> Result<Self, AiError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| AiError::MissingApiKey(config.api_key_env.clone()))?;
        Self::new(config, SecretString::from(api_key))
    }

    pub fn new(config: &AiConfig, api_key: SecretString) -> Result<Self, AiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        info!(
            "AI processor configured (model: {}, timeout: {}s)",
            config.model, config.timeout_secs
        );

        Ok(Self {
            client,
            api_key,
            endpoint: format!("{}/v1/messages", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        request: ProcessRequest<'_>,
        user_message: String,
    ) -> Result<Option<String>, AiError> {
        let body = MessageRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: prompts::system_prompt(
                request.processing_type,
                request.source,
                request.language,
            ),
            messages: vec![Message {
                role: "user",
                content: user_message,
            }],
            metadata: RequestMetadata {
                user_id: request.user_id,
            },
        };

        debug!(
            "Requesting {} for {} input ({} chars)",
            request.processing_type,
            request.source.as_str(),
            request.text.len()
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: MessageResponse = response
            .json()
            .await
            .map_err(|e| AiError::InvalidResponse(e.to_string()))?;

        Ok(extract_text(parsed))
    }
}

#[async_trait]
impl ContentProcessor for AnthropicProcessor {
    async fn process_content(&self, request: ProcessRequest<'_>) -> Result<Option<String>, AiError> {
        let template = prompts::user_prompt_template(request.processing_type);
        let message = prompts::render_user_prompt(template, request.text);
        self.complete(request, message).await
    }

    async fn process_content_with_prompt(
        &self,
        request: ProcessRequest<'_>,
        user_prompt: &str,
    ) -> Result<Option<String>, AiError> {
        let message =
            prompts::render_with_instructions(request.processing_type, request.text, user_prompt);
        self.complete(request, message).await
    }
}
