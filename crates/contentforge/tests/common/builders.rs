//! Builders for test data.

#![allow(dead_code)]

use chrono::Utc;
use serde_json::json;

use contentforge::db::attempt_repo::NewAttempt;
use contentforge::db::content_repo::ContentItem;
use contentforge::{ContentStatus, ProcessingType, SourceType};

/// Builder for content items and their extracted text.
pub struct ContentItemBuilder {
    id: String,
    user_id: String,
    title: Option<String>,
    source_type: SourceType,
    source_url: Option<String>,
    text: Option<String>,
    has_text_path: bool,
}

impl ContentItemBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            user_id: "alice".to_string(),
            title: None,
            source_type: SourceType::Web,
            source_url: None,
            text: None,
            has_text_path: true,
        }
    }

    pub fn user(mut self, user_id: &str) -> Self {
        self.user_id = user_id.to_string();
        self
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    pub fn source_type(mut self, source_type: SourceType) -> Self {
        self.source_type = source_type;
        self
    }

    pub fn url(mut self, url: &str) -> Self {
        self.source_url = Some(url.to_string());
        self
    }

    /// Extracted text written to the data directory.
    pub fn text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    /// The item never had text extracted.
    pub fn without_text_path(mut self) -> Self {
        self.has_text_path = false;
        self
    }

    pub fn build(self) -> (ContentItem, Option<String>) {
        let now = Utc::now();
        let metadata = match &self.title {
            Some(title) => json!({ "title": title }),
            None => json!({}),
        };
        let item = ContentItem {
            id: self.id.clone(),
            content_hash: format!("sha256-{}", self.id),
            source_type: self.source_type,
            source_url: self.source_url,
            file_reference: None,
            extracted_text_path: self
                .has_text_path
                .then(|| format!("extracted/{}.txt", self.id)),
            metadata,
            user_id: self.user_id,
            processing_status: ContentStatus::Completed,
            created_at: now,
            updated_at: now,
        };
        (item, self.text)
    }
}

/// Builder for attempts recorded directly through the bundle manager.
pub struct AttemptBuilder {
    attempt: NewAttempt,
}

impl AttemptBuilder {
    pub fn new(bundle_id: &str) -> Self {
        Self {
            attempt: NewAttempt {
                bundle_id: bundle_id.to_string(),
                processing_type: ProcessingType::Summary,
                output_language: "en".to_string(),
                system_prompt: "You are an expert analyst.".to_string(),
                user_prompt: Some("Summarize the following content:\n\n{content}".to_string()),
                combined_content_preview: None,
                custom_instructions: None,
                job_id: None,
            },
        }
    }

    pub fn processing_type(mut self, processing_type: ProcessingType) -> Self {
        self.attempt.processing_type = processing_type;
        self
    }

    pub fn language(mut self, language: &str) -> Self {
        self.attempt.output_language = language.to_string();
        self
    }

    pub fn instructions(mut self, instructions: &str) -> Self {
        self.attempt.custom_instructions = Some(instructions.to_string());
        self
    }

    pub fn system_prompt(mut self, prompt: &str) -> Self {
        self.attempt.system_prompt = prompt.to_string();
        self
    }

    pub fn build(self) -> NewAttempt {
        self.attempt
    }
}

pub fn ids(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}
