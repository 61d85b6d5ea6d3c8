//! Test harness for isolated test execution.
//!
//! Every harness owns its own temp directory and in-memory database, so
//! tests can run in parallel.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use contentforge::ai::{AiError, ContentProcessor, ProcessRequest, PromptSource};
use contentforge::db::content_repo;
use contentforge::{Database, FileResultStore, ProcessingType, Services};

use super::builders::ContentItemBuilder;

/// What the scripted processor answers with.
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    /// `Ok(None)`: the provider produced nothing.
    Nothing,
    /// An empty string.
    Blank,
    /// A transport-level failure.
    Error(String),
}

/// One call received by the scripted processor.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub text: String,
    pub processing_type: ProcessingType,
    pub source: PromptSource,
    pub language: String,
    pub user_prompt: Option<String>,
}

/// AI processor answering from a queue of replies. When the queue is empty
/// it answers with `"Generated output"`.
#[derive(Default)]
pub struct ScriptedProcessor {
    replies: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedProcessor {
    pub fn push(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn last_call(&self) -> RecordedCall {
        self.calls().last().cloned().expect("processor was never called")
    }

    fn answer(
        &self,
        request: ProcessRequest<'_>,
        user_prompt: Option<&str>,
    ) -> Result<Option<String>, AiError> {
        self.calls.lock().unwrap().push(RecordedCall {
            text: request.text.to_string(),
            processing_type: request.processing_type,
            source: request.source,
            language: request.language.to_string(),
            user_prompt: user_prompt.map(str::to_string),
        });

        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Reply::Text("Generated output".to_string()));

        match reply {
            Reply::Text(text) => Ok(Some(text)),
            Reply::Nothing => Ok(None),
            Reply::Blank => Ok(Some(String::new())),
            Reply::Error(message) => Err(AiError::Api {
                status: 503,
                message,
            }),
        }
    }
}

#[async_trait]
impl ContentProcessor for ScriptedProcessor {
    async fn process_content(&self, request: ProcessRequest<'_>) -> Result<Option<String>, AiError> {
        self.answer(request, None)
    }

    async fn process_content_with_prompt(
        &self,
        request: ProcessRequest<'_>,
        user_prompt: &str,
    ) -> Result<Option<String>, AiError> {
        self.answer(request, Some(user_prompt))
    }
}

/// Isolated environment: data directory, database, scripted processor and
/// the wired managers.
pub struct TestHarness {
    temp_dir: TempDir,
    pub db: Database,
    pub processor: Arc<ScriptedProcessor>,
    pub services: Services,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db = Database::open_in_memory().expect("Failed to open test database");
        let processor = Arc::new(ScriptedProcessor::default());
        let store = Arc::new(FileResultStore::new(temp_dir.path()));
        let services = Services::new(db.clone(), store, processor.clone());

        Self {
            temp_dir,
            db,
            processor,
            services,
        }
    }

    pub fn data_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Resolves a store-relative path inside the data directory.
    pub fn data_path(&self, relative: &str) -> PathBuf {
        self.temp_dir.path().join(relative)
    }

    /// Writes raw bytes to a store-relative path.
    pub fn write_bytes(&self, relative: &str, bytes: &[u8]) {
        let full = self.data_path(relative);
        std::fs::create_dir_all(full.parent().unwrap()).unwrap();
        std::fs::write(full, bytes).unwrap();
    }

    /// Inserts a content item and writes its extracted text, if any.
    pub fn add_content(&self, builder: ContentItemBuilder) -> String {
        let (item, text) = builder.build();
        if let (Some(path), Some(text)) = (&item.extracted_text_path, text) {
            let full = self.data_path(path);
            std::fs::create_dir_all(full.parent().unwrap()).unwrap();
            std::fs::write(full, text).unwrap();
        }
        content_repo::insert(&self.db, &item).expect("Failed to insert content item");
        item.id
    }
}
