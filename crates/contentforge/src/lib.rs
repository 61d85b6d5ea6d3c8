pub mod ai;
pub mod bundles;
pub mod config;
pub mod db;
pub mod error;
pub mod jobs;
pub mod logging;
pub mod models;
pub mod sanitize;
pub mod services;
pub mod storage;

pub use ai::{AiError, AnthropicProcessor, ContentProcessor, ProcessRequest, PromptSource};
pub use bundles::{
    AttemptDiff, BundleDetails, BundleManager, BundleProcessor, ProcessBundleRequest,
    ProcessOutcome,
};
pub use config::{load_config, Config};
pub use db::{Database, DatabaseError};
pub use error::{ConfigError, ErrorKind, ForgeError, Result, StorageError};
pub use jobs::{JobManager, JobOptions, JobQuery};
pub use models::{ContentStatus, JobStatus, Page, ProcessingType, SourceType};
pub use services::Services;
pub use storage::{FileResultStore, ResultStore};
