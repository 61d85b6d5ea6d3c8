//! Wiring of the managers around one database, result store and AI
//! processor.

use std::sync::Arc;

use log::info;

use crate::ai::{AnthropicProcessor, ContentProcessor};
use crate::bundles::{BundleManager, BundleProcessor};
use crate::config::Config;
use crate::db::Database;
use crate::error::Result;
use crate::jobs::JobManager;
use crate::storage::{FileResultStore, ResultStore};

/// The managers a front end talks to.
pub struct Services {
    pub jobs: Arc<JobManager>,
    pub bundles: BundleManager,
    pub processing: BundleProcessor,
}

impl Services {
    /// Builds the managers over injected collaborators. Content items are
    /// read from the same database.
    pub fn new(
        db: Database,
        store: Arc<dyn ResultStore>,
        processor: Arc<dyn ContentProcessor>,
    ) -> Self {
        let jobs = Arc::new(JobManager::new(
            db.clone(),
            Arc::new(db.clone()),
            store,
            processor,
        ));
        let bundles = BundleManager::new(db);
        let processing = BundleProcessor::new(jobs.clone(), bundles.clone());

        Self {
            jobs,
            bundles,
            processing,
        }
    }

    /// Opens the configured database and data directory and connects to the
    /// configured AI provider.
    pub fn from_config(config: &Config) -> Result<Self> {
        let db_path = config.database_path();
        let db = Database::open(&db_path)?;

        let data_dir = config.data_directory();
        let store = Arc::new(FileResultStore::new(&data_dir));

        let processor = Arc::new(AnthropicProcessor::from_config(&config.ai)?);

        info!(
            "Services ready (database: {}, data: {}, model: {})",
            db_path.display(),
            data_dir.display(),
            processor.model()
        );

        Ok(Self::new(db, store, processor))
    }
}
