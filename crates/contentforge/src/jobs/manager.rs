use std::sync::Arc;

use chrono::Utc;
use tracing::{info, info_span, warn, Instrument};

use super::combined::{self, CombinedContent};
use crate::ai::{ContentProcessor, ProcessRequest, PromptSource};
use crate::db::content_repo::{ContentItem, ContentSource};
use crate::db::job_repo::{self, JobFilter, JobTarget, ProcessingJob};
use crate::db::{bundle_repo, Database, DatabaseError};
use crate::error::{ForgeError, Result};
use crate::models::{new_id, JobStatus, Page, ProcessingType};
use crate::storage::ResultStore;

/// Per-job settings chosen at creation time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOptions {
    /// Extra instructions; when set the custom-prompt path is used.
    pub user_prompt: Option<String>,
    pub output_language: String,
    /// Run the job inside the creating call.
    pub execute_immediately: bool,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            user_prompt: None,
            output_language: "en".to_string(),
            execute_immediately: true,
        }
    }
}

/// Filters for listing a user's jobs.
#[derive(Debug, Clone, Default)]
pub struct JobQuery {
    pub page: Page,
    pub status: Option<JobStatus>,
    pub content_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExecutionPath {
    Single,
    Bundle,
}

impl ExecutionPath {
    fn for_job(job: &ProcessingJob) -> Self {
        if job.target.is_bundle() {
            ExecutionPath::Bundle
        } else {
            ExecutionPath::Single
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            ExecutionPath::Single => "single",
            ExecutionPath::Bundle => "bundle",
        }
    }
}

/// Creates, executes and retries processing jobs, and owns their status.
///
/// Execution is synchronous with respect to the caller: a job created with
/// `execute_immediately` has reached a terminal state when `create_*`
/// returns.
pub struct JobManager {
    db: Database,
    content: Arc<dyn ContentSource>,
    store: Arc<dyn ResultStore>,
    processor: Arc<dyn ContentProcessor>,
}

impl JobManager {
    pub fn new(
        db: Database,
        content: Arc<dyn ContentSource>,
        store: Arc<dyn ResultStore>,
        processor: Arc<dyn ContentProcessor>,
    ) -> Self {
        Self {
            db,
            content,
            store,
            processor,
        }
    }

    /// Creates a job over one content item.
    ///
    /// Execution failures do not surface as `Err`: the returned job is
    /// `failed` and carries the message. `Err` means the job could not be
    /// created or its outcome could not be recorded.
    pub async fn create_job(
        &self,
        content_id: &str,
        processing_type: ProcessingType,
        user_id: &str,
        options: JobOptions,
    ) -> Result<ProcessingJob> {
        if self.content.get_content_by_id(content_id).await?.is_none() {
            return Err(ForgeError::not_found("content", content_id));
        }

        let target = JobTarget::Content {
            content_id: content_id.to_string(),
        };
        self.create(target, processing_type, user_id, options).await
    }

    /// Creates a job over a snapshot of a bundle's content ids. Same
    /// contract as [`create_job`](Self::create_job).
    pub async fn create_bundle_job(
        &self,
        bundle_id: &str,
        content_ids: Vec<String>,
        processing_type: ProcessingType,
        user_id: &str,
        options: JobOptions,
    ) -> Result<ProcessingJob> {
        if bundle_repo::find_owned(&self.db, bundle_id, user_id)?.is_none() {
            return Err(ForgeError::not_found("bundle", bundle_id));
        }

        let target = JobTarget::Bundle {
            bundle_id: Some(bundle_id.to_string()),
            content_ids,
        };
        self.create(target, processing_type, user_id, options).await
    }

    async fn create(
        &self,
        target: JobTarget,
        processing_type: ProcessingType,
        user_id: &str,
        options: JobOptions,
    ) -> Result<ProcessingJob> {
        let now = Utc::now();
        let job = ProcessingJob {
            id: new_id(),
            target,
            processing_type,
            status: if options.execute_immediately {
                JobStatus::Processing
            } else {
                JobStatus::Pending
            },
            result_path: None,
            user_prompt: options.user_prompt.filter(|p| !p.trim().is_empty()),
            output_language: options.output_language,
            error_message: None,
            user_id: user_id.to_string(),
            created_at: now,
            updated_at: now,
        };
        job_repo::insert(&self.db, &job)?;

        info!(
            "Created {} job {} ({})",
            ExecutionPath::for_job(&job).as_str(),
            job.id,
            job.processing_type
        );

        if !options.execute_immediately {
            return Ok(job);
        }

        if let Err(e) = self.run_to_terminal(&job, ExecutionPath::for_job(&job)).await? {
            warn!("Job {} failed during creation: {}", job.id, e);
        }
        self.load(&job.id)
    }

    /// Runs a single-content job and returns the generated text.
    ///
    /// The terminal status is written before returning; errors are raised
    /// after the job has been marked failed.
    ///
    /// A bundle job is rejected with `InvalidState` and left untouched.
    pub async fn execute_job(&self, job_id: &str) -> Result<String> {
        let job = self.load_for(job_id, ExecutionPath::Single)?;
        self.run_to_terminal(&job, ExecutionPath::Single).await?
    }

    /// Runs a bundle job over its content id snapshot. A single-content job
    /// is rejected with `InvalidState` and left untouched.
    pub async fn execute_bundle_job(&self, job_id: &str) -> Result<String> {
        let job = self.load_for(job_id, ExecutionPath::Bundle)?;
        self.run_to_terminal(&job, ExecutionPath::Bundle).await?
    }

    /// Re-runs any job, choosing the execution path from its shape.
    pub async fn retry_job(&self, job_id: &str) -> Result<String> {
        let job = self.load(job_id)?;
        let path = ExecutionPath::for_job(&job);
        if !job.status.is_terminal() {
            warn!("Job {} is retried while still {}", job.id, job.status);
        }
        info!(
            "Retrying job {} (status: {}, path: {})",
            job.id,
            job.status,
            path.as_str()
        );
        self.run_to_terminal(&job, path).await?
    }

    /// Returns the stored result, or `None` while the job has none.
    pub async fn get_job_result(&self, job_id: &str) -> Result<Option<String>> {
        let Some(job) = job_repo::find_by_id(&self.db, job_id)? else {
            return Ok(None);
        };
        match job.result_path.as_deref() {
            Some(path) => Ok(self.store.read_processing_result(path).await?),
            None => Ok(None),
        }
    }

    /// Lists a user's jobs newest-first with the total match count.
    pub fn get_user_jobs(&self, user_id: &str, query: &JobQuery) -> Result<(Vec<ProcessingJob>, u64)> {
        query.page.validate()?;
        let filter = JobFilter {
            user_id: user_id.to_string(),
            status: query.status,
            content_id: query.content_id.clone(),
            limit: query.page.limit,
            offset: query.page.offset,
        };
        Ok(job_repo::query(&self.db, &filter)?)
    }

    pub fn get_job(&self, job_id: &str, user_id: &str) -> Result<Option<ProcessingJob>> {
        Ok(job_repo::find_owned(&self.db, job_id, user_id)?)
    }

    /// Deletes a job. Attempts that referenced it keep their row.
    pub fn delete_job(&self, job_id: &str, user_id: &str) -> Result<bool> {
        Ok(job_repo::delete_owned(&self.db, job_id, user_id)?)
    }

    /// Builds the combined document for `content_ids` without creating a job.
    pub async fn combine(&self, content_ids: &[String]) -> Result<CombinedContent> {
        Ok(combined::build(self.content.as_ref(), self.store.as_ref(), content_ids).await?)
    }

    fn load(&self, job_id: &str) -> Result<ProcessingJob> {
        job_repo::find_by_id(&self.db, job_id)?.ok_or_else(|| ForgeError::not_found("job", job_id))
    }

    fn load_for(&self, job_id: &str, path: ExecutionPath) -> Result<ProcessingJob> {
        let job = self.load(job_id)?;
        let actual = ExecutionPath::for_job(&job);
        if actual != path {
            return Err(ForgeError::InvalidState(format!(
                "job {} is a {} job and cannot run on the {} path",
                job.id,
                actual.as_str(),
                path.as_str()
            )));
        }
        Ok(job)
    }

    /// Runs the job and records the terminal status.
    ///
    /// The outer `Err` means the failed status itself could not be written;
    /// the inner result is the job's business outcome.
    async fn run_to_terminal(
        &self,
        job: &ProcessingJob,
        path: ExecutionPath,
    ) -> std::result::Result<Result<String>, DatabaseError> {
        let span = info_span!(
            "job.execute",
            job_id = %job.id,
            processing_type = %job.processing_type,
            path = path.as_str()
        );

        let outcome = async {
            match path {
                ExecutionPath::Single => self.run_single(job).await,
                ExecutionPath::Bundle => self.run_bundle(job).await,
            }
        }
        .instrument(span)
        .await;

        match outcome {
            Ok(text) => {
                info!("Job {} completed ({} chars)", job.id, text.len());
                Ok(Ok(text))
            }
            Err(e) => {
                warn!("Job {} failed: {}", job.id, e);
                job_repo::mark_failed(&self.db, &job.id, &e.to_string(), Utc::now())?;
                Ok(Err(e))
            }
        }
    }

    async fn run_single(&self, job: &ProcessingJob) -> Result<String> {
        let JobTarget::Content { content_id } = &job.target else {
            return Err(ForgeError::InvalidState(format!(
                "job {} runs over a bundle, not a single content item",
                job.id
            )));
        };

        self.begin(job)?;

        let item = self
            .content
            .get_content_by_id(content_id)
            .await?
            .ok_or_else(|| ForgeError::not_found("content", content_id.as_str()))?;

        let text = self.read_text(&item).await.ok_or_else(|| {
            ForgeError::InvalidState(format!(
                "extracted text for content {} is not available",
                item.id
            ))
        })?;

        let output = self
            .generate(job, &text, PromptSource::Item(item.source_type))
            .await?;
        self.finish(job, &output).await?;
        Ok(output)
    }

    async fn run_bundle(&self, job: &ProcessingJob) -> Result<String> {
        let JobTarget::Bundle { content_ids, .. } = &job.target else {
            return Err(ForgeError::InvalidState(format!(
                "job {} runs over a single content item, not a bundle",
                job.id
            )));
        };

        self.begin(job)?;

        if content_ids.is_empty() {
            return Err(ForgeError::InvalidState(format!(
                "bundle job {} has no content ids",
                job.id
            )));
        }

        let combined = self.combine(content_ids).await?;
        if combined.is_empty() {
            return Err(ForgeError::InvalidState(format!(
                "none of the {} content items of bundle job {} has readable text",
                content_ids.len(),
                job.id
            )));
        }
        if !combined.skipped.is_empty() {
            warn!(
                "Bundle job {} continues without {} of {} items",
                job.id,
                combined.skipped.len(),
                content_ids.len()
            );
        }

        let output = self
            .generate(job, &combined.text, PromptSource::Bundle)
            .await?;
        self.finish(job, &output).await?;
        Ok(output)
    }

    fn begin(&self, job: &ProcessingJob) -> Result<()> {
        if !job_repo::mark_processing(&self.db, &job.id, Utc::now())? {
            return Err(ForgeError::not_found("job", job.id.as_str()));
        }
        Ok(())
    }

    async fn finish(&self, job: &ProcessingJob, output: &str) -> Result<()> {
        let path = self.store.save_processing_result(&job.id, output).await?;
        if !job_repo::mark_completed(&self.db, &job.id, &path, Utc::now())? {
            return Err(ForgeError::not_found("job", job.id.as_str()));
        }
        Ok(())
    }

    /// Extracted text of `item`, or `None` when it is missing, empty or
    /// cannot be read.
    async fn read_text(&self, item: &ContentItem) -> Option<String> {
        let path = item.extracted_text_path.as_deref()?;
        match self.store.read_extracted_text(path).await {
            Ok(text) => text.filter(|t| !t.trim().is_empty()),
            Err(e) => {
                warn!("Cannot read extracted text for content {}: {}", item.id, e);
                None
            }
        }
    }

    async fn generate(&self, job: &ProcessingJob, text: &str, source: PromptSource) -> Result<String> {
        let request = ProcessRequest {
            text,
            processing_type: job.processing_type,
            source,
            user_id: &job.user_id,
            language: &job.output_language,
        };

        let response = match job.user_prompt.as_deref() {
            Some(user_prompt) => {
                self.processor
                    .process_content_with_prompt(request, user_prompt)
                    .await?
            }
            None => self.processor.process_content(request).await?,
        };

        response.filter(|r| !r.trim().is_empty()).ok_or_else(|| {
            ForgeError::Processing(format!("AI processor returned no output for job {}", job.id))
        })
    }
}
