//! The "process this bundle" flow: record an attempt, run a bundle job over
//! a snapshot of the bundle's items and link the result back.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, info_span, warn, Instrument};

use super::manager::BundleManager;
use crate::ai::prompts;
use crate::ai::PromptSource;
use crate::db::attempt_repo::{BundleAttempt, NewAttempt};
use crate::db::job_repo::ProcessingJob;
use crate::error::{ForgeError, Result};
use crate::jobs::{JobManager, JobOptions};
use crate::models::{JobStatus, ProcessingType};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessBundleRequest {
    pub processing_type: ProcessingType,
    pub output_language: String,
    pub custom_instructions: Option<String>,
}

impl ProcessBundleRequest {
    pub fn new(processing_type: ProcessingType) -> Self {
        Self {
            processing_type,
            output_language: "en".to_string(),
            custom_instructions: None,
        }
    }
}

/// The recorded attempt and the job that ran for it, both as stored after
/// the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessOutcome {
    pub attempt: BundleAttempt,
    pub job: ProcessingJob,
}

impl ProcessOutcome {
    pub fn succeeded(&self) -> bool {
        self.job.status == JobStatus::Completed
    }
}

pub struct BundleProcessor {
    jobs: Arc<JobManager>,
    bundles: BundleManager,
}

impl BundleProcessor {
    pub fn new(jobs: Arc<JobManager>, bundles: BundleManager) -> Self {
        Self { jobs, bundles }
    }

    /// Processes a bundle the user owns. Returns `None` when the bundle is
    /// not visible to the user.
    ///
    /// A failed run is not an error: the outcome carries the failed job and
    /// an attempt without a result.
    pub async fn process_bundle(
        &self,
        bundle_id: &str,
        user_id: &str,
        request: ProcessBundleRequest,
    ) -> Result<Option<ProcessOutcome>> {
        let Some(bundle) = self.bundles.get_bundle_by_id(bundle_id, user_id)? else {
            return Ok(None);
        };

        let span = info_span!(
            "bundle.process",
            bundle_id = %bundle.id,
            processing_type = %request.processing_type
        );

        async move {
            let combined = self.jobs.combine(&bundle.content_ids).await?;
            let preview = (!combined.is_empty()).then(|| combined.preview());

            let custom_instructions = request
                .custom_instructions
                .filter(|i| !i.trim().is_empty());
            let system_prompt = prompts::system_prompt(
                request.processing_type,
                PromptSource::Bundle,
                &request.output_language,
            );

            let job = self
                .jobs
                .create_bundle_job(
                    &bundle.id,
                    bundle.content_ids.clone(),
                    request.processing_type,
                    user_id,
                    JobOptions {
                        user_prompt: custom_instructions.clone(),
                        output_language: request.output_language.clone(),
                        execute_immediately: false,
                    },
                )
                .await?;

            let attempt = match self.bundles.create_bundle_attempt(&NewAttempt {
                bundle_id: bundle.id.clone(),
                processing_type: request.processing_type,
                output_language: request.output_language,
                system_prompt,
                user_prompt: Some(prompts::user_prompt_template(request.processing_type).to_string()),
                combined_content_preview: preview,
                custom_instructions,
                job_id: Some(job.id.clone()),
            }) {
                Ok(attempt) => attempt,
                Err(e) => {
                    warn!("Dropping job {}: attempt could not be recorded: {}", job.id, e);
                    if let Err(cleanup) = self.jobs.delete_job(&job.id, user_id) {
                        warn!("Failed to delete job {}: {}", job.id, cleanup);
                    }
                    return Err(e);
                }
            };

            let run = self.jobs.retry_job(&job.id).await;

            let job = self
                .jobs
                .get_job(&job.id, user_id)?
                .ok_or_else(|| ForgeError::not_found("job", job.id.as_str()))?;

            match run {
                Ok(_) => {
                    if let Some(path) = job.result_path.as_deref() {
                        self.bundles.update_bundle_attempt_result(&attempt.id, path)?;
                    }
                    info!(
                        "Bundle attempt #{} completed with job {}",
                        attempt.attempt_number, job.id
                    );
                }
                // Only a failure recorded on the job is a business outcome.
                Err(e) if job.status == JobStatus::Failed => {
                    warn!("Bundle attempt #{} failed: {}", attempt.attempt_number, e);
                }
                Err(e) => return Err(e),
            }

            let attempt = self
                .bundles
                .get_bundle_attempt_by_id(&attempt.id, user_id)?
                .ok_or_else(|| ForgeError::not_found("bundle attempt", attempt.id.as_str()))?;

            Ok(Some(ProcessOutcome { attempt, job }))
        }
        .instrument(span)
        .await
    }
}
