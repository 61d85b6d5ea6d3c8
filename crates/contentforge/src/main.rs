//! contentforge CLI: bundles, attempts and AI processing jobs over
//! extracted content.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

use contentforge::config::{load_config, Config};
use contentforge::{
    JobOptions, JobQuery, JobStatus, Page, ProcessBundleRequest, ProcessingType, Services,
};

/// Process extracted content with AI, one item or a bundle at a time.
#[derive(Parser)]
#[command(name = "contentforge", version, about, long_about = None)]
struct Cli {
    /// Path to the JSON config file. Defaults to ~/.contentforge/contentforge.json
    /// when that file exists.
    #[arg(long, env = "CONTENTFORGE_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// User the operations run as.
    #[arg(long, env = "CONTENTFORGE_USER", default_value = "local", global = true)]
    user: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Manage bundles and their attempts.
    Bundle {
        #[command(subcommand)]
        action: BundleAction,
    },
    /// Manage processing jobs.
    Job {
        #[command(subcommand)]
        action: JobAction,
    },
}

#[derive(Subcommand)]
enum BundleAction {
    /// Create a bundle from content ids (in order).
    Create {
        #[arg(long = "content-id", required = true)]
        content_ids: Vec<String>,
        #[arg(long)]
        name: Option<String>,
    },
    /// List bundles, newest first.
    List {
        #[arg(long, default_value_t = 20)]
        limit: u64,
        #[arg(long, default_value_t = 0)]
        offset: u64,
    },
    /// Show a bundle with its content items and attempt count.
    Show { bundle_id: String },
    /// Rename a bundle or replace its content ids.
    Update {
        bundle_id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long = "content-id")]
        content_ids: Vec<String>,
    },
    /// Delete a bundle and its attempts.
    Delete { bundle_id: String },
    /// Run a new attempt over the bundle's current content.
    Process {
        bundle_id: String,
        #[arg(long = "type", value_name = "TYPE")]
        processing_type: ProcessingType,
        /// Output language (ISO 639-1). Defaults to the configured language.
        #[arg(long)]
        language: Option<String>,
        #[arg(long)]
        instructions: Option<String>,
    },
    /// List a bundle's attempts.
    Attempts { bundle_id: String },
    /// Compare two attempts of the same bundle.
    Diff { attempt1: String, attempt2: String },
    /// Delete one attempt.
    DeleteAttempt { attempt_id: String },
}

#[derive(Subcommand)]
enum JobAction {
    /// Create a job over one content item.
    Create {
        content_id: String,
        #[arg(long = "type", value_name = "TYPE")]
        processing_type: ProcessingType,
        #[arg(long)]
        language: Option<String>,
        /// Extra instructions for the model.
        #[arg(long)]
        prompt: Option<String>,
        /// Only record the job; run it later with `job retry`.
        #[arg(long)]
        no_execute: bool,
    },
    /// Run a job again, whatever its current status.
    Retry { job_id: String },
    /// Print a job's stored result.
    Result { job_id: String },
    /// Show a job.
    Show { job_id: String },
    /// List jobs, newest first.
    List {
        #[arg(long)]
        status: Option<JobStatus>,
        #[arg(long)]
        content_id: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: u64,
        #[arg(long, default_value_t = 0)]
        offset: u64,
    },
    /// Delete a job.
    Delete { job_id: String },
}

#[derive(Serialize)]
struct Listing<T: Serialize> {
    items: Vec<T>,
    total: u64,
}

#[derive(Serialize)]
struct Deleted<'a> {
    id: &'a str,
    deleted: bool,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn resolve_config(path: Option<PathBuf>) -> Result<Config> {
    let path = path.or_else(|| {
        dirs::home_dir()
            .map(|h| h.join(".contentforge").join("contentforge.json"))
            .filter(|p| p.exists())
    });

    match path {
        Some(path) => load_config(&path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(Config::default()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = resolve_config(cli.config)?;
    contentforge::logging::init(&config.logging)?;

    let services = Services::from_config(&config)?;
    let user = cli.user.as_str();

    match cli.command {
        Command::Bundle { action } => run_bundle(&services, &config, user, action).await,
        Command::Job { action } => run_job(&services, &config, user, action).await,
    }
}

async fn run_bundle(
    services: &Services,
    config: &Config,
    user: &str,
    action: BundleAction,
) -> Result<()> {
    let bundles = &services.bundles;

    match action {
        BundleAction::Create { content_ids, name } => {
            print_json(&bundles.create_bundle(user, content_ids, name)?)
        }
        BundleAction::List { limit, offset } => {
            let (items, total) = bundles.get_user_bundles(user, Page::new(limit, offset))?;
            print_json(&Listing { items, total })
        }
        BundleAction::Show { bundle_id } => {
            let details = bundles
                .get_bundle_with_details(&bundle_id, user)?
                .ok_or_else(|| anyhow!("Bundle {} not found", bundle_id))?;
            print_json(&details)
        }
        BundleAction::Update {
            bundle_id,
            name,
            content_ids,
        } => {
            let content_ids = (!content_ids.is_empty()).then_some(content_ids);
            if !bundles.update_bundle(&bundle_id, user, name.as_deref(), content_ids.as_deref())? {
                return Err(anyhow!("Bundle {} not found", bundle_id));
            }
            let bundle = bundles
                .get_bundle_by_id(&bundle_id, user)?
                .ok_or_else(|| anyhow!("Bundle {} not found", bundle_id))?;
            print_json(&bundle)
        }
        BundleAction::Delete { bundle_id } => {
            let deleted = bundles.delete_bundle(&bundle_id, user)?;
            print_json(&Deleted {
                id: &bundle_id,
                deleted,
            })
        }
        BundleAction::Process {
            bundle_id,
            processing_type,
            language,
            instructions,
        } => {
            let request = ProcessBundleRequest {
                processing_type,
                output_language: language.unwrap_or_else(|| config.default_output_language.clone()),
                custom_instructions: instructions,
            };
            let outcome = services
                .processing
                .process_bundle(&bundle_id, user, request)
                .await?
                .ok_or_else(|| anyhow!("Bundle {} not found", bundle_id))?;
            print_json(&outcome)?;
            if !outcome.succeeded() {
                std::process::exit(2);
            }
            Ok(())
        }
        BundleAction::Attempts { bundle_id } => {
            print_json(&bundles.get_bundle_attempts(&bundle_id, user)?)
        }
        BundleAction::Diff { attempt1, attempt2 } => {
            let diff = bundles
                .get_bundle_attempt_diff(&attempt1, &attempt2, user)?
                .ok_or_else(|| {
                    anyhow!(
                        "Attempts {} and {} not found or not from the same bundle",
                        attempt1,
                        attempt2
                    )
                })?;
            print_json(&diff)
        }
        BundleAction::DeleteAttempt { attempt_id } => {
            let deleted = bundles.delete_bundle_attempt(&attempt_id, user)?;
            print_json(&Deleted {
                id: &attempt_id,
                deleted,
            })
        }
    }
}

async fn run_job(services: &Services, config: &Config, user: &str, action: JobAction) -> Result<()> {
    let jobs = &services.jobs;

    match action {
        JobAction::Create {
            content_id,
            processing_type,
            language,
            prompt,
            no_execute,
        } => {
            let options = JobOptions {
                user_prompt: prompt,
                output_language: language.unwrap_or_else(|| config.default_output_language.clone()),
                execute_immediately: !no_execute,
            };
            let job = jobs
                .create_job(&content_id, processing_type, user, options)
                .await?;
            print_json(&job)
        }
        JobAction::Retry { job_id } => {
            owned_job(services, &job_id, user)?;
            let text = jobs.retry_job(&job_id).await?;
            println!("{}", text);
            Ok(())
        }
        JobAction::Result { job_id } => {
            owned_job(services, &job_id, user)?;
            let text = jobs
                .get_job_result(&job_id)
                .await?
                .ok_or_else(|| anyhow!("Job {} has no result yet", job_id))?;
            println!("{}", text);
            Ok(())
        }
        JobAction::Show { job_id } => print_json(&owned_job(services, &job_id, user)?),
        JobAction::List {
            status,
            content_id,
            limit,
            offset,
        } => {
            let query = JobQuery {
                page: Page::new(limit, offset),
                status,
                content_id,
            };
            let (items, total) = jobs.get_user_jobs(user, &query)?;
            print_json(&Listing { items, total })
        }
        JobAction::Delete { job_id } => {
            let deleted = jobs.delete_job(&job_id, user)?;
            print_json(&Deleted {
                id: &job_id,
                deleted,
            })
        }
    }
}

fn owned_job(
    services: &Services,
    job_id: &str,
    user: &str,
) -> Result<contentforge::db::job_repo::ProcessingJob> {
    services
        .jobs
        .get_job(job_id, user)?
        .ok_or_else(|| anyhow!("Job {} not found", job_id))
}
