//! Job command handlers
//!
//! Submitting jobs from JSON files, looking them up, and removing them.

use anyhow::{Result, bail};
use clap::Subcommand;
use colored::*;
use dendro_client::OrchestratorClient;
use dendro_core::domain::job::{JobDefinition, JobStatus};
use dendro_core::dto::job::{
    CreateJobRequest, DeleteJobsRequest, FindJobByDefinitionRequest, JobQuery,
};

use super::read_json;
use crate::config::Config;
use crate::display::{print_job_details, print_job_summary};

/// Job subcommands
#[derive(Subcommand)]
pub enum JobCommands {
    /// Submit a job described by a JSON file ("-" for stdin)
    Create {
        /// Path to a createJob request document
        file: String,

        /// Always create a new job
        #[arg(long)]
        skip_cache: bool,

        /// Replace an equivalent job that failed
        #[arg(long)]
        rerun_failing: bool,

        /// With --rerun-failing, delete the failed job
        #[arg(long, requires = "rerun_failing")]
        delete_failing: bool,
    },
    /// Get job details
    Get {
        /// Job ID
        id: String,
    },
    /// Find the job an equivalent definition would reuse
    Find {
        /// Service the job belongs to
        service: String,

        /// Path to a job definition document
        definition: String,
    },
    /// List jobs matching filters
    List {
        #[arg(long)]
        service: Option<String>,

        #[arg(long)]
        user: Option<String>,

        #[arg(long)]
        batch: Option<String>,

        #[arg(long)]
        compute_client: Option<String>,

        /// pending, starting, running, completed or failed
        #[arg(long)]
        status: Option<JobStatus>,

        /// Required tags (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        tags: Vec<String>,

        #[arg(long)]
        limit: Option<usize>,
    },
    /// Request cancellation of a job
    Cancel {
        /// Job ID
        id: String,
    },
    /// Delete jobs; jobs that already ran are archived
    Delete {
        /// Job IDs
        #[arg(required = true)]
        ids: Vec<String>,

        /// Act as this user (admins only)
        #[arg(long)]
        user: Option<String>,
    },
}

/// Handle job commands
pub async fn handle_job_command(command: JobCommands, config: &Config) -> Result<()> {
    let client = OrchestratorClient::new(&config.orchestrator_url);

    match command {
        JobCommands::Create {
            file,
            skip_cache,
            rerun_failing,
            delete_failing,
        } => {
            let mut req: CreateJobRequest = read_json(&file)?;
            req.skip_cache |= skip_cache;
            req.rerun_failing |= rerun_failing;
            req.delete_failing |= delete_failing;
            create_job(&client, config.api_key()?, req).await
        }
        JobCommands::Get { id } => get_job(&client, &id).await,
        JobCommands::Find { service, definition } => {
            let job_definition: JobDefinition = read_json(&definition)?;
            find_job(&client, service, job_definition).await
        }
        JobCommands::List {
            service,
            user,
            batch,
            compute_client,
            status,
            tags,
            limit,
        } => {
            let query = JobQuery {
                service_name: service,
                user_id: user,
                batch_id: batch,
                compute_client_id: compute_client,
                status,
                tags: (!tags.is_empty()).then_some(tags),
                job_ids: None,
                limit,
            };
            list_jobs(&client, query).await
        }
        JobCommands::Cancel { id } => cancel_job(&client, config.api_key()?, &id).await,
        JobCommands::Delete { ids, user } => {
            delete_jobs(&client, config.api_key()?, ids, user).await
        }
    }
}

async fn create_job(
    client: &OrchestratorClient,
    api_key: &str,
    req: CreateJobRequest,
) -> Result<()> {
    let job = client.create_job(api_key, &req).await?;

    println!("{} Job submitted", "✓".green());
    println!();
    print_job_details(&job);

    Ok(())
}

async fn get_job(client: &OrchestratorClient, id: &str) -> Result<()> {
    let job = client.get_job(id).await?;
    print_job_details(&job);
    Ok(())
}

async fn find_job(
    client: &OrchestratorClient,
    service_name: String,
    job_definition: JobDefinition,
) -> Result<()> {
    let req = FindJobByDefinitionRequest {
        service_name,
        job_definition,
    };

    match client.find_job_by_definition(&req).await? {
        Some(job) => print_job_details(&job),
        None => println!("{}", "No equivalent job found.".yellow()),
    }

    Ok(())
}

async fn list_jobs(client: &OrchestratorClient, query: JobQuery) -> Result<()> {
    if query.service_name.is_none()
        && query.user_id.is_none()
        && query.batch_id.is_none()
        && query.compute_client_id.is_none()
    {
        bail!("give at least one of --service, --user, --batch or --compute-client");
    }

    let jobs = client.query_jobs(&query).await?;

    if jobs.is_empty() {
        println!("{}", "No jobs found.".yellow());
    } else {
        println!("{}", format!("Found {} job(s):", jobs.len()).bold());
        println!();
        for job in jobs {
            print_job_summary(&job);
        }
    }

    Ok(())
}

async fn cancel_job(client: &OrchestratorClient, api_key: &str, id: &str) -> Result<()> {
    client.cancel_job(api_key, id).await?;
    println!("{} Cancellation requested for job {}", "✓".green(), id.cyan());
    Ok(())
}

async fn delete_jobs(
    client: &OrchestratorClient,
    api_key: &str,
    job_ids: Vec<String>,
    user_id: Option<String>,
) -> Result<()> {
    let response = client.delete_jobs(api_key, &DeleteJobsRequest { job_ids, user_id }).await?;
    println!(
        "{} Deleted {} job(s), archived {}",
        "✓".green(),
        response.deleted_count.to_string().bold(),
        response.archived_count.to_string().bold()
    );
    Ok(())
}
