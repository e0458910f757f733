//! Dendro Runner
//!
//! The daemon behind one registered compute client.
//!
//! Architecture:
//! - Configuration: credentials and tuning from the environment
//! - Repository: HTTP communication with the orchestrator
//! - Services: job process execution and cancellation watching
//! - Scheduler: job polling and lifecycle management
//!
//! The runner polls the orchestrator for jobs admitted to its compute
//! slots, claims them, runs each as a child process, and reports the result.

mod config;
mod repository;
mod scheduler;
mod service;
#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use dendro_client::OrchestratorClient;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::repository::{HttpJobRepository, JobRepository};
use crate::scheduler::JobPoller;
use crate::service::{ExecutionService, ProcessExecutionService};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dendro_runner=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Dendro Runner");

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate()?;
    info!(
        "Loaded configuration: compute_client_id={}, orchestrator_url={}",
        config.compute_client_id, config.orchestrator_url
    );

    let client = Arc::new(OrchestratorClient::new(config.orchestrator_url.clone()));

    // The orchestrator may still be starting (common in container environments)
    connect_with_retry(&client, &config.compute_client_id).await?;

    let repository: Arc<dyn JobRepository> = Arc::new(HttpJobRepository::new(
        Arc::clone(&client),
        config.compute_client_id.clone(),
        config.compute_client_private_key.clone(),
    ));
    let executor: Arc<dyn ExecutionService> = Arc::new(ProcessExecutionService::new(
        config.job_command.clone(),
        config.job_workdir.clone(),
        config.orchestrator_url.clone(),
    ));

    info!(
        "Poll interval: {:?}, max parallel jobs: {}",
        config.poll_interval, config.max_parallel_jobs
    );

    let poller = JobPoller::new(config, repository, executor);
    if let Err(e) = poller.run().await {
        error!("Poller error: {:#}", e);
        return Err(e);
    }

    Ok(())
}

/// Looks up this compute client's record, retrying with exponential backoff
/// while the orchestrator is unreachable
async fn connect_with_retry(client: &OrchestratorClient, compute_client_id: &str) -> Result<()> {
    const MAX_RETRIES: u32 = 10;
    const INITIAL_DELAY_MS: u64 = 500;
    const MAX_DELAY_MS: u64 = 30_000;

    let mut attempt = 0;
    let mut delay_ms = INITIAL_DELAY_MS;

    loop {
        attempt += 1;

        match client.get_compute_client(compute_client_id).await {
            Ok(record) => {
                info!(
                    "Connected as compute client '{}' serving {:?}",
                    record.compute_client_name, record.service_names
                );
                return Ok(());
            }
            Err(e) if e.is_not_found() => {
                return Err(anyhow::anyhow!(
                    "Compute client {} is not registered with the orchestrator",
                    compute_client_id
                ));
            }
            Err(e) => {
                if attempt >= MAX_RETRIES {
                    error!("Failed to reach orchestrator after {} attempts", MAX_RETRIES);
                    return Err(anyhow::Error::new(e).context("Failed to reach orchestrator"));
                }

                warn!(
                    "Failed to reach orchestrator (attempt {}/{}): {}",
                    attempt, MAX_RETRIES, e
                );
                warn!("Retrying in {} ms...", delay_ms);

                tokio::time::sleep(Duration::from_millis(delay_ms)).await;

                // Exponential backoff with cap
                delay_ms = (delay_ms * 2).min(MAX_DELAY_MS);
            }
        }
    }
}
