//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod compute_client;
mod job;
mod service;

pub use compute_client::ComputeClientCommands;
pub use job::JobCommands;
pub use service::ServiceCommands;

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;
use dendro_client::OrchestratorClient;
use serde::de::DeserializeOwned;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Job submission and management
    Job {
        #[command(subcommand)]
        command: JobCommands,
    },
    /// Compute client registration and configuration
    ComputeClient {
        #[command(subcommand)]
        command: ComputeClientCommands,
    },
    /// Service-wide actions
    Service {
        #[command(subcommand)]
        command: ServiceCommands,
    },
    /// Check that the orchestrator is reachable
    Health,
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Job { command } => job::handle_job_command(command, config).await,
        Commands::ComputeClient { command } => {
            compute_client::handle_compute_client_command(command, config).await
        }
        Commands::Service { command } => service::handle_service_command(command, config).await,
        Commands::Health => health(config).await,
    }
}

async fn health(config: &Config) -> Result<()> {
    let client = OrchestratorClient::new(&config.orchestrator_url);
    client
        .health()
        .await
        .with_context(|| format!("Orchestrator at {} is not healthy", config.orchestrator_url))?;
    println!("{} {}", "✓".green(), format!("{} is healthy", config.orchestrator_url).bold());
    Ok(())
}

/// Read and parse a JSON document from a file, or stdin for "-"
pub(crate) fn read_json<T: DeserializeOwned>(path: &str) -> Result<T> {
    let content = if path == "-" {
        std::io::read_to_string(std::io::stdin()).context("Failed to read stdin")?
    } else {
        std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path))?
    };
    serde_json::from_str(&content).with_context(|| format!("Failed to parse JSON from {}", path))
}
