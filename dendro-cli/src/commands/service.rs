//! Service command handlers

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use dendro_client::OrchestratorClient;

use crate::config::Config;

/// Service subcommands
#[derive(Subcommand)]
pub enum ServiceCommands {
    /// Ask every compute client of a service to poll now
    Ping {
        /// Service name
        name: String,
    },
}

/// Handle service commands
pub async fn handle_service_command(command: ServiceCommands, config: &Config) -> Result<()> {
    let client = OrchestratorClient::new(&config.orchestrator_url);

    match command {
        ServiceCommands::Ping { name } => {
            client.ping_compute_clients(config.api_key()?, &name).await?;
            println!("{} Pinged compute clients of {}", "✓".green(), name.cyan());
            Ok(())
        }
    }
}
