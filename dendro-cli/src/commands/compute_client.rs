//! Compute client command handlers

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use dendro_client::OrchestratorClient;
use dendro_core::dto::compute_client::{RegisterComputeClientRequest, SetComputeClientInfoRequest};

use super::read_json;
use crate::config::Config;
use crate::display::print_compute_client;

/// Compute client subcommands
#[derive(Subcommand)]
pub enum ComputeClientCommands {
    /// Register a compute client described by a JSON file ("-" for stdin)
    Register {
        /// Path to a registration document
        file: String,
    },
    /// Show a compute client
    Show {
        /// Compute client ID
        id: String,
    },
    /// Update a compute client from a JSON file of changed fields
    Configure {
        /// Compute client ID
        id: String,

        /// Path to an update document
        file: String,
    },
    /// Delete a compute client
    Delete {
        /// Compute client ID
        id: String,
    },
}

/// Handle compute client commands
pub async fn handle_compute_client_command(
    command: ComputeClientCommands,
    config: &Config,
) -> Result<()> {
    let client = OrchestratorClient::new(&config.orchestrator_url);

    match command {
        ComputeClientCommands::Register { file } => {
            let req: RegisterComputeClientRequest = read_json(&file)?;
            register(&client, config.api_key()?, req).await
        }
        ComputeClientCommands::Show { id } => {
            let compute_client = client.get_compute_client(&id).await?;
            print_compute_client(&compute_client);
            Ok(())
        }
        ComputeClientCommands::Configure { id, file } => {
            let req: SetComputeClientInfoRequest = read_json(&file)?;
            client.set_compute_client_info(config.api_key()?, &id, &req).await?;
            println!("{} Compute client {} updated", "✓".green(), id.cyan());
            Ok(())
        }
        ComputeClientCommands::Delete { id } => {
            client.delete_compute_client(config.api_key()?, &id).await?;
            println!("{} Compute client {} deleted", "✓".green(), id.cyan());
            Ok(())
        }
    }
}

async fn register(
    client: &OrchestratorClient,
    api_key: &str,
    req: RegisterComputeClientRequest,
) -> Result<()> {
    let registered = client.register_compute_client(api_key, &req).await?;

    println!("{} Compute client '{}' registered", "✓".green(), req.compute_client_name.bold());
    println!("  ID:          {}", registered.compute_client_id.cyan());
    println!("  Private key: {}", registered.compute_client_private_key);
    println!();
    println!("{}", "The private key is shown only once. Start the runner with:".yellow());
    println!("  DENDRO_COMPUTE_CLIENT_ID={}", registered.compute_client_id);
    println!("  DENDRO_COMPUTE_CLIENT_PRIVATE_KEY={}", registered.compute_client_private_key);

    Ok(())
}
