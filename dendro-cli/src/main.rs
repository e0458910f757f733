//! Dendro CLI
//!
//! Command-line interface for submitting and managing jobs on a Dendro
//! orchestrator.

mod commands;
mod config;
mod display;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;

#[derive(Parser)]
#[command(name = "dendro")]
#[command(about = "Dendro compute job CLI", long_about = None)]
struct Cli {
    /// Orchestrator URL
    #[arg(
        long,
        env = "DENDRO_ORCHESTRATOR_URL",
        default_value = "http://localhost:8080"
    )]
    orchestrator_url: String,

    /// User API key
    #[arg(long, env = "DENDRO_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config {
        orchestrator_url: cli.orchestrator_url,
        api_key: cli.api_key,
    };

    handle_command(cli.command, &config).await
}
