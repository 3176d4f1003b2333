//! Stepwatch CLI
//!
//! Command-line interface for operating a Stepwatch server: triggering polls,
//! inspecting the delay queue, and checking health.

mod api;
mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;

#[derive(Parser)]
#[command(name = "stepwatch")]
#[command(about = "Stepwatch GitLab pipeline tracker CLI", long_about = None)]
struct Cli {
    /// Server URL
    #[arg(long, env = "STEPWATCH_URL", default_value = "http://localhost:4444")]
    server_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config {
        server_url: cli.server_url,
    };

    handle_command(cli.command, &config).await
}
