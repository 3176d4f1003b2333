//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod health;
mod poll;
mod queue;

pub use queue::QueueCommands;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Trigger a poll cycle on the server
    Poll {
        /// Keep polling with this many seconds between cycles
        #[arg(long)]
        every: Option<u64>,
    },
    /// Delay queue inspection
    Queue {
        #[command(subcommand)]
        command: QueueCommands,
    },
    /// Check server health
    Health,
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Poll { every } => poll::handle_poll_command(every, config).await,
        Commands::Queue { command } => queue::handle_queue_command(command, config).await,
        Commands::Health => health::handle_health_command(config).await,
    }
}
