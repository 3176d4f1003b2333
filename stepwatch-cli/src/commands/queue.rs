//! Queue command handlers
//!
//! Lists and removes delay queue entries.

use anyhow::Result;
use chrono::Utc;
use clap::Subcommand;
use colored::*;
use stepwatch_core::dto::queue::QueueEntrySummary;

use crate::api::ApiClient;
use crate::config::Config;

/// Queue subcommands
#[derive(Subcommand)]
pub enum QueueCommands {
    /// List queued pipelines
    List,
    /// Stop tracking a pipeline
    Drop {
        /// Job key, as shown by `queue list`
        key: String,
    },
}

/// Handle queue commands
pub async fn handle_queue_command(command: QueueCommands, config: &Config) -> Result<()> {
    let client = ApiClient::new(&config.server_url)?;

    match command {
        QueueCommands::List => list_queue(&client).await,
        QueueCommands::Drop { key } => drop_entry(&client, &key).await,
    }
}

async fn list_queue(client: &ApiClient) -> Result<()> {
    let entries = client.list_queue().await?;

    if entries.is_empty() {
        println!("{}", "No pipelines queued.".yellow());
    } else {
        println!(
            "{}",
            format!("Found {} queued pipeline(s):", entries.len()).bold()
        );
        println!();
        for entry in entries {
            print_entry(&entry);
        }
    }

    Ok(())
}

async fn drop_entry(client: &ApiClient, key: &str) -> Result<()> {
    client.drop_entry(key).await?;
    println!("{} {}", "Dropped".green(), key.bold());
    Ok(())
}

fn print_entry(entry: &QueueEntrySummary) {
    println!("  {} {}", "▸".cyan(), entry.key.bold());

    match &entry.job {
        Some(job) => {
            println!("    Name:         {}", job.display_name);
            println!("    Project:      {}", job.project_id);
            println!("    Pipeline:     {}", job.pipeline_id);
            println!("    Link:         {}", job.web_url.dimmed());
            println!(
                "    Started:      {}",
                job.created_at
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string()
                    .dimmed()
            );
        }
        None => println!("    {}", "Payload could not be decoded".red()),
    }

    let next = entry.not_before.format("%Y-%m-%d %H:%M:%S").to_string();
    if entry.not_before <= Utc::now() {
        println!("    Next check:   {} {}", next.dimmed(), "(due)".yellow());
    } else {
        println!("    Next check:   {}", next.dimmed());
    }
    println!();
}
