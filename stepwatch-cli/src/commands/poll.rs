//! Poll command handler
//!
//! Stands in for the external timer that drives the server's poll cycle.

use anyhow::{Result, bail};
use colored::*;
use tokio::time::{self, Duration};

use crate::api::ApiClient;
use crate::config::Config;

/// Trigger a single poll, or keep polling every `every` seconds
pub async fn handle_poll_command(every: Option<u64>, config: &Config) -> Result<()> {
    let client = ApiClient::new(&config.server_url)?;

    let Some(seconds) = every else {
        client.trigger_poll().await?;
        println!("{}", "Poll triggered.".green());
        return Ok(());
    };

    if seconds == 0 {
        bail!("--every must be at least 1 second");
    }

    println!(
        "{}",
        format!("Polling {} every {}s (Ctrl-C to stop)", config.server_url, seconds).bold()
    );

    let mut interval = time::interval(Duration::from_secs(seconds));
    loop {
        tokio::select! {
            _ = interval.tick() => {
                // A missed cycle is picked up by the next one
                if let Err(e) = client.trigger_poll().await {
                    eprintln!("{} {:#}", "Poll failed:".red(), e);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("{}", "Stopped.".dimmed());
                return Ok(());
            }
        }
    }
}
