//! Health command handler

use anyhow::Result;
use colored::*;

use crate::api::ApiClient;
use crate::config::Config;

pub async fn handle_health_command(config: &Config) -> Result<()> {
    let client = ApiClient::new(&config.server_url)?;

    match client.health().await {
        Ok(body) => {
            println!("{} {} ({})", "✓".green(), config.server_url.bold(), body.trim());
            Ok(())
        }
        Err(e) => {
            println!("{} {}", "✗".red(), config.server_url.bold());
            Err(e)
        }
    }
}
