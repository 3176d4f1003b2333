//! API client module
//!
//! HTTP client for the Stepwatch server's poll, health and queue endpoints.

use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;
use stepwatch_core::dto::queue::QueueEntrySummary;

/// HTTP client for the Stepwatch server
pub struct ApiClient {
    base_url: String,
    client: Client,
}

impl ApiClient {
    /// Create a new API client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the server
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Run one poll cycle on the server
    pub async fn trigger_poll(&self) -> Result<()> {
        let url = format!("{}/poll", self.base_url);
        let response = self
            .client
            .post(&url)
            .send()
            .await
            .context("Failed to send poll request")?;

        Self::check_status(response).await.map(|_| ())
    }

    /// Check server health
    ///
    /// # Returns
    /// The response body of a healthy server
    pub async fn health(&self) -> Result<String> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send health request")?;

        let response = Self::check_status(response).await?;
        response.text().await.context("Failed to read health response")
    }

    /// List queued pipelines
    pub async fn list_queue(&self) -> Result<Vec<QueueEntrySummary>> {
        let url = format!("{}/queue", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send list queue request")?;

        Self::check_status(response)
            .await?
            .json()
            .await
            .context("Failed to parse response JSON")
    }

    /// Remove a queue entry
    ///
    /// # Arguments
    /// * `key` - The entry's job key, as shown by `queue list`
    pub async fn drop_entry(&self, key: &str) -> Result<()> {
        let url = entry_url(&self.base_url, key);
        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .context("Failed to send drop request")?;

        Self::check_status(response).await.map(|_| ())
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Request failed with status {}: {}", status, error_text);
        }
        Ok(response)
    }
}

/// URL of a queue entry; keys contain `/`, `:` and `|`, so the whole key is
/// encoded as one segment
fn entry_url(base_url: &str, key: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(key.as_bytes()).collect();
    format!("{}/queue/{}", base_url, encoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_url_encodes_key() {
        assert_eq!(
            entry_url("http://localhost:4444", "https://gitlab.com|group/app|12"),
            "http://localhost:4444/queue/https%3A%2F%2Fgitlab.com%7Cgroup%2Fapp%7C12"
        );
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = ApiClient::new("http://localhost:4444/").unwrap();
        assert_eq!(client.base_url, "http://localhost:4444");
    }
}
