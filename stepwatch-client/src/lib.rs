//! Stepwatch HTTP Clients
//!
//! Type-safe clients for the two external systems Stepwatch talks to:
//! - [`GitLabClient`]: starts pipelines and reads their status
//! - [`SlackClient`]: workflow step signalling and channel messages
//!
//! Both are exposed behind traits ([`CiClient`], [`ChatClient`]) so the server
//! can be exercised against fakes.
//!
//! # Example
//!
//! ```no_run
//! use stepwatch_client::{CiClient, GitLabClient, StartPipeline};
//! use stepwatch_core::domain::job::Credential;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let gitlab = GitLabClient::new(Duration::from_secs(10))?;
//!
//!     let pipeline = gitlab
//!         .start_pipeline(
//!             &StartPipeline {
//!                 base_url: "https://gitlab.com/".to_string(),
//!                 project_id: "42".to_string(),
//!                 git_ref: "main".to_string(),
//!                 variables: vec![],
//!             },
//!             &Credential::new("glpat-..."),
//!         )
//!         .await?;
//!
//!     println!("Started pipeline {} ({})", pipeline.id, pipeline.web_url);
//!     Ok(())
//! }
//! ```

pub mod error;
mod gitlab;
mod slack;

// Re-export commonly used types
pub use error::{ClientError, Result};
pub use gitlab::{CiClient, GitLabClient, StartPipeline, pipeline_url, start_pipeline_url};
pub use slack::{ChatClient, DEFAULT_SLACK_API_URL, SlackClient};

use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Builds a reqwest client with a request timeout
///
/// Every outbound call runs inside a bounded worker pool, so a call that never
/// returns would permanently occupy a worker.
pub fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(ClientError::RequestFailed)
}

// =============================================================================
// Response Handlers
// =============================================================================

/// Handle an API response and deserialize JSON
///
/// This checks the status code and returns an appropriate error if the request
/// failed, or deserializes the response body if successful.
async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();

    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(ClientError::api_error(status.as_u16(), error_text));
    }

    response
        .json()
        .await
        .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
}
