//! GitLab pipelines API

use async_trait::async_trait;
use reqwest::{Client, Url};
use std::time::Duration;
use stepwatch_core::domain::job::{Credential, PipelineTarget};
use stepwatch_core::dto::gitlab::{CreatePipelineRequest, Pipeline, PipelineVariable};

use crate::error::{ClientError, Result};
use crate::{handle_response, http_client};

const TOKEN_HEADER: &str = "PRIVATE-TOKEN";

/// Parameters of a pipeline start
#[derive(Debug, Clone)]
pub struct StartPipeline {
    pub base_url: String,
    pub project_id: String,
    pub git_ref: String,
    pub variables: Vec<PipelineVariable>,
}

/// Operations Stepwatch needs from a CI system
#[async_trait]
pub trait CiClient: Send + Sync {
    /// Creates a pipeline for a ref
    ///
    /// # Returns
    /// The created pipeline, including its id and web URL
    async fn start_pipeline(&self, req: &StartPipeline, token: &Credential) -> Result<Pipeline>;

    /// Fetches the current state of a pipeline
    async fn get_pipeline(&self, target: &PipelineTarget, token: &Credential) -> Result<Pipeline>;
}

/// HTTP implementation of [`CiClient`] for the GitLab v4 API
///
/// The GitLab instance comes with each call rather than with the client, since
/// every workflow step may point at a different instance.
#[derive(Debug, Clone)]
pub struct GitLabClient {
    client: Client,
}

impl GitLabClient {
    /// Create a new GitLab client whose requests time out after `timeout`
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
        })
    }
}

#[async_trait]
impl CiClient for GitLabClient {
    async fn start_pipeline(&self, req: &StartPipeline, token: &Credential) -> Result<Pipeline> {
        let url = start_pipeline_url(&req.base_url, &req.project_id)?;
        tracing::debug!(project_id = %req.project_id, git_ref = %req.git_ref, "Creating pipeline");

        let response = self
            .client
            .post(url)
            .header(TOKEN_HEADER, token.expose())
            .query(&[("ref", req.git_ref.as_str())])
            .json(&CreatePipelineRequest {
                variables: req.variables.clone(),
            })
            .send()
            .await?;

        handle_response(response).await
    }

    async fn get_pipeline(&self, target: &PipelineTarget, token: &Credential) -> Result<Pipeline> {
        let url = pipeline_url(target)?;

        let response = self
            .client
            .get(url)
            .header(TOKEN_HEADER, token.expose())
            .send()
            .await?;

        handle_response(response).await
    }
}

// =============================================================================
// URL Helpers
// =============================================================================

/// `{base}/api/v4/projects/{project_id}/pipeline`
pub fn start_pipeline_url(base_url: &str, project_id: &str) -> Result<Url> {
    project_url(base_url, project_id, &["pipeline"])
}

/// `{base}/api/v4/projects/{project_id}/pipelines/{pipeline_id}`
pub fn pipeline_url(target: &PipelineTarget) -> Result<Url> {
    project_url(
        &target.base_url,
        &target.project_id,
        &["pipelines", &target.pipeline_id.to_string()],
    )
}

/// Builds a project-scoped API URL
///
/// The project id is pushed as a single path segment, so a namespaced path like
/// `group/app` is percent-encoded the way GitLab expects.
fn project_url(base_url: &str, project_id: &str, tail: &[&str]) -> Result<Url> {
    if project_id.trim().is_empty() {
        return Err(ClientError::InvalidRequest("project id is empty".to_string()));
    }

    let mut url = Url::parse(base_url)
        .map_err(|e| ClientError::InvalidRequest(format!("invalid base URL '{}': {}", base_url, e)))?;

    url.path_segments_mut()
        .map_err(|_| ClientError::InvalidRequest(format!("base URL '{}' cannot be a base", base_url)))?
        .pop_if_empty()
        .extend(["api", "v4", "projects", project_id])
        .extend(tail);

    Ok(url)
}
