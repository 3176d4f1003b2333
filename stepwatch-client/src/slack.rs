//! Slack Web API

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::fmt;
use std::time::Duration;
use stepwatch_core::dto::slack::{
    OpenViewRequest, PipelineOutputs, PostMessageRequest, SlackResponse, StepCompletedRequest,
    StepError, StepFailedRequest, UpdateStepRequest,
};

use crate::error::{ClientError, Result};
use crate::{handle_response, http_client};

pub const DEFAULT_SLACK_API_URL: &str = "https://slack.com/api";

/// Operations Stepwatch needs from the chat platform
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Posts a plain message to a channel
    async fn post_message(&self, channel: &str, text: &str) -> Result<()>;

    /// Marks a workflow step execution as completed with its outputs
    async fn step_completed(&self, execute_id: &str, outputs: PipelineOutputs) -> Result<()>;

    /// Marks a workflow step execution as failed
    async fn step_failed(&self, execute_id: &str, message: &str) -> Result<()>;

    /// Saves a workflow step's configuration
    async fn update_step(&self, req: UpdateStepRequest) -> Result<()>;

    /// Opens a modal in response to an interaction
    async fn open_view(&self, trigger_id: &str, view: JsonValue) -> Result<()>;
}

/// HTTP implementation of [`ChatClient`]
#[derive(Clone)]
pub struct SlackClient {
    /// Web API base URL (e.g., "https://slack.com/api")
    base_url: String,
    /// Bot token
    token: String,
    /// HTTP client instance
    client: Client,
}

impl SlackClient {
    /// Create a new Slack client
    ///
    /// # Arguments
    /// * `base_url` - Web API base URL, normally [`DEFAULT_SLACK_API_URL`]
    /// * `token` - Bot token (`xoxb-...`)
    /// * `timeout` - Request timeout
    pub fn new(base_url: impl Into<String>, token: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into();
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
            client: http_client(timeout)?,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.base_url, method)
    }

    /// Calls a Web API method with a JSON body
    ///
    /// Slack reports most failures as `200 OK` with `ok: false`, so the body is
    /// always inspected.
    async fn call<B: Serialize + ?Sized>(&self, method: &str, body: &B) -> Result<()> {
        let url = self.method_url(method);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;

        let reply: SlackResponse = handle_response(response).await?;
        if !reply.ok {
            let code = reply.error.unwrap_or_else(|| "unknown_error".to_string());
            tracing::warn!(method, error = %code, "Slack call rejected");
            return Err(ClientError::Rejected(code));
        }

        tracing::debug!(method, "Slack call succeeded");
        Ok(())
    }
}

impl fmt::Debug for SlackClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlackClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ChatClient for SlackClient {
    async fn post_message(&self, channel: &str, text: &str) -> Result<()> {
        self.call(
            "chat.postMessage",
            &PostMessageRequest {
                channel: channel.to_string(),
                text: text.to_string(),
            },
        )
        .await
    }

    async fn step_completed(&self, execute_id: &str, outputs: PipelineOutputs) -> Result<()> {
        self.call(
            "workflows.stepCompleted",
            &StepCompletedRequest {
                workflow_step_execute_id: execute_id.to_string(),
                outputs,
            },
        )
        .await
    }

    async fn step_failed(&self, execute_id: &str, message: &str) -> Result<()> {
        self.call(
            "workflows.stepFailed",
            &StepFailedRequest {
                workflow_step_execute_id: execute_id.to_string(),
                error: StepError {
                    message: message.to_string(),
                },
            },
        )
        .await
    }

    async fn update_step(&self, req: UpdateStepRequest) -> Result<()> {
        self.call("workflows.updateStep", &req).await
    }

    async fn open_view(&self, trigger_id: &str, view: JsonValue) -> Result<()> {
        self.call(
            "views.open",
            &OpenViewRequest {
                trigger_id: trigger_id.to_string(),
                view,
            },
        )
        .await
    }
}
