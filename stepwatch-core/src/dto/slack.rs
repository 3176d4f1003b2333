//! Slack DTOs
//!
//! Inbound Events API / interactivity payloads for the "run GitLab pipeline"
//! workflow step, and the Web API request bodies sent back.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashMap;

use crate::domain::job::Credential;

/// Callback id of the workflow step registered in the Slack app manifest
pub const RUN_PIPELINE_CALLBACK_ID: &str = "run_gitlab_pipeline";

/// Callback id of the step configuration modal
pub const CONFIGURE_VIEW_CALLBACK_ID: &str = "run_pipeline_gitlab_job";

pub const DEFAULT_DISPLAY_NAME: &str = "Pipeline";
pub const DEFAULT_BASE_URL: &str = "https://gitlab.com/";
pub const DEFAULT_REF: &str = "master";

// =============================================================================
// Inbound payloads
// =============================================================================

/// Top-level payload posted to the events endpoint
///
/// Events API requests arrive as JSON, interactivity requests as a form with a
/// `payload` field holding the same kind of JSON.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlackPayload {
    UrlVerification {
        challenge: String,
    },
    EventCallback {
        event: CallbackEvent,
    },
    WorkflowStepEdit {
        trigger_id: String,
        #[serde(default)]
        callback_id: Option<String>,
        workflow_step: WorkflowStepEdit,
    },
    ViewSubmission {
        view: View,
        workflow_step: WorkflowStepRef,
    },
    #[serde(other)]
    Other,
}

/// Inner event of an `event_callback`
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CallbackEvent {
    WorkflowStepExecute {
        callback_id: String,
        workflow_step: WorkflowStepExecution,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowStepExecution {
    pub workflow_step_execute_id: String,
    #[serde(default)]
    pub inputs: StepInputs,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowStepEdit {
    #[serde(default)]
    pub workflow_step_edit_id: Option<String>,
    #[serde(default)]
    pub inputs: StepInputs,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowStepRef {
    pub workflow_step_edit_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct View {
    #[serde(default)]
    pub callback_id: Option<String>,
    pub state: ViewState,
}

/// Submitted modal state: block id → action id → element state
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ViewState {
    #[serde(default)]
    pub values: HashMap<String, HashMap<String, JsonValue>>,
}

impl ViewState {
    /// Element state of a block whose action id equals its block id
    pub fn element(&self, block_id: &str) -> Option<&JsonValue> {
        self.values.get(block_id).and_then(|b| b.get(block_id))
    }
}

// =============================================================================
// Step inputs
// =============================================================================

/// Saved inputs of a workflow step, keyed by input name
pub type StepInputs = HashMap<String, StepInput>;

/// One saved input
///
/// Stepwatch saves the raw modal element state as the value, so `value` is
/// usually an object such as `{"type": "plain_text_input", "value": "..."}` or
/// `{"type": "conversations_select", "selected_conversation": "C123"}`. Plain
/// string values are accepted as well.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepInput {
    #[serde(default)]
    pub value: JsonValue,
}

impl StepInput {
    pub fn new(value: JsonValue) -> Self {
        Self { value }
    }

    /// Text of a plain text input
    pub fn text(&self) -> Option<&str> {
        match &self.value {
            JsonValue::String(s) => Some(s),
            JsonValue::Object(map) => map.get("value").and_then(JsonValue::as_str),
            _ => None,
        }
    }

    /// Channel picked in a conversations select
    pub fn conversation(&self) -> Option<&str> {
        match &self.value {
            JsonValue::Object(map) => map
                .get("selected_conversation")
                .and_then(JsonValue::as_str)
                .filter(|c| !c.is_empty()),
            _ => None,
        }
    }
}

/// Typed view of the "run GitLab pipeline" step inputs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineInputs {
    pub display_name: String,
    pub base_url: String,
    pub project_id: String,
    pub personal_token: Credential,
    pub git_ref: String,
    pub variables: String,
    pub announcement: Option<String>,
}

impl PipelineInputs {
    /// Reads the step inputs, falling back to the defaults the configuration
    /// modal shows for missing values
    pub fn from_step_inputs(inputs: &StepInputs) -> Self {
        let text = |name: &str| {
            inputs
                .get(name)
                .and_then(StepInput::text)
                .map(str::to_string)
        };

        Self {
            display_name: text("display_name").unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_string()),
            base_url: text("baseurl").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            project_id: text("project_id").unwrap_or_default(),
            personal_token: Credential::new(text("personal_token").unwrap_or_default()),
            git_ref: text("ref").unwrap_or_else(|| DEFAULT_REF.to_string()),
            variables: text("variables").unwrap_or_default(),
            announcement: inputs
                .get("announcement")
                .and_then(StepInput::conversation)
                .map(str::to_string),
        }
    }
}

// =============================================================================
// Web API requests
// =============================================================================

/// Generic Web API response envelope
#[derive(Debug, Clone, Deserialize)]
pub struct SlackResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// `chat.postMessage`
#[derive(Debug, Clone, Serialize)]
pub struct PostMessageRequest {
    pub channel: String,
    pub text: String,
}

/// `workflows.stepCompleted`
#[derive(Debug, Clone, Serialize)]
pub struct StepCompletedRequest {
    pub workflow_step_execute_id: String,
    pub outputs: PipelineOutputs,
}

/// Outputs the step declares to later workflow steps
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineOutputs {
    pub pipeline_id: u64,
    pub pipeline_link: String,
}

/// `workflows.stepFailed`
#[derive(Debug, Clone, Serialize)]
pub struct StepFailedRequest {
    pub workflow_step_execute_id: String,
    pub error: StepError,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepError {
    pub message: String,
}

/// `workflows.updateStep`
#[derive(Debug, Clone, Serialize)]
pub struct UpdateStepRequest {
    pub workflow_step_edit_id: String,
    pub inputs: StepInputs,
    pub outputs: Vec<OutputDeclaration>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputDeclaration {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub label: String,
}

/// `views.open`
#[derive(Debug, Clone, Serialize)]
pub struct OpenViewRequest {
    pub trigger_id: String,
    pub view: JsonValue,
}
