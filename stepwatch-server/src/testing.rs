//! Test fixtures and recording fakes for the client traits

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value as JsonValue;
use std::collections::VecDeque;
use std::sync::Mutex;
use stepwatch_client::{CiClient, ChatClient, ClientError, Result, StartPipeline};
use stepwatch_core::domain::job::{Credential, JobRecord, PipelineTarget};
use stepwatch_core::domain::pipeline::PipelineStatus;
use stepwatch_core::dto::gitlab::Pipeline;
use stepwatch_core::dto::slack::{PipelineOutputs, UpdateStepRequest};

/// Fixed instant `secs` seconds after the test epoch
pub fn at(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0)
        .single()
        .expect("valid epoch")
        + chrono::Duration::seconds(secs)
}

pub fn sample_job(pipeline_id: u64) -> JobRecord {
    JobRecord {
        target: PipelineTarget {
            base_url: "https://gitlab.example.com/".to_string(),
            project_id: "42".to_string(),
            pipeline_id,
        },
        credentials: Credential::new("glpat-secret-token"),
        web_url: format!("https://gitlab.example.com/group/app/-/pipelines/{}", pipeline_id),
        display_name: "Deploy".to_string(),
        notify_channel: Some("C0123".to_string()),
        execute_id: format!("exec-{}", pipeline_id),
        created_at: at(0),
    }
}

/// Scripted reply of [`FakeCi::get_pipeline`]
#[derive(Debug, Clone)]
pub enum Reply {
    Status(PipelineStatus),
    /// HTTP error with this status code
    Error(u16),
}

/// CI fake answering status calls from a script
///
/// Once the script runs out every call reports `running`.
#[derive(Debug, Default)]
pub struct FakeCi {
    replies: Mutex<VecDeque<Reply>>,
    start_error: Mutex<Option<u16>>,
    started: Mutex<Vec<StartPipeline>>,
    status_calls: Mutex<usize>,
}

impl FakeCi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scripted(replies: impl IntoIterator<Item = Reply>) -> Self {
        let ci = Self::default();
        ci.replies.lock().unwrap().extend(replies);
        ci
    }

    /// Makes every start call fail with this HTTP status
    pub fn fail_start(&self, status: u16) {
        *self.start_error.lock().unwrap() = Some(status);
    }

    pub fn started(&self) -> Vec<StartPipeline> {
        self.started.lock().unwrap().clone()
    }

    pub fn status_calls(&self) -> usize {
        *self.status_calls.lock().unwrap()
    }
}

#[async_trait]
impl CiClient for FakeCi {
    async fn start_pipeline(&self, req: &StartPipeline, _token: &Credential) -> Result<Pipeline> {
        self.started.lock().unwrap().push(req.clone());
        if let Some(status) = *self.start_error.lock().unwrap() {
            return Err(ClientError::api_error(status, "start rejected".to_string()));
        }

        Ok(Pipeline {
            id: 1001,
            status: PipelineStatus::Created,
            web_url: "https://gitlab.example.com/group/app/-/pipelines/1001".to_string(),
        })
    }

    async fn get_pipeline(&self, target: &PipelineTarget, _token: &Credential) -> Result<Pipeline> {
        *self.status_calls.lock().unwrap() += 1;
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Reply::Status(PipelineStatus::Running));

        match reply {
            Reply::Status(status) => Ok(Pipeline {
                id: target.pipeline_id,
                status,
                web_url: format!("https://gitlab.example.com/-/pipelines/{}", target.pipeline_id),
            }),
            Reply::Error(code) => Err(ClientError::api_error(code, "scripted failure".to_string())),
        }
    }
}

/// Call recorded by [`FakeChat`]
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCall {
    Message { channel: String, text: String },
    Completed { execute_id: String, outputs: PipelineOutputs },
    Failed { execute_id: String, message: String },
    UpdateStep { edit_id: String, input_names: Vec<String> },
    OpenView { trigger_id: String, view: JsonValue },
}

/// Chat fake recording every call
///
/// Errors queued with [`FakeChat::fail_signal`] are returned by the next step
/// signals (`step_completed` / `step_failed`), in order.
#[derive(Debug, Default)]
pub struct FakeChat {
    calls: Mutex<Vec<ChatCall>>,
    signal_errors: Mutex<VecDeque<ClientError>>,
    fail_messages: Mutex<bool>,
}

impl FakeChat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_signal(&self, error: ClientError) {
        self.signal_errors.lock().unwrap().push_back(error);
    }

    pub fn fail_messages(&self) {
        *self.fail_messages.lock().unwrap() = true;
    }

    pub fn calls(&self) -> Vec<ChatCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn completions(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, ChatCall::Completed { .. }))
            .count()
    }

    pub fn failures(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ChatCall::Failed { message, .. } => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn messages(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                ChatCall::Message { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: ChatCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn next_signal_error(&self) -> Option<ClientError> {
        self.signal_errors.lock().unwrap().pop_front()
    }
}

#[async_trait]
impl ChatClient for FakeChat {
    async fn post_message(&self, channel: &str, text: &str) -> Result<()> {
        if *self.fail_messages.lock().unwrap() {
            return Err(ClientError::Rejected("channel_not_found".to_string()));
        }
        self.record(ChatCall::Message {
            channel: channel.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn step_completed(&self, execute_id: &str, outputs: PipelineOutputs) -> Result<()> {
        if let Some(err) = self.next_signal_error() {
            return Err(err);
        }
        self.record(ChatCall::Completed {
            execute_id: execute_id.to_string(),
            outputs,
        });
        Ok(())
    }

    async fn step_failed(&self, execute_id: &str, message: &str) -> Result<()> {
        if let Some(err) = self.next_signal_error() {
            return Err(err);
        }
        self.record(ChatCall::Failed {
            execute_id: execute_id.to_string(),
            message: message.to_string(),
        });
        Ok(())
    }

    async fn update_step(&self, req: UpdateStepRequest) -> Result<()> {
        let mut input_names: Vec<String> = req.inputs.keys().cloned().collect();
        input_names.sort();
        self.record(ChatCall::UpdateStep {
            edit_id: req.workflow_step_edit_id,
            input_names,
        });
        Ok(())
    }

    async fn open_view(&self, trigger_id: &str, view: JsonValue) -> Result<()> {
        self.record(ChatCall::OpenView {
            trigger_id: trigger_id.to_string(),
            view,
        });
        Ok(())
    }
}
