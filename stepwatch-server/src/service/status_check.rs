//! Status Check
//!
//! Checks one queued pipeline against GitLab and, once it has finished, tells
//! Slack and drops the entry from the delay queue.

use async_trait::async_trait;
use std::sync::Arc;
use stepwatch_client::{CiClient, ChatClient};
use stepwatch_core::domain::job::JobRecord;
use stepwatch_core::domain::pipeline::{PipelineStatus, StatusOutcome};
use stepwatch_core::dto::slack::PipelineOutputs;
use tracing::{debug, error, info, warn};

use crate::queue::{DelayQueue, QueueEntry};
use crate::scheduler::CheckHandler;

/// Result of a single check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Pipeline still running; entry stays queued
    Pending(PipelineStatus),
    /// Pipeline succeeded and the step was completed
    Completed,
    /// Pipeline failed and the step was marked failed
    Failed(PipelineStatus),
    /// Status call failed; retried next cycle
    Transient,
    /// Stored payload could not be decoded; left for an operator
    Undecodable,
    /// Pipeline finished but Slack could not be told; retried next cycle
    SignalRetry,
}

pub struct StatusChecker {
    queue: Arc<dyn DelayQueue>,
    ci: Arc<dyn CiClient>,
    chat: Arc<dyn ChatClient>,
}

impl StatusChecker {
    pub fn new(
        queue: Arc<dyn DelayQueue>,
        ci: Arc<dyn CiClient>,
        chat: Arc<dyn ChatClient>,
    ) -> Self {
        Self { queue, ci, chat }
    }

    /// Checks one entry
    pub async fn check(&self, entry: &QueueEntry) -> CheckOutcome {
        let job = match entry.decode() {
            Ok(job) => job,
            Err(e) => {
                error!(job_key = %entry.key, "Queued payload cannot be decoded: {}", e);
                return CheckOutcome::Undecodable;
            }
        };

        let pipeline = match self.ci.get_pipeline(&job.target, &job.credentials).await {
            Ok(pipeline) => pipeline,
            Err(e) => {
                warn!(job_key = %entry.key, "Status check failed, retrying next cycle: {}", e);
                return CheckOutcome::Transient;
            }
        };

        let status = pipeline.status;
        match status.outcome() {
            StatusOutcome::Pending => {
                debug!(job_key = %entry.key, status = %status, "Pipeline still running");
                CheckOutcome::Pending(status)
            }
            StatusOutcome::Succeeded | StatusOutcome::Failed => {
                self.finish(entry, &job, &status).await
            }
        }
    }

    /// Reports a terminal status and removes the entry
    async fn finish(
        &self,
        entry: &QueueEntry,
        job: &JobRecord,
        status: &PipelineStatus,
    ) -> CheckOutcome {
        let succeeded = status.outcome() == StatusOutcome::Succeeded;

        let signal = if succeeded {
            self.chat
                .step_completed(
                    &job.execute_id,
                    PipelineOutputs {
                        pipeline_id: job.target.pipeline_id,
                        pipeline_link: job.web_url.clone(),
                    },
                )
                .await
        } else {
            self.chat
                .step_failed(
                    &job.execute_id,
                    &format!("Pipeline {} finished with status {}", job.display_name, status),
                )
                .await
        };

        if let Err(e) = signal {
            if e.is_retryable() {
                warn!(job_key = %entry.key, "Could not signal step, retrying next cycle: {}", e);
                return CheckOutcome::SignalRetry;
            }
            error!(
                job_key = %entry.key,
                execute_id = %job.execute_id,
                "Slack rejected step signal, dropping entry: {}", e
            );
        }

        // Announced once, after the signal is settled
        if let Some(channel) = &job.notify_channel {
            let text = if succeeded {
                format!("Pipeline *{}* finished successfully", job.display_name)
            } else {
                format!("Pipeline *{}* failed ({})", job.display_name, status)
            };
            if let Err(e) = self.chat.post_message(channel, &text).await {
                warn!(job_key = %entry.key, channel = %channel, "Failed to post announcement: {}", e);
            }
        }

        match self.queue.remove(&entry.key).await {
            Ok(true) => info!(job_key = %entry.key, status = %status, "Pipeline finished"),
            Ok(false) => debug!(job_key = %entry.key, "Entry already removed"),
            Err(e) => error!(job_key = %entry.key, "Failed to remove finished entry: {}", e),
        }

        if succeeded {
            CheckOutcome::Completed
        } else {
            CheckOutcome::Failed(status.clone())
        }
    }
}

#[async_trait]
impl CheckHandler for StatusChecker {
    async fn handle(&self, entry: QueueEntry) {
        self.check(&entry).await;
    }
}
