//! Ingress
//!
//! Starts a pipeline for a workflow step execution and puts it on the delay
//! queue. A step whose pipeline could not be started or tracked is failed right
//! away, and nothing is left behind in the queue.

use chrono::Utc;
use std::sync::Arc;
use stepwatch_client::{CiClient, ChatClient, ClientError, StartPipeline};
use stepwatch_core::domain::job::{JobKey, JobRecord, PipelineTarget};
use stepwatch_core::dto::slack::PipelineInputs;
use stepwatch_core::variables::{VariablesError, parse_variables};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::queue::{DelayQueue, QueueEntry};

#[derive(Debug, Error)]
pub enum StartError {
    #[error("no GitLab project configured")]
    MissingProject,

    #[error("no GitLab access token configured")]
    MissingToken,

    #[error("invalid pipeline variables: {0}")]
    Variables(#[from] VariablesError),

    #[error("GitLab did not start the pipeline: {0}")]
    Ci(#[from] ClientError),
}

/// A request to run a pipeline for one workflow step execution
#[derive(Debug, Clone)]
pub struct JobSpec {
    pub execute_id: String,
    pub inputs: PipelineInputs,
}

/// What [`IngressService::launch`] did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// Pipeline started and queued for status checks
    Enqueued(JobKey),
    /// Pipeline was not started; the step was failed
    StartFailed,
    /// Pipeline started but could not be queued; the step was failed
    Untracked,
}

pub struct IngressService {
    queue: Arc<dyn DelayQueue>,
    ci: Arc<dyn CiClient>,
    chat: Arc<dyn ChatClient>,
}

impl IngressService {
    pub fn new(
        queue: Arc<dyn DelayQueue>,
        ci: Arc<dyn CiClient>,
        chat: Arc<dyn ChatClient>,
    ) -> Self {
        Self { queue, ci, chat }
    }

    /// Starts the pipeline described by `spec`
    ///
    /// # Returns
    /// The job record to enqueue. Nothing has been queued yet.
    pub async fn start(&self, spec: &JobSpec) -> Result<JobRecord, StartError> {
        let inputs = &spec.inputs;

        if inputs.project_id.trim().is_empty() {
            return Err(StartError::MissingProject);
        }
        if inputs.personal_token.is_empty() {
            return Err(StartError::MissingToken);
        }

        let request = StartPipeline {
            base_url: inputs.base_url.clone(),
            project_id: inputs.project_id.trim().to_string(),
            git_ref: inputs.git_ref.clone(),
            variables: parse_variables(&inputs.variables)?,
        };

        let pipeline = self
            .ci
            .start_pipeline(&request, &inputs.personal_token)
            .await?;

        Ok(JobRecord {
            target: PipelineTarget {
                base_url: request.base_url,
                project_id: request.project_id,
                pipeline_id: pipeline.id,
            },
            credentials: inputs.personal_token.clone(),
            web_url: pipeline.web_url,
            display_name: inputs.display_name.clone(),
            notify_channel: inputs.announcement.clone(),
            execute_id: spec.execute_id.clone(),
            created_at: Utc::now(),
        })
    }

    /// Starts the pipeline, queues it, and announces it
    pub async fn launch(&self, spec: JobSpec) -> LaunchOutcome {
        let job = match self.start(&spec).await {
            Ok(job) => job,
            Err(e) => {
                warn!(execute_id = %spec.execute_id, "Pipeline start failed: {}", e);
                self.fail_step(&spec.execute_id, &e.to_string()).await;
                return LaunchOutcome::StartFailed;
            }
        };

        let key = job.key();
        let queued = match QueueEntry::for_job(&job, Utc::now()) {
            Ok(entry) => self.queue.insert(&entry).await,
            Err(e) => Err(e),
        };

        if let Err(e) = queued {
            error!(job_key = %key, "Pipeline started but could not be queued: {}", e);
            let message = format!(
                "Pipeline {} started but could not be tracked: {}",
                job.display_name, job.web_url
            );
            self.fail_step(&job.execute_id, &message).await;
            return LaunchOutcome::Untracked;
        }

        info!(job_key = %key, web_url = %job.web_url, "Pipeline started");

        if let Some(channel) = &job.notify_channel {
            let text = format!(
                "Running pipeline *{}*. Click <{}|here> for more details",
                job.display_name, job.web_url
            );
            if let Err(e) = self.chat.post_message(channel, &text).await {
                warn!(job_key = %key, channel = %channel, "Failed to post announcement: {}", e);
            }
        }

        LaunchOutcome::Enqueued(key)
    }

    async fn fail_step(&self, execute_id: &str, message: &str) {
        if let Err(e) = self.chat.step_failed(execute_id, message).await {
            error!(execute_id, "Failed to report step failure: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{MemoryDelayQueue, QueueError};
    use crate::testing::{ChatCall, FakeChat, FakeCi};
    use async_trait::async_trait;
    use chrono::DateTime;
    use stepwatch_core::domain::job::Credential;
    use stepwatch_core::dto::gitlab::PipelineVariable;

    fn spec() -> JobSpec {
        JobSpec {
            execute_id: "exec-1".to_string(),
            inputs: PipelineInputs {
                display_name: "Deploy".to_string(),
                base_url: "https://gitlab.example.com/".to_string(),
                project_id: "42".to_string(),
                personal_token: Credential::new("glpat-secret"),
                git_ref: "main".to_string(),
                variables: "ENV=prod:DRY_RUN=false".to_string(),
                announcement: Some("C0123".to_string()),
            },
        }
    }

    fn service(
        queue: Arc<dyn DelayQueue>,
    ) -> (IngressService, Arc<FakeCi>, Arc<FakeChat>) {
        let ci = Arc::new(FakeCi::new());
        let chat = Arc::new(FakeChat::new());
        let service = IngressService::new(queue, ci.clone(), chat.clone());
        (service, ci, chat)
    }

    /// Queue whose store is always down
    struct DownQueue;

    #[async_trait]
    impl DelayQueue for DownQueue {
        async fn insert(&self, _entry: &QueueEntry) -> Result<(), QueueError> {
            Err(QueueError::Unavailable(sqlx::Error::PoolTimedOut))
        }

        async fn claim_due(
            &self,
            _now: DateTime<Utc>,
            _claimed_until: DateTime<Utc>,
        ) -> Result<Vec<QueueEntry>, QueueError> {
            Err(QueueError::Unavailable(sqlx::Error::PoolTimedOut))
        }

        async fn remove(&self, _key: &JobKey) -> Result<bool, QueueError> {
            Err(QueueError::Unavailable(sqlx::Error::PoolTimedOut))
        }

        async fn list(&self) -> Result<Vec<QueueEntry>, QueueError> {
            Err(QueueError::Unavailable(sqlx::Error::PoolTimedOut))
        }

        async fn ping(&self) -> Result<(), QueueError> {
            Err(QueueError::Unavailable(sqlx::Error::PoolTimedOut))
        }
    }

    #[tokio::test]
    async fn test_start_builds_job_record() {
        let (service, ci, _) = service(Arc::new(MemoryDelayQueue::new()));

        let job = service.start(&spec()).await.unwrap();

        assert_eq!(job.target.pipeline_id, 1001);
        assert_eq!(job.target.project_id, "42");
        assert_eq!(job.execute_id, "exec-1");
        assert_eq!(job.notify_channel.as_deref(), Some("C0123"));

        let started = ci.started();
        assert_eq!(started.len(), 1);
        assert_eq!(started[0].git_ref, "main");
        assert_eq!(
            started[0].variables,
            vec![
                PipelineVariable {
                    key: "ENV".to_string(),
                    value: "prod".to_string()
                },
                PipelineVariable {
                    key: "DRY_RUN".to_string(),
                    value: "false".to_string()
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_start_rejects_missing_inputs() {
        let (service, ci, _) = service(Arc::new(MemoryDelayQueue::new()));

        let mut no_project = spec();
        no_project.inputs.project_id = " ".to_string();
        assert!(matches!(
            service.start(&no_project).await,
            Err(StartError::MissingProject)
        ));

        let mut no_token = spec();
        no_token.inputs.personal_token = Credential::new("");
        assert!(matches!(
            service.start(&no_token).await,
            Err(StartError::MissingToken)
        ));

        let mut bad_variables = spec();
        bad_variables.inputs.variables = "ENV".to_string();
        assert!(matches!(
            service.start(&bad_variables).await,
            Err(StartError::Variables(_))
        ));

        assert!(ci.started().is_empty());
    }

    #[tokio::test]
    async fn test_launch_enqueues_and_announces() {
        let queue = Arc::new(MemoryDelayQueue::new());
        let (service, _, chat) = service(queue.clone());

        let outcome = service.launch(spec()).await;

        let entries = queue.list().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(outcome, LaunchOutcome::Enqueued(entries[0].key.clone()));
        assert!(entries[0].not_before <= Utc::now());
        assert_eq!(
            chat.messages(),
            vec![
                "Running pipeline *Deploy*. Click \
                 <https://gitlab.example.com/group/app/-/pipelines/1001|here> for more details"
            ]
        );
    }

    #[tokio::test]
    async fn test_launch_start_failure_enqueues_nothing() {
        let queue = Arc::new(MemoryDelayQueue::new());
        let (service, ci, chat) = service(queue.clone());
        ci.fail_start(400);

        assert_eq!(service.launch(spec()).await, LaunchOutcome::StartFailed);
        assert!(queue.list().await.unwrap().is_empty());
        assert!(matches!(
            chat.calls().as_slice(),
            [ChatCall::Failed { execute_id, .. }] if execute_id == "exec-1"
        ));
    }

    #[tokio::test]
    async fn test_launch_insert_failure_fails_step() {
        let (service, ci, chat) = service(Arc::new(DownQueue));

        assert_eq!(service.launch(spec()).await, LaunchOutcome::Untracked);
        assert_eq!(ci.started().len(), 1);

        let failures = chat.failures();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].contains("started but could not be tracked"));
        assert!(chat.messages().is_empty());
    }
}
