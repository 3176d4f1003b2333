//! Operator API DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::job::JobRecord;

/// A queue entry as shown to operators
///
/// Carries no credentials. `job` is `None` when the stored payload could not be
/// decoded, which is exactly the case an operator needs to see.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntrySummary {
    pub key: String,
    pub not_before: DateTime<Utc>,
    pub job: Option<JobSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummary {
    pub display_name: String,
    pub project_id: String,
    pub pipeline_id: u64,
    pub web_url: String,
    pub created_at: DateTime<Utc>,
}

impl From<&JobRecord> for JobSummary {
    fn from(job: &JobRecord) -> Self {
        Self {
            display_name: job.display_name.clone(),
            project_id: job.target.project_id.clone(),
            pipeline_id: job.target.pipeline_id,
            web_url: job.web_url.clone(),
            created_at: job.created_at,
        }
    }
}
