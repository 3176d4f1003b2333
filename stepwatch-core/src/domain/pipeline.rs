//! Pipeline domain types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a GitLab pipeline as reported by the pipelines API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PipelineStatus {
    Created,
    WaitingForResource,
    Preparing,
    Pending,
    Running,
    Manual,
    Scheduled,
    Success,
    Failed,
    Canceled,
    Skipped,
    /// A status string this version does not know about
    Unknown(String),
}

/// What a status means for the tracked run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOutcome {
    /// The pipeline may still change; check again later
    Pending,
    Succeeded,
    Failed,
}

impl PipelineStatus {
    pub fn as_str(&self) -> &str {
        match self {
            PipelineStatus::Created => "created",
            PipelineStatus::WaitingForResource => "waiting_for_resource",
            PipelineStatus::Preparing => "preparing",
            PipelineStatus::Pending => "pending",
            PipelineStatus::Running => "running",
            PipelineStatus::Manual => "manual",
            PipelineStatus::Scheduled => "scheduled",
            PipelineStatus::Success => "success",
            PipelineStatus::Failed => "failed",
            PipelineStatus::Canceled => "canceled",
            PipelineStatus::Skipped => "skipped",
            PipelineStatus::Unknown(s) => s,
        }
    }

    /// Classifies the status
    ///
    /// Unknown statuses are treated as non-terminal so a new GitLab status can
    /// never cause a run to be dropped.
    pub fn outcome(&self) -> StatusOutcome {
        match self {
            PipelineStatus::Success => StatusOutcome::Succeeded,
            PipelineStatus::Failed | PipelineStatus::Canceled | PipelineStatus::Skipped => {
                StatusOutcome::Failed
            }
            _ => StatusOutcome::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.outcome() != StatusOutcome::Pending
    }
}

impl From<String> for PipelineStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "created" => PipelineStatus::Created,
            "waiting_for_resource" => PipelineStatus::WaitingForResource,
            "preparing" => PipelineStatus::Preparing,
            "pending" => PipelineStatus::Pending,
            "running" => PipelineStatus::Running,
            "manual" => PipelineStatus::Manual,
            "scheduled" => PipelineStatus::Scheduled,
            "success" => PipelineStatus::Success,
            "failed" => PipelineStatus::Failed,
            "canceled" => PipelineStatus::Canceled,
            "skipped" => PipelineStatus::Skipped,
            _ => PipelineStatus::Unknown(value),
        }
    }
}

impl From<PipelineStatus> for String {
    fn from(status: PipelineStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_classification() {
        assert_eq!(PipelineStatus::Success.outcome(), StatusOutcome::Succeeded);
        assert_eq!(PipelineStatus::Failed.outcome(), StatusOutcome::Failed);
        assert_eq!(PipelineStatus::Canceled.outcome(), StatusOutcome::Failed);
        assert_eq!(PipelineStatus::Skipped.outcome(), StatusOutcome::Failed);

        for status in [
            PipelineStatus::Created,
            PipelineStatus::WaitingForResource,
            PipelineStatus::Preparing,
            PipelineStatus::Pending,
            PipelineStatus::Running,
            PipelineStatus::Manual,
            PipelineStatus::Scheduled,
        ] {
            assert!(!status.is_terminal(), "{} should not be terminal", status);
        }
    }

    #[test]
    fn test_unknown_status_is_not_terminal() {
        let status: PipelineStatus = serde_json::from_str("\"blocked_by_policy\"").unwrap();
        assert_eq!(
            status,
            PipelineStatus::Unknown("blocked_by_policy".to_string())
        );
        assert_eq!(status.outcome(), StatusOutcome::Pending);
    }

    #[test]
    fn test_status_wire_format() {
        let status: PipelineStatus = serde_json::from_str("\"waiting_for_resource\"").unwrap();
        assert_eq!(status, PipelineStatus::WaitingForResource);
        assert_eq!(
            serde_json::to_string(&PipelineStatus::Success).unwrap(),
            "\"success\""
        );
    }
}
