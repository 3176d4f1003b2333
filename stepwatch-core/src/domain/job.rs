//! Job domain types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A pipeline run tracked until it reaches a terminal status
///
/// Created once the start call succeeds and never modified afterwards. The
/// serialized form (see [`JobRecord::fingerprint`]) is what the delay queue
/// stores, so field order here is part of the persisted format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub target: PipelineTarget,
    pub credentials: Credential,
    pub web_url: String,
    pub display_name: String,
    pub notify_channel: Option<String>,
    /// Workflow step execution id used to report completion to Slack
    pub execute_id: String,
    pub created_at: DateTime<Utc>,
}

impl JobRecord {
    /// Queue identity of this record
    pub fn key(&self) -> JobKey {
        JobKey::for_target(&self.target)
    }

    /// Stable serialization of the record
    ///
    /// The same record always produces the same bytes.
    pub fn fingerprint(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decodes a record previously produced by [`JobRecord::fingerprint`]
    pub fn from_fingerprint(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }
}

/// Location of a created pipeline in a GitLab instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineTarget {
    pub base_url: String,
    pub project_id: String,
    pub pipeline_id: u64,
}

impl PipelineTarget {
    /// Base URL without trailing slashes
    pub fn normalized_base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

/// Unique key of a queue entry
///
/// Derived from the created pipeline rather than the whole record, so two
/// identical start requests produce two distinct keys (their pipelines differ)
/// while re-inserting the same pipeline collapses onto one entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobKey(String);

impl JobKey {
    pub fn for_target(target: &PipelineTarget) -> Self {
        Self(format!(
            "{}|{}|{}",
            target.normalized_base_url(),
            target.project_id,
            target.pipeline_id
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for JobKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for JobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// GitLab access token
///
/// Stored with the record because the status check runs long after the request
/// that carried it. Formatting never reveals the value.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Raw token, for building request headers only
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> JobRecord {
        JobRecord {
            target: PipelineTarget {
                base_url: "https://gitlab.example.com/".to_string(),
                project_id: "42".to_string(),
                pipeline_id: 1001,
            },
            credentials: Credential::new("glpat-secret"),
            web_url: "https://gitlab.example.com/group/app/-/pipelines/1001".to_string(),
            display_name: "Deploy".to_string(),
            notify_channel: Some("C123".to_string()),
            execute_id: "Wf-exec-1".to_string(),
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_key_ignores_trailing_slash() {
        let record = sample_record();
        assert_eq!(record.key().as_str(), "https://gitlab.example.com|42|1001");

        let mut other = record.clone();
        other.target.base_url = "https://gitlab.example.com".to_string();
        assert_eq!(record.key(), other.key());
    }

    #[test]
    fn test_key_differs_per_pipeline() {
        let record = sample_record();
        let mut rerun = record.clone();
        rerun.target.pipeline_id = 1002;
        assert_ne!(record.key(), rerun.key());
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let record = sample_record();
        let first = record.fingerprint().unwrap();
        let second = record.clone().fingerprint().unwrap();
        assert_eq!(first, second);

        let decoded = JobRecord::from_fingerprint(&first).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_credential_is_redacted() {
        let record = sample_record();
        let debug = format!("{:?}", record);
        assert!(!debug.contains("glpat-secret"));
        assert_eq!(record.credentials.to_string(), "***");
        assert_eq!(record.credentials.expose(), "glpat-secret");
    }
}
