//! Delay Queue
//!
//! Score-ordered set of tracked pipeline runs. The score (`not_before`) is the
//! earliest time an entry may be checked again.
//!
//! The queue is the only shared mutable state in the server. Everything that
//! keeps two pollers from checking the same pipeline at once lives in
//! [`DelayQueue::claim_due`], which returns due entries and pushes their score
//! forward in one atomic step.

mod memory;
mod postgres;

pub use memory::MemoryDelayQueue;
pub use postgres::PgDelayQueue;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use stepwatch_core::domain::job::{JobKey, JobRecord};
use stepwatch_core::dto::queue::{JobSummary, QueueEntrySummary};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    /// The store could not be reached; the operation may be retried
    #[error("queue store unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),

    /// A job record could not be serialized
    #[error("failed to encode job record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// One queued pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub key: JobKey,
    /// Serialized [`JobRecord`]
    pub payload: String,
    pub not_before: DateTime<Utc>,
}

impl QueueEntry {
    /// Builds the entry for a job, due at `not_before`
    pub fn for_job(job: &JobRecord, not_before: DateTime<Utc>) -> Result<Self, QueueError> {
        Ok(Self {
            key: job.key(),
            payload: job.fingerprint()?,
            not_before,
        })
    }

    /// Decodes the stored job record
    pub fn decode(&self) -> Result<JobRecord, serde_json::Error> {
        JobRecord::from_fingerprint(&self.payload)
    }

    /// Operator view of the entry, without credentials
    pub fn summary(&self) -> QueueEntrySummary {
        QueueEntrySummary {
            key: self.key.to_string(),
            not_before: self.not_before,
            job: self.decode().ok().as_ref().map(JobSummary::from),
        }
    }
}

/// Storage contract of the delay queue
#[async_trait]
pub trait DelayQueue: Send + Sync {
    /// Adds an entry, or re-scores and replaces the entry with the same key
    async fn insert(&self, entry: &QueueEntry) -> Result<(), QueueError>;

    /// Claims every entry due at `now`
    ///
    /// Each returned entry has already been re-scored to `claimed_until`, within
    /// the same atomic operation that selected it. Two concurrent calls never
    /// return the same entry.
    async fn claim_due(
        &self,
        now: DateTime<Utc>,
        claimed_until: DateTime<Utc>,
    ) -> Result<Vec<QueueEntry>, QueueError>;

    /// Removes an entry
    ///
    /// Returns whether an entry was removed. Removing a missing key is not an
    /// error.
    async fn remove(&self, key: &JobKey) -> Result<bool, QueueError>;

    /// All entries, earliest score first
    async fn list(&self) -> Result<Vec<QueueEntry>, QueueError>;

    /// Checks that the store is reachable
    async fn ping(&self) -> Result<(), QueueError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_job;

    #[test]
    fn test_entry_for_job() {
        let job = sample_job(7);
        let now = Utc::now();
        let entry = QueueEntry::for_job(&job, now).unwrap();

        assert_eq!(entry.key, job.key());
        assert_eq!(entry.not_before, now);
        assert_eq!(entry.decode().unwrap(), job);
    }

    #[test]
    fn test_summary_hides_credentials() {
        let job = sample_job(7);
        let entry = QueueEntry::for_job(&job, Utc::now()).unwrap();

        let summary = entry.summary();
        let json = serde_json::to_string(&summary).unwrap();
        assert!(!json.contains(job.credentials.expose()));
        assert_eq!(summary.job.unwrap().pipeline_id, 7);
    }

    #[test]
    fn test_summary_of_undecodable_entry() {
        let entry = QueueEntry {
            key: JobKey::from("broken".to_string()),
            payload: "{not json".to_string(),
            not_before: Utc::now(),
        };
        assert!(entry.summary().job.is_none());
    }
}
