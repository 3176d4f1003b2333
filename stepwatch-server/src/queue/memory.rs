//! In-process delay queue
//!
//! Entries live in a map behind a mutex; every operation is one critical
//! section, which is what makes `claim_due` atomic. Nothing survives a restart,
//! so this backend is meant for development and tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use stepwatch_core::domain::job::JobKey;

use super::{DelayQueue, QueueEntry, QueueError};

#[derive(Debug, Default)]
pub struct MemoryDelayQueue {
    entries: Mutex<HashMap<JobKey, QueueEntry>>,
}

impl MemoryDelayQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<JobKey, QueueEntry>> {
        // Entries are plain data, a panic elsewhere cannot leave them half-written
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn by_score(entries: &mut [QueueEntry]) {
    entries.sort_by(|a, b| a.not_before.cmp(&b.not_before).then_with(|| a.key.cmp(&b.key)));
}

#[async_trait]
impl DelayQueue for MemoryDelayQueue {
    async fn insert(&self, entry: &QueueEntry) -> Result<(), QueueError> {
        self.entries().insert(entry.key.clone(), entry.clone());
        Ok(())
    }

    async fn claim_due(
        &self,
        now: DateTime<Utc>,
        claimed_until: DateTime<Utc>,
    ) -> Result<Vec<QueueEntry>, QueueError> {
        let mut entries = self.entries();
        let mut claimed: Vec<QueueEntry> = entries
            .values_mut()
            .filter(|entry| entry.not_before <= now)
            .map(|entry| {
                entry.not_before = claimed_until;
                entry.clone()
            })
            .collect();
        drop(entries);

        by_score(&mut claimed);
        Ok(claimed)
    }

    async fn remove(&self, key: &JobKey) -> Result<bool, QueueError> {
        Ok(self.entries().remove(key).is_some())
    }

    async fn list(&self) -> Result<Vec<QueueEntry>, QueueError> {
        let mut all: Vec<QueueEntry> = self.entries().values().cloned().collect();
        by_score(&mut all);
        Ok(all)
    }

    async fn ping(&self) -> Result<(), QueueError> {
        Ok(())
    }
}
