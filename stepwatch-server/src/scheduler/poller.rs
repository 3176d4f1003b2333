//! Poll driver
//!
//! Claims every due entry from the delay queue and hands each one to the
//! worker pool. A cycle returns as soon as the entries are handed off; it never
//! waits for a status check to finish.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{debug, info, warn};

use super::pool::{SubmitError, Submitter};
use crate::queue::DelayQueue;

/// What a single poll cycle did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSummary {
    /// Entries claimed from the queue
    pub claimed: usize,
    /// Entries handed to a worker
    pub dispatched: usize,
    /// Entries left in the queue because no worker slot was free or the job
    /// was still being checked
    pub deferred: usize,
}

pub struct PollDriver {
    queue: Arc<dyn DelayQueue>,
    submitter: Submitter,
    retry_interval: chrono::Duration,
}

impl PollDriver {
    pub fn new(queue: Arc<dyn DelayQueue>, submitter: Submitter, retry_interval: Duration) -> Self {
        let retry_interval =
            chrono::Duration::from_std(retry_interval).unwrap_or(chrono::Duration::seconds(4));
        Self {
            queue,
            submitter,
            retry_interval,
        }
    }

    /// Runs one poll cycle at the current time
    pub async fn poll_once(&self) -> PollSummary {
        self.poll_at(Utc::now()).await
    }

    /// Runs one poll cycle as if the clock read `now`
    ///
    /// Claimed entries are pushed to `now + retry_interval` before they are
    /// dispatched, so a check that never finishes is retried one interval later.
    pub async fn poll_at(&self, now: DateTime<Utc>) -> PollSummary {
        let claimed_until = now + self.retry_interval;

        let entries = match self.queue.claim_due(now, claimed_until).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Could not claim due entries, skipping cycle: {}", e);
                return PollSummary::default();
            }
        };

        let mut summary = PollSummary {
            claimed: entries.len(),
            ..PollSummary::default()
        };

        for entry in entries {
            match self.submitter.try_submit(entry) {
                Ok(()) => summary.dispatched += 1,
                Err(SubmitError::Full(entry)) => {
                    debug!(job_key = %entry.key, "Workers busy, deferring to next cycle");
                    summary.deferred += 1;
                }
                Err(SubmitError::InFlight(entry)) => {
                    debug!(job_key = %entry.key, "Previous check still running, deferring");
                    summary.deferred += 1;
                }
                Err(SubmitError::Closed(entry)) => {
                    debug!(job_key = %entry.key, "Worker pool closed, leaving entry queued");
                    summary.deferred += 1;
                }
            }
        }

        if summary.claimed > 0 {
            info!(
                claimed = summary.claimed,
                dispatched = summary.dispatched,
                deferred = summary.deferred,
                "Poll cycle dispatched status checks"
            );
        }

        summary
    }

    /// Polls on a fixed period until the task is aborted
    pub async fn run_every(self: Arc<Self>, period: Duration) {
        info!("Starting self-poll loop (interval: {:?})", period);

        let mut interval = time::interval(period);
        interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            debug!("Self-poll tick");
            self.poll_once().await;
        }
    }
}
