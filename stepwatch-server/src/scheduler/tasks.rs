//! Request-side background work
//!
//! Slack handlers answer before their outbound calls finish. That work runs
//! here instead of in detached tasks: at most `limit` jobs run at once, and
//! shutdown waits for every started job, so a pipeline that was started is
//! always either queued or reported as failed.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::task::TaskTracker;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct BackgroundTasks {
    tracker: TaskTracker,
    permits: Arc<Semaphore>,
}

impl BackgroundTasks {
    pub fn new(limit: usize) -> Self {
        Self {
            tracker: TaskTracker::new(),
            permits: Arc::new(Semaphore::new(limit.max(1))),
        }
    }

    /// Runs `work` once a slot is free
    pub fn spawn<F>(&self, name: &'static str, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        self.tracker.spawn(async move {
            // The semaphore is never closed
            let _permit = permits.acquire_owned().await;
            debug!(task = name, "Background task started");
            work.await;
        });
    }

    /// Waits for every started job
    pub async fn shutdown(&self) {
        self.tracker.close();
        info!(pending = self.tracker.len(), "Waiting for background tasks");
        self.tracker.wait().await;
        info!("Background tasks finished");
    }
}
