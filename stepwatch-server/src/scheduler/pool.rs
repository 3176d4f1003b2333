//! Worker pool
//!
//! A fixed number of tokio tasks share the receiving end of a bounded channel.
//! The poll driver pushes claimed entries in through a [`Submitter`] without
//! ever waiting; when the channel is full the entry is handed back so the caller
//! can leave it for the next cycle.
//!
//! A key stays in flight from submission until its check returns, and a key
//! that is already in flight is refused. Checks of one job therefore never
//! overlap, even when a check outlasts the retry interval.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, PoisonError};
use stepwatch_core::domain::job::JobKey;
use thiserror::Error;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::queue::QueueEntry;

/// Work performed for every submitted entry
#[async_trait]
pub trait CheckHandler: Send + Sync {
    async fn handle(&self, entry: QueueEntry);
}

#[derive(Debug, Error)]
pub enum SubmitError {
    /// Every worker is busy and the channel is at capacity
    #[error("worker channel is full")]
    Full(QueueEntry),

    /// The pool has shut down
    #[error("worker pool is shut down")]
    Closed(QueueEntry),

    /// A check of the same job is waiting or running
    #[error("job is already being checked")]
    InFlight(QueueEntry),
}

/// Keys submitted and not yet handled
#[derive(Debug, Default)]
struct InFlight {
    keys: std::sync::Mutex<HashSet<JobKey>>,
}

impl InFlight {
    /// Marks `key` in flight; false if it already was
    fn begin(&self, key: &JobKey) -> bool {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone())
    }

    fn finish(&self, key: &JobKey) {
        self.keys
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }
}

/// Sending half of the pool, cheap to clone
#[derive(Debug, Clone)]
pub struct Submitter {
    sender: mpsc::Sender<QueueEntry>,
    in_flight: Arc<InFlight>,
}

impl Submitter {
    /// Queues an entry for a worker, never waiting for room
    pub fn try_submit(&self, entry: QueueEntry) -> Result<(), SubmitError> {
        if !self.in_flight.begin(&entry.key) {
            return Err(SubmitError::InFlight(entry));
        }

        self.sender.try_send(entry).map_err(|e| {
            let (error, key) = match e {
                mpsc::error::TrySendError::Full(entry) => {
                    let key = entry.key.clone();
                    (SubmitError::Full(entry), key)
                }
                mpsc::error::TrySendError::Closed(entry) => {
                    let key = entry.key.clone();
                    (SubmitError::Closed(entry), key)
                }
            };
            self.in_flight.finish(&key);
            error
        })
    }
}

pub struct WorkerPool {
    workers: Vec<JoinHandle<()>>,
    shutdown: watch::Sender<bool>,
}

impl WorkerPool {
    /// Starts `workers` tasks reading from a channel holding up to `capacity`
    /// waiting entries
    pub fn spawn(
        workers: usize,
        capacity: usize,
        handler: Arc<dyn CheckHandler>,
    ) -> (Self, Submitter) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));
        let (shutdown, shutdown_rx) = watch::channel(false);
        let in_flight = Arc::new(InFlight::default());

        let workers = (0..workers.max(1))
            .map(|id| {
                tokio::spawn(worker_loop(
                    id,
                    Arc::clone(&receiver),
                    shutdown_rx.clone(),
                    Arc::clone(&handler),
                    Arc::clone(&in_flight),
                ))
            })
            .collect::<Vec<_>>();

        info!(workers = workers.len(), capacity, "Worker pool started");

        (
            Self { workers, shutdown },
            Submitter { sender, in_flight },
        )
    }

    /// Number of worker tasks
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Stops accepting entries and waits until every queued entry is handled
    pub async fn shutdown(self) {
        info!("Shutting down worker pool");
        // Err only means every worker already exited
        let _ = self.shutdown.send(true);

        for worker in self.workers {
            if let Err(e) = worker.await {
                error!("Worker task failed: {}", e);
            }
        }

        info!("Worker pool stopped");
    }
}

async fn worker_loop(
    id: usize,
    receiver: Arc<Mutex<mpsc::Receiver<QueueEntry>>>,
    mut shutdown: watch::Receiver<bool>,
    handler: Arc<dyn CheckHandler>,
    in_flight: Arc<InFlight>,
) {
    debug!(worker = id, "Worker started");

    while let Some(entry) = next_entry(&receiver, &mut shutdown).await {
        let key = entry.key.clone();
        let handler = Arc::clone(&handler);

        // A panicking check only takes down its own task
        let task = tokio::spawn(async move { handler.handle(entry).await });
        if let Err(e) = task.await {
            error!(worker = id, job_key = %key, "Status check panicked: {}", e);
        }
        in_flight.finish(&key);
    }

    debug!(worker = id, "Worker stopped");
}

/// Next entry to handle, or `None` once the pool is shut down and drained
async fn next_entry(
    receiver: &Mutex<mpsc::Receiver<QueueEntry>>,
    shutdown: &mut watch::Receiver<bool>,
) -> Option<QueueEntry> {
    let mut receiver = receiver.lock().await;

    if !*shutdown.borrow() {
        tokio::select! {
            entry = receiver.recv() => return entry,
            _ = shutdown.changed() => {}
        }
    }

    // Closing keeps buffered entries readable
    receiver.close();
    receiver.recv().await
}
