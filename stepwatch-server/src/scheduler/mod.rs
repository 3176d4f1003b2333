//! Scheduler layer
//!
//! Turns poll triggers into status checks: the [`PollDriver`] claims due
//! entries from the delay queue and the [`WorkerPool`] runs the checks with
//! bounded concurrency. Work started by Slack requests runs in
//! [`BackgroundTasks`].

pub mod poller;
pub mod pool;
pub mod tasks;

pub use poller::PollDriver;
pub use pool::{CheckHandler, WorkerPool};
pub use tasks::BackgroundTasks;
