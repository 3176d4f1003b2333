//! Stepwatch Server
//!
//! Runs GitLab pipelines for Slack workflow steps and reports back when they
//! finish.
//!
//! Architecture:
//! - API: Slack events, the `/poll` trigger, health and queue endpoints
//! - Service: pipeline start (ingress), status checks, step configuration
//! - Scheduler: poll driver, bounded worker pool, request background tasks
//! - Queue: delay queue of running pipelines (PostgreSQL or in-memory)
//!
//! Nothing waits on a pipeline. Each poll claims the pipelines whose re-check
//! time has come, pushes that time one retry interval forward, and hands them
//! to the worker pool.

mod api;
mod config;
mod db;
mod queue;
mod scheduler;
mod service;

#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use std::sync::Arc;
use stepwatch_client::{ChatClient, CiClient, GitLabClient, SlackClient};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::AppState;
use crate::config::{Config, QueueBackend};
use crate::queue::{DelayQueue, MemoryDelayQueue, PgDelayQueue};
use crate::scheduler::{BackgroundTasks, PollDriver, WorkerPool};
use crate::service::{IngressService, StatusChecker, StepConfigService};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stepwatch_server=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Stepwatch Server");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate()?;
    info!(
        "Loaded configuration: backend={:?}, retry_interval={:?}, polling_threads={}",
        config.queue_backend, config.retry_interval, config.polling_threads
    );
    if config.slack_signing_secret.is_none() {
        warn!("SLACK_SIGNING_SECRET not set, Slack requests will not be verified");
    }

    // Delay queue
    let queue = open_queue(&config).await?;
    queue
        .ping()
        .await
        .context("Delay queue store is not reachable")?;
    info!("Delay queue ready");

    // External clients
    let ci: Arc<dyn CiClient> = Arc::new(GitLabClient::new(config.http_timeout)?);
    let chat: Arc<dyn ChatClient> = Arc::new(SlackClient::new(
        config.slack_api_url.clone(),
        config.slack_bot_token.clone(),
        config.http_timeout,
    )?);

    // Scheduler
    let checker = Arc::new(StatusChecker::new(queue.clone(), ci.clone(), chat.clone()));
    let (pool, submitter) =
        WorkerPool::spawn(config.polling_threads, config.work_queue_capacity, checker);
    info!("Worker pool ready with {} workers", pool.size());
    let driver = Arc::new(PollDriver::new(
        queue.clone(),
        submitter,
        config.retry_interval,
    ));

    let self_poll = config
        .self_poll_interval
        .map(|period| tokio::spawn(Arc::clone(&driver).run_every(period)));

    let tasks = BackgroundTasks::new(config.background_tasks);

    // Build router with all API endpoints
    let state = AppState {
        queue: queue.clone(),
        driver,
        ingress: Arc::new(IngressService::new(queue, ci, chat.clone())),
        step_config: Arc::new(StepConfigService::new(chat)),
        tasks: tasks.clone(),
        signing_secret: config.slack_signing_secret.as_deref().map(Arc::from),
    };
    let app = api::create_router(state);

    info!("Listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Some(handle) = self_poll {
        handle.abort();
    }
    // Launches may still queue pipelines, so they finish before the pool drains
    tasks.shutdown().await;
    pool.shutdown().await;

    info!("Stepwatch Server stopped");
    Ok(())
}

async fn open_queue(config: &Config) -> Result<Arc<dyn DelayQueue>> {
    match config.queue_backend {
        QueueBackend::Postgres => {
            info!("Connecting to database...");
            let pool = db::create_pool(&config.database_url)
                .await
                .context("Failed to create database pool")?;
            db::run_migrations(&pool)
                .await
                .context("Failed to run database migrations")?;
            Ok(Arc::new(PgDelayQueue::new(pool)))
        }
        QueueBackend::Memory => {
            warn!("Using in-memory delay queue, queued pipelines are lost on restart");
            Ok(Arc::new(MemoryDelayQueue::new()))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
