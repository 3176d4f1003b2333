//! API Module
//!
//! HTTP API layer of the server.
//! Each submodule handles endpoints for a specific concern.

pub mod error;
pub mod events;
pub mod health;
pub mod poll;
pub mod queue;
pub mod signature;

use axum::{
    Router,
    routing::{delete, get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::queue::DelayQueue;
use crate::scheduler::{BackgroundTasks, PollDriver};
use crate::service::{IngressService, StepConfigService};

/// Shared handles for every request
#[derive(Clone)]
pub struct AppState {
    pub queue: Arc<dyn DelayQueue>,
    pub driver: Arc<PollDriver>,
    pub ingress: Arc<IngressService>,
    pub step_config: Arc<StepConfigService>,
    /// Outbound work started by Slack requests
    pub tasks: BackgroundTasks,
    /// Slack signing secret; requests are not verified when unset
    pub signing_secret: Option<Arc<str>>,
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Slack events and interactivity
        .route("/", get(events::handle_event).post(events::handle_event))
        // Poll trigger
        .route("/poll", post(poll::trigger_poll))
        // Health check
        .route("/health", get(health::health_check))
        // Operator endpoints
        .route("/queue", get(queue::list_queue))
        .route("/queue/{*key}", delete(queue::remove_entry))
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
