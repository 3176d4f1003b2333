//! Queue API Handlers
//!
//! Operator view of the delay queue.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use stepwatch_core::domain::job::JobKey;
use stepwatch_core::dto::queue::QueueEntrySummary;

use crate::api::AppState;
use crate::api::error::ApiResult;

/// GET /queue
/// Lists queued pipelines, earliest re-check first
pub async fn list_queue(State(state): State<AppState>) -> ApiResult<Json<Vec<QueueEntrySummary>>> {
    tracing::debug!("Listing delay queue");

    let entries = state.queue.list().await?;
    Ok(Json(entries.iter().map(|e| e.summary()).collect()))
}

/// DELETE /queue/{key}
/// Stops tracking a pipeline; succeeds whether or not it was queued
pub async fn remove_entry(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> ApiResult<StatusCode> {
    let key = JobKey::from(key);
    let removed = state.queue.remove(&key).await?;
    tracing::info!(job_key = %key, removed, "Queue entry dropped by operator");

    Ok(StatusCode::NO_CONTENT)
}
