//! Health Check API Handler
//!
//! Reports whether the delay queue store is reachable.

use axum::{extract::State, http::StatusCode, response::IntoResponse};

use crate::api::AppState;
use crate::api::error::ApiResult;

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    state.queue.ping().await?;
    Ok((StatusCode::OK, "OK"))
}
