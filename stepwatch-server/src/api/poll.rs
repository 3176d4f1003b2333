//! Poll trigger
//!
//! Called on a fixed schedule by an external timer (or the `stepwatch poll`
//! command). Each call runs one poll cycle.

use axum::{extract::State, http::StatusCode};

use crate::api::AppState;

/// POST /poll
/// Dispatches status checks for every due pipeline; always answers 200
pub async fn trigger_poll(State(state): State<AppState>) -> StatusCode {
    let summary = state.driver.poll_once().await;
    tracing::debug!(
        claimed = summary.claimed,
        dispatched = summary.dispatched,
        deferred = summary.deferred,
        "Poll triggered"
    );
    StatusCode::OK
}
