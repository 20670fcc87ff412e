//! HTTP API endpoints.
//!
//! Read-only presence counters for dashboards and health checks.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use crate::app::AppState;

/// Current broker counters.
///
/// GET /api/stats
pub async fn get_stats(State(state): State<Arc<AppState>>) -> Response {
    match state.broker.stats().await {
        Some(stats) => Json(stats).into_response(),
        None => {
            tracing::error!("Stats requested but broker is not running");
            (StatusCode::SERVICE_UNAVAILABLE, "Broker unavailable").into_response()
        }
    }
}
