use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::types::PlannerState;

/// GET /health
pub async fn get_health() -> Response {
    (StatusCode::OK, Json(json!({ "status": "ok" }))).into_response()
}

/// GET /cache_stats
///
/// Returns entry counts and limits for the generated-schedule cache.
pub async fn get_cache_stats(State(s): State<Arc<PlannerState>>) -> Response {
    info!("GET /cache_stats");
    (StatusCode::OK, Json(s.cache_state.cache.stats())).into_response()
}

/// POST /invalidate_cache
///
/// Drops every cached result, e.g. after the catalog was re-imported.
pub async fn post_invalidate_cache(State(s): State<Arc<PlannerState>>) -> Response {
    info!("POST /invalidate_cache");
    let removed = s.cache_state.cache.clear();
    (StatusCode::OK, Json(json!({ "removed": removed }))).into_response()
}
