use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;

use crate::server::endpoints::{schedule, status};
use crate::types::PlannerState;

pub mod cache;
mod endpoints;
mod types;

pub use types::ApiErrorType;

/// Creates a router that can be used by `axum`.
///
/// # Parameters
/// - `app_state`: The app server state.
///
/// # Returns
/// The router.
pub fn create_router(app_state: Arc<PlannerState>) -> Router {
    let term_router = Router::new()
        .route("/schedules", post(schedule::post_generate_schedules))
        .route(
            "/courses/:course_id/sections",
            get(schedule::get_course_sections),
        );

    let cache_router = Router::new()
        .route("/cache_stats", get(status::get_cache_stats))
        .route("/invalidate_cache", post(status::post_invalidate_cache));

    Router::new()
        .route("/health", get(status::get_health))
        .nest("/terms/:term", term_router)
        .merge(cache_router)
        .with_state(app_state)
}
