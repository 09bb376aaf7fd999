use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rand::Rng;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::schedule::{
    CourseId, FilterCriteria, ScheduleError, ScheduleRequest, TimeWindow,
};
use crate::server::cache::RequestKey;
use crate::server::types::ApiErrorType;
use crate::types::PlannerState;

/// Body of a schedule generation request.
#[derive(Debug, Deserialize)]
pub struct GenerateSchedulesBody {
    pub course_ids: Vec<CourseId>,
    #[serde(default)]
    pub criteria: FilterCriteria,
    #[serde(default)]
    pub time_window: Option<TimeWindow>,
    /// If true, bypass cache and search again
    #[serde(default)]
    pub refresh: bool,
}

/// Converts a ScheduleError to an API response.
fn schedule_error_to_response(error: ScheduleError) -> Response {
    let (status, message) = match &error {
        ScheduleError::UnknownCourse { .. } => (StatusCode::NOT_FOUND, "Course does not exist"),
        ScheduleError::InvalidCriteria { .. } | ScheduleError::InvalidRequest { .. } => {
            (StatusCode::BAD_REQUEST, "Invalid schedule request")
        }
        ScheduleError::ResourceExhausted { .. } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "Too many possible schedules, try narrowing your filters",
        ),
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to generate schedules",
        ),
    };

    ApiErrorType::from((status, message, Some(error.to_string()))).into_response()
}

/// POST /terms/:term/schedules
///
/// Generates every conflict-free schedule for the requested courses.
pub async fn post_generate_schedules(
    Path(term): Path<String>,
    State(s): State<Arc<PlannerState>>,
    Json(body): Json<GenerateSchedulesBody>,
) -> Response {
    let correlation_id = generate_correlation_id();
    info!(
        correlation_id = %correlation_id,
        "POST /terms/{}/schedules ({} courses, refresh={})",
        term,
        body.course_ids.len(),
        body.refresh
    );

    let request = ScheduleRequest {
        term,
        course_ids: body.course_ids,
        criteria: body.criteria,
        time_window: body.time_window,
    };
    let key = match RequestKey::from_request(&request) {
        Ok(key) => key,
        Err(e) => return schedule_error_to_response(e),
    };

    let cache_state = &s.cache_state;
    if !body.refresh {
        if let Some(cached) = cache_state.cache.get(&key) {
            info!(correlation_id = %correlation_id, request = %key, "Returning cached schedules");
            return (StatusCode::OK, Json(cached.as_ref())).into_response();
        }
    }

    // Identical concurrent requests wait here and reuse the first result
    let lock = cache_state.get_request_lock(&key);
    let guard = lock.lock().await;

    if !body.refresh {
        if let Some(cached) = cache_state.cache.get(&key) {
            info!(
                correlation_id = %correlation_id,
                request = %key,
                "Returning cached schedules (post-lock)"
            );
            drop(guard);
            drop(lock);
            cache_state.release_request_lock(&key);
            return (StatusCode::OK, Json(cached.as_ref())).into_response();
        }
    }

    let start = Instant::now();
    let state = s.clone();
    let result = tokio::task::spawn_blocking(move || state.generator().generate(&request)).await;

    let response = match result {
        Ok(Ok(outcome)) => {
            info!(
                correlation_id = %correlation_id,
                schedules = outcome.schedules.len(),
                nodes_visited = outcome.stats.nodes_visited,
                duration_ms = start.elapsed().as_millis() as u64,
                "Schedule generation completed"
            );
            let outcome = Arc::new(outcome);
            cache_state.cache.insert(key.clone(), outcome.clone());
            (StatusCode::OK, Json(outcome.as_ref())).into_response()
        }
        Ok(Err(e)) => {
            if e.is_client_error() {
                warn!(correlation_id = %correlation_id, error = %e, "Schedule request rejected");
            } else {
                error!(correlation_id = %correlation_id, error = %e, "Schedule generation failed");
            }
            schedule_error_to_response(e)
        }
        Err(e) => {
            error!(correlation_id = %correlation_id, error = %e, "Schedule generation task panicked");
            ApiErrorType::from((
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to generate schedules",
                Some(e.to_string()),
            ))
            .into_response()
        }
    };

    drop(guard);
    drop(lock);
    cache_state.release_request_lock(&key);
    response
}

/// GET /terms/:term/courses/:course_id/sections
///
/// Returns every section (with meetings) of a course for a term.
pub async fn get_course_sections(
    Path((term, course_id)): Path<(String, CourseId)>,
    State(s): State<Arc<PlannerState>>,
) -> Response {
    info!("GET /terms/{}/courses/{}/sections", term, course_id);

    match s.catalog.get_course(&term, course_id) {
        Ok(Some(course)) => (StatusCode::OK, Json(course.sections)).into_response(),
        Ok(None) => schedule_error_to_response(ScheduleError::UnknownCourse { term, course_id }),
        Err(e) => ApiErrorType::from((
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to fetch sections",
            Some(e.to_string()),
        ))
        .into_response(),
    }
}

/// Generates a unique correlation ID for request tracing.
fn generate_correlation_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros();
    let random: u32 = rand::thread_rng().gen();
    format!("{:x}-{:08x}", timestamp & 0xFFFFFFFF, random)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::CatalogDb;
    use crate::schedule::testing::section;
    use crate::schedule::{Course, PlannerConfig};
    use axum::body::to_bytes;

    fn state() -> Arc<PlannerState> {
        let catalog = CatalogDb::open_in_memory().unwrap();
        catalog
            .insert_course(
                "FA24",
                &Course::new(
                    1,
                    vec![
                        section(1, "a1", &[("M", 540, 600)]),
                        section(2, "a2", &[("Tu", 540, 600)]),
                    ],
                ),
            )
            .unwrap();
        catalog
            .insert_course(
                "FA24",
                &Course::new(
                    2,
                    vec![
                        section(3, "b1", &[("M", 570, 630)]),
                        section(4, "b2", &[("W", 540, 600)]),
                    ],
                ),
            )
            .unwrap();
        Arc::new(PlannerState::with_catalog(catalog, PlannerConfig::default()))
    }

    fn body(course_ids: Vec<CourseId>) -> Json<GenerateSchedulesBody> {
        Json(GenerateSchedulesBody {
            course_ids,
            criteria: FilterCriteria::default(),
            time_window: None,
            refresh: false,
        })
    }

    async fn json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_generate_schedules_endpoint() {
        let s = state();
        let response = post_generate_schedules(
            Path("FA24".to_string()),
            State(s.clone()),
            body(vec![1, 2]),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let value = json(response).await;
        let keys: Vec<&str> = value["schedules"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["key"].as_str().unwrap())
            .collect();
        assert_eq!(keys, vec!["a1|b2", "a2|b1", "a2|b2"]);
        assert_eq!(s.cache_state.cache.len(), 1);
        assert!(s.cache_state.request_locks.is_empty());
    }

    #[tokio::test]
    async fn test_error_status_codes() {
        let s = state();

        let unknown =
            post_generate_schedules(Path("FA24".to_string()), State(s.clone()), body(vec![1, 42]))
                .await;
        assert_eq!(unknown.status(), StatusCode::NOT_FOUND);

        let empty =
            post_generate_schedules(Path("FA24".to_string()), State(s.clone()), body(vec![])).await;
        assert_eq!(empty.status(), StatusCode::BAD_REQUEST);
        let value = json(empty).await;
        assert_eq!(value["error"], "Invalid schedule request");

        let exhausted = schedule_error_to_response(ScheduleError::ResourceExhausted {
            nodes_visited: 5,
            reason: "node limit 5 reached".to_string(),
        });
        assert_eq!(exhausted.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_course_sections_endpoint() {
        let s = state();
        let found = get_course_sections(Path(("FA24".to_string(), 2)), State(s.clone())).await;
        assert_eq!(found.status(), StatusCode::OK);
        let value = json(found).await;
        assert_eq!(value[1]["crn"], "b2");
        assert_eq!(value[1]["meetings"][0]["days"], "W");

        let missing = get_course_sections(Path(("FA24".to_string(), 3)), State(s)).await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }
}
