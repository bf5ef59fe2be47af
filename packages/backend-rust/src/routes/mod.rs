mod concepts;
mod gaps;
mod health;
mod questions;
mod reviews;

use std::sync::Arc;

use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;

use crate::db::DatabaseProxy;
use crate::response::{json_error, AppError};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/reviews", post(reviews::submit))
        .route("/api/reviews/due", get(reviews::due_list))
        .route("/api/reviews/:conceptId/preview", get(reviews::preview))
        .route("/api/concepts/stats/overview", get(concepts::stats_overview))
        .route("/api/concepts/:conceptId/mastery", get(concepts::get_mastery))
        .route("/api/gaps", get(gaps::list_gaps))
        .route("/api/gaps/analyze", post(gaps::analyze))
        .route("/api/questions/generate", post(questions::generate))
        .route("/api/questions/grade", post(questions::grade))
        .nest("/health", health::router())
        .nest("/api/health", health::router())
        .fallback(fallback_handler)
        .with_state(state)
}

/// Identity arrives from the upstream auth collaborator as a header; the
/// backend itself does not authenticate.
pub(crate) fn require_user(headers: &HeaderMap) -> Result<String, AppError> {
    headers
        .get("x-user-id")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| value.to_string())
        .ok_or_else(|| AppError::unauthorized("missing X-User-Id header"))
}

pub(crate) fn require_db(state: &AppState) -> Result<Arc<DatabaseProxy>, AppError> {
    state
        .db_proxy()
        .ok_or_else(|| AppError::service_unavailable("database not available"))
}

async fn fallback_handler() -> Response {
    json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "route not found").into_response()
}
