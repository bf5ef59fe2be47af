use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use notewise_algo::{preview_intervals, ConceptMasteryState, ReviewResponse};

use crate::response::{AppError, SuccessResponse};
use crate::routes::{require_db, require_user};
use crate::services::review;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReviewRequest {
    concept_id: String,
    quality: i32,
    response_time_ms: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DueQuery {
    limit: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DueListResponse {
    count: usize,
    concepts: Vec<ConceptMasteryState>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PreviewResponse {
    concept_id: String,
    /// Interval each quality 0..=5 would schedule, in days
    interval_days: [u32; 6],
}

pub async fn submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<SubmitReviewRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = require_user(&headers)?;
    let proxy = require_db(&state)?;

    let concept_id = payload.concept_id.trim().to_string();
    if concept_id.is_empty() {
        return Err(AppError::validation("conceptId must not be empty"));
    }

    let response = ReviewResponse {
        quality: payload.quality,
        response_time_ms: payload.response_time_ms,
    };
    let locks = state.review_locks();

    let next = review::submit_review(
        proxy.as_ref(),
        locks.as_ref(),
        &user_id,
        &concept_id,
        response,
        Utc::now().date_naive(),
    )
    .await
    .map_err(|err| {
        tracing::error!(error = %err, concept_id, "review submission failed");
        AppError::internal("review submission failed")
    })?;

    Ok(Json(SuccessResponse::new(next)))
}

pub async fn due_list(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<DueQuery>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = require_user(&headers)?;
    let proxy = require_db(&state)?;

    let limit = review::clamp_due_limit(query.limit);
    let concepts = review::due_concepts(proxy.as_ref(), &user_id, Utc::now().date_naive(), limit)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "due list query failed");
            AppError::internal("due list query failed")
        })?;

    Ok(Json(SuccessResponse::new(DueListResponse {
        count: concepts.len(),
        concepts,
    })))
}

pub async fn preview(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(concept_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = require_user(&headers)?;
    let proxy = require_db(&state)?;

    let concept_id = concept_id.trim().to_string();
    let prior = review::load_state(proxy.as_ref(), &user_id, &concept_id)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, concept_id, "state lookup failed");
            AppError::internal("state lookup failed")
        })?;

    let interval_days = preview_intervals(prior.as_ref(), Utc::now().date_naive());

    Ok(Json(SuccessResponse::new(PreviewResponse {
        concept_id,
        interval_days,
    })))
}
