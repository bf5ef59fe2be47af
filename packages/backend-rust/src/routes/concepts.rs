use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use notewise_algo::ConceptMasteryState;

use crate::response::{AppError, SuccessResponse};
use crate::routes::{require_db, require_user};
use crate::services::review;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConceptMasteryDto {
    /// false when the learner has never reviewed this concept; the state
    /// then carries first-exposure defaults
    tracked: bool,
    #[serde(flatten)]
    state: ConceptMasteryState,
}

pub async fn get_mastery(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(concept_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = require_user(&headers)?;
    let proxy = require_db(&state)?;

    let concept_id = concept_id.trim().to_string();
    if concept_id.is_empty() {
        return Err(AppError::validation("conceptId must not be empty"));
    }

    let stored = review::load_state(proxy.as_ref(), &user_id, &concept_id)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, concept_id, "state lookup failed");
            AppError::internal("state lookup failed")
        })?;

    let tracked = stored.is_some();
    let mastery =
        stored.unwrap_or_else(|| ConceptMasteryState::new(&concept_id, Utc::now().date_naive()));

    Ok(Json(SuccessResponse::new(ConceptMasteryDto {
        tracked,
        state: mastery,
    })))
}

pub async fn stats_overview(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let user_id = require_user(&headers)?;
    let proxy = require_db(&state)?;

    let overview = review::mastery_overview(proxy.as_ref(), &user_id, Utc::now().date_naive())
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "mastery overview query failed");
            AppError::internal("mastery overview query failed")
        })?;

    Ok(Json(SuccessResponse::new(overview)))
}
