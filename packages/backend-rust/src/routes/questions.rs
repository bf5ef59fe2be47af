use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use notewise_algo::{ConceptMasteryState, ReviewResponse};

use crate::response::{AppError, SuccessResponse};
use crate::routes::{require_db, require_user};
use crate::services::extraction::PracticeQuestion;
use crate::services::questions::{judge_answer, AnswerJudgment};
use crate::services::review;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    note_text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    count: usize,
    questions: Vec<PracticeQuestion>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeRequest {
    concept_id: String,
    expected_answer: String,
    given_answer: String,
    /// Verdict from the AI grader, when it produced one
    ai_correct: Option<bool>,
    response_time_ms: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GradeResponse {
    judgment: AnswerJudgment,
    state: ConceptMasteryState,
}

pub async fn generate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<GenerateRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_user(&headers)?;

    if payload.note_text.trim().is_empty() {
        return Err(AppError::validation("noteText must not be empty"));
    }

    let extractor = state.extractor();
    if !state.runtime().is_llm_enabled() || !extractor.is_available() {
        return Err(AppError::service_unavailable(
            "question generation service not configured",
        ));
    }

    let questions = extractor
        .practice_questions(&payload.note_text)
        .await
        .map_err(|err| {
            tracing::warn!(error = %err, "question generation failed");
            AppError::service_unavailable("question generation failed")
        })?;

    Ok(Json(SuccessResponse::new(GenerateResponse {
        count: questions.len(),
        questions,
    })))
}

pub async fn grade(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<GradeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = require_user(&headers)?;
    let proxy = require_db(&state)?;

    let concept_id = payload.concept_id.trim().to_string();
    if concept_id.is_empty() {
        return Err(AppError::validation("conceptId must not be empty"));
    }

    let judgment = judge_answer(
        &payload.expected_answer,
        &payload.given_answer,
        payload.ai_correct,
        payload.response_time_ms,
    );

    let response = ReviewResponse {
        quality: judgment.quality(),
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
        tracing::error!(error = %err, concept_id, "graded review failed");
        AppError::internal("graded review failed")
    })?;

    Ok(Json(SuccessResponse::new(GradeResponse {
        judgment,
        state: next,
    })))
}
