use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use notewise_algo::KnowledgeGap;

use crate::response::{AppError, SuccessResponse};
use crate::routes::{require_db, require_user};
use crate::services::extraction::GapCandidate;
use crate::services::gaps;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    /// Raw candidates from a caller that already ran extraction
    candidates: Option<Vec<GapCandidate>>,
    /// Note text to run through the extraction collaborator
    note_text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeResponse {
    /// Absent when the ranking was computed without persistence
    #[serde(skip_serializing_if = "Option::is_none")]
    analysis_id: Option<String>,
    gaps: Vec<KnowledgeGap>,
}

pub async fn analyze(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<AnalyzeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = require_user(&headers)?;

    let candidates = match (payload.candidates, payload.note_text) {
        (Some(candidates), _) if !candidates.is_empty() => candidates,
        (_, Some(text)) if !text.trim().is_empty() => {
            let extractor = state.extractor();
            if !state.runtime().is_llm_enabled() || !extractor.is_available() {
                return Err(AppError::service_unavailable(
                    "concept extraction service not configured",
                ));
            }
            extractor.gap_candidates(&text).await.map_err(|err| {
                tracing::warn!(error = %err, "gap extraction failed");
                AppError::service_unavailable("concept extraction failed")
            })?
        }
        _ => return Err(AppError::validation("provide candidates or noteText")),
    };

    let ranked = gaps::rank_candidates(candidates);

    let analysis_id = match state.db_proxy() {
        Some(proxy) => Some(
            gaps::store_analysis(proxy.as_ref(), &user_id, &ranked)
                .await
                .map_err(|err| {
                    tracing::error!(error = %err, "gap analysis store failed");
                    AppError::internal("gap analysis store failed")
                })?,
        ),
        None => None,
    };

    Ok(Json(SuccessResponse::new(AnalyzeResponse {
        analysis_id,
        gaps: ranked,
    })))
}

pub async fn list_gaps(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let user_id = require_user(&headers)?;
    let proxy = require_db(&state)?;

    let gaps = gaps::latest_gaps(proxy.as_ref(), &user_id)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "gap list query failed");
            AppError::internal("gap list query failed")
        })?;

    Ok(Json(SuccessResponse::new(gaps)))
}
