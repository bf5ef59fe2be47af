//! Knowledge-gap ranking and storage.
//!
//! Raw candidates come from the extraction collaborator (or directly from
//! the request body); this service normalizes them, scores each one through
//! the core scorer, keeps the highest-priority few, and appends them as a
//! fresh analysis batch. Existing rows are never mutated.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use notewise_algo::{score_gap, GapType, KnowledgeGap};

use crate::db::DatabaseProxy;
use crate::services::extraction::GapCandidate;

/// Gaps kept per analysis run.
pub const MAX_RANKED_GAPS: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredGap {
    pub id: String,
    #[serde(flatten)]
    pub gap: KnowledgeGap,
    pub analysis_id: String,
    pub created_at: String,
}

/// Normalize, score, and rank candidates; highest priority first, capped at
/// [`MAX_RANKED_GAPS`]. Pure; safe on hostile input.
pub fn rank_candidates(candidates: Vec<GapCandidate>) -> Vec<KnowledgeGap> {
    let mut gaps: Vec<KnowledgeGap> = candidates
        .into_iter()
        .filter(|candidate| !candidate.concept.trim().is_empty())
        .map(|candidate| {
            score_gap(
                candidate.concept.trim(),
                candidate.gap_type.as_deref().map(GapType::parse),
                candidate.user_mastery,
            )
        })
        .collect();

    // priority_score is clamped, so total ordering is safe
    gaps.sort_by(|a, b| {
        b.priority_score
            .partial_cmp(&a.priority_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.concept.cmp(&b.concept))
    });
    gaps.truncate(MAX_RANKED_GAPS);
    gaps
}

/// Persist a ranked batch under a fresh analysis id.
pub async fn store_analysis(
    proxy: &DatabaseProxy,
    user_id: &str,
    gaps: &[KnowledgeGap],
) -> Result<String, sqlx::Error> {
    let analysis_id = Uuid::new_v4().to_string();

    for gap in gaps {
        sqlx::query(
            r#"
            INSERT INTO "knowledge_gaps"
                ("id", "userId", "concept", "gapType", "userMastery",
                 "priorityScore", "analysisId", "createdAt")
            VALUES ($1, $2, $3, $4, $5, $6, $7, NOW())
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(&gap.concept)
        .bind(gap.gap_type.as_str())
        .bind(gap.user_mastery)
        .bind(gap.priority_score)
        .bind(&analysis_id)
        .execute(proxy.pool())
        .await?;
    }

    tracing::info!(user_id, analysis_id = %analysis_id, gap_count = gaps.len(), "gap analysis stored");
    Ok(analysis_id)
}

/// The most recent analysis batch for a user, highest priority first.
pub async fn latest_gaps(
    proxy: &DatabaseProxy,
    user_id: &str,
) -> Result<Vec<StoredGap>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT "id", "concept", "gapType", "userMastery", "priorityScore",
               "analysisId", "createdAt"
        FROM "knowledge_gaps"
        WHERE "userId" = $1
          AND "analysisId" = (
              SELECT "analysisId"
              FROM "knowledge_gaps"
              WHERE "userId" = $1
              ORDER BY "createdAt" DESC
              LIMIT 1
          )
        ORDER BY "priorityScore" DESC, "concept" ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(proxy.pool())
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let created_at = row
                .try_get::<NaiveDateTime, _>("createdAt")
                .map(|ts| {
                    DateTime::<Utc>::from_naive_utc_and_offset(ts, Utc)
                        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
                })
                .unwrap_or_default();
            StoredGap {
                id: row.try_get::<String, _>("id").unwrap_or_default(),
                gap: KnowledgeGap {
                    concept: row.try_get::<String, _>("concept").unwrap_or_default(),
                    gap_type: GapType::parse(
                        &row.try_get::<String, _>("gapType").unwrap_or_default(),
                    ),
                    user_mastery: row.try_get::<f64, _>("userMastery").unwrap_or(0.0),
                    priority_score: row.try_get::<f64, _>("priorityScore").unwrap_or(0.0),
                },
                analysis_id: row.try_get::<String, _>("analysisId").unwrap_or_default(),
                created_at,
            }
        })
        .collect())
}

/// Delete gap rows older than the retention window. Returns rows removed.
pub async fn prune_stale(pool: &PgPool, retention_days: i64) -> Result<u64, sqlx::Error> {
    let cutoff = (Utc::now() - chrono::Duration::days(retention_days)).naive_utc();
    let result = sqlx::query(r#"DELETE FROM "knowledge_gaps" WHERE "createdAt" < $1"#)
        .bind(cutoff)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(concept: &str, gap_type: Option<&str>, mastery: Option<f64>) -> GapCandidate {
        GapCandidate {
            concept: concept.to_string(),
            gap_type: gap_type.map(|s| s.to_string()),
            user_mastery: mastery,
            description: None,
        }
    }

    #[test]
    fn ranks_by_priority_descending() {
        let ranked = rank_candidates(vec![
            candidate("well known", Some("general"), Some(0.9)),
            candidate("foundation", Some("prerequisite"), Some(0.2)),
            candidate("shaky", Some("reinforcement"), Some(0.5)),
        ]);

        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0].concept, "foundation");
        assert!((ranked[0].priority_score - 1.0).abs() < 1e-9);
        assert_eq!(ranked[1].concept, "shaky");
        assert_eq!(ranked[2].concept, "well known");
        assert!((ranked[2].priority_score - 0.1).abs() < 1e-9);
    }

    #[test]
    fn truncates_to_top_five() {
        let candidates = (0..12)
            .map(|i| candidate(&format!("concept-{i}"), None, Some(f64::from(i) / 12.0)))
            .collect();
        let ranked = rank_candidates(candidates);
        assert_eq!(ranked.len(), MAX_RANKED_GAPS);
        // lowest mastery wins
        assert_eq!(ranked[0].concept, "concept-0");
    }

    #[test]
    fn defaults_missing_and_invalid_fields() {
        let ranked = rank_candidates(vec![
            candidate("mystery", None, None),
            candidate("noisy", Some("made-up-type"), Some(-5.0)),
        ]);

        assert_eq!(ranked.len(), 2);
        let noisy = ranked.iter().find(|g| g.concept == "noisy").unwrap();
        assert_eq!(noisy.gap_type, GapType::General);
        assert_eq!(noisy.user_mastery, 0.0);
        assert!((noisy.priority_score - 1.0).abs() < 1e-9);

        let mystery = ranked.iter().find(|g| g.concept == "mystery").unwrap();
        assert_eq!(mystery.gap_type, GapType::General);
        assert!((mystery.user_mastery - 0.5).abs() < 1e-9);
    }

    #[test]
    fn skips_blank_concepts() {
        let ranked = rank_candidates(vec![
            candidate("  ", None, None),
            candidate("real", None, None),
        ]);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].concept, "real");
    }
}
