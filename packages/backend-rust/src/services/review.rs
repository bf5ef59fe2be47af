//! Review submission and scheduling queries.
//!
//! Wraps the pure scheduling engine with persistence: load the learner's
//! state for a concept, apply the graded response, store the result, and
//! append the raw event to the review log. Writes to one (user, concept)
//! pair are serialized through [`ReviewLockRegistry`]; the engine itself
//! needs no coordination.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::Row;
use uuid::Uuid;

use notewise_algo::{update_mastery_at, ConceptMasteryState, ReviewResponse};

use crate::db::DatabaseProxy;

/// Mastery level at which a concept counts as mastered in overview stats.
pub const MASTERED_THRESHOLD: f64 = 0.8;

const DEFAULT_DUE_LIMIT: i64 = 50;
const MAX_DUE_LIMIT: i64 = 200;
const LOCK_PRUNE_THRESHOLD: usize = 4096;

/// At-most-one writer per (user, concept). Callers hold the returned guard
/// across the read-modify-write cycle; concurrent reviews of different
/// concepts proceed independently.
#[derive(Default)]
pub struct ReviewLockRegistry {
    locks: parking_lot::Mutex<HashMap<(String, String), Arc<tokio::sync::Mutex<()>>>>,
}

impl ReviewLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, user_id: &str, concept_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock();
        if locks.len() > LOCK_PRUNE_THRESHOLD {
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        }
        Arc::clone(
            locks
                .entry((user_id.to_string(), concept_id.to_string()))
                .or_default(),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MasteryOverview {
    pub total_concepts: i64,
    pub mastered_concepts: i64,
    pub learning_concepts: i64,
    pub new_concepts: i64,
    pub average_mastery: f64,
    pub due_count: i64,
}

pub fn clamp_due_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_DUE_LIMIT).max(1).min(MAX_DUE_LIMIT)
}

/// Apply a graded response for `(user, concept)` and persist the new state.
pub async fn submit_review(
    proxy: &DatabaseProxy,
    locks: &ReviewLockRegistry,
    user_id: &str,
    concept_id: &str,
    response: ReviewResponse,
    today: NaiveDate,
) -> Result<ConceptMasteryState, sqlx::Error> {
    let lock = locks.lock_for(user_id, concept_id);
    let _guard = lock.lock().await;

    let prior = load_state(proxy, user_id, concept_id).await?;
    let next = update_mastery_at(prior.as_ref(), concept_id, response.quality, today);

    upsert_state(proxy, user_id, &next).await?;
    insert_review_event(proxy, user_id, concept_id, response).await?;

    tracing::debug!(
        user_id,
        concept_id,
        quality = response.quality,
        interval_days = next.interval_days,
        "review recorded"
    );

    Ok(next)
}

pub async fn load_state(
    proxy: &DatabaseProxy,
    user_id: &str,
    concept_id: &str,
) -> Result<Option<ConceptMasteryState>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT "conceptId", "masteryLevel", "repetitionCount", "easeFactor", "intervalDays", "dueDate"
        FROM "concept_mastery_states"
        WHERE "userId" = $1
          AND "conceptId" = $2
        "#,
    )
    .bind(user_id)
    .bind(concept_id)
    .fetch_optional(proxy.pool())
    .await?;

    Ok(row.map(|r| state_from_row(&r)))
}

/// Concepts due for review on or before `today`, soonest first.
pub async fn due_concepts(
    proxy: &DatabaseProxy,
    user_id: &str,
    today: NaiveDate,
    limit: i64,
) -> Result<Vec<ConceptMasteryState>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT "conceptId", "masteryLevel", "repetitionCount", "easeFactor", "intervalDays", "dueDate"
        FROM "concept_mastery_states"
        WHERE "userId" = $1
          AND "dueDate" <= $2
        ORDER BY "dueDate" ASC, "masteryLevel" ASC
        LIMIT $3
        "#,
    )
    .bind(user_id)
    .bind(today)
    .bind(limit)
    .fetch_all(proxy.pool())
    .await?;

    Ok(rows.iter().map(state_from_row).collect())
}

pub async fn mastery_overview(
    proxy: &DatabaseProxy,
    user_id: &str,
    today: NaiveDate,
) -> Result<MasteryOverview, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT COUNT(*) AS "total",
               COUNT(*) FILTER (WHERE "masteryLevel" >= $2) AS "mastered",
               COUNT(*) FILTER (WHERE "repetitionCount" = 0) AS "fresh",
               COALESCE(AVG("masteryLevel"), 0) AS "averageMastery",
               COUNT(*) FILTER (WHERE "dueDate" <= $3) AS "due"
        FROM "concept_mastery_states"
        WHERE "userId" = $1
        "#,
    )
    .bind(user_id)
    .bind(MASTERED_THRESHOLD)
    .bind(today)
    .fetch_one(proxy.pool())
    .await?;

    let total = row.try_get::<i64, _>("total").unwrap_or(0);
    let mastered = row.try_get::<i64, _>("mastered").unwrap_or(0);
    let fresh = row.try_get::<i64, _>("fresh").unwrap_or(0);

    Ok(MasteryOverview {
        total_concepts: total,
        mastered_concepts: mastered,
        learning_concepts: (total - mastered - fresh).max(0),
        new_concepts: fresh,
        average_mastery: row.try_get::<f64, _>("averageMastery").unwrap_or(0.0),
        due_count: row.try_get::<i64, _>("due").unwrap_or(0),
    })
}

async fn upsert_state(
    proxy: &DatabaseProxy,
    user_id: &str,
    state: &ConceptMasteryState,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO "concept_mastery_states"
            ("id", "userId", "conceptId", "masteryLevel", "repetitionCount",
             "easeFactor", "intervalDays", "dueDate", "updatedAt")
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW())
        ON CONFLICT ("userId", "conceptId") DO UPDATE SET
            "masteryLevel" = EXCLUDED."masteryLevel",
            "repetitionCount" = EXCLUDED."repetitionCount",
            "easeFactor" = EXCLUDED."easeFactor",
            "intervalDays" = EXCLUDED."intervalDays",
            "dueDate" = EXCLUDED."dueDate",
            "updatedAt" = NOW()
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(&state.concept_id)
    .bind(state.mastery_level)
    .bind(state.repetition_count as i32)
    .bind(state.ease_factor)
    .bind(state.interval_days as i32)
    .bind(state.due_date)
    .execute(proxy.pool())
    .await?;

    Ok(())
}

async fn insert_review_event(
    proxy: &DatabaseProxy,
    user_id: &str,
    concept_id: &str,
    response: ReviewResponse,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO "review_events"
            ("id", "userId", "conceptId", "quality", "responseTimeMs", "reviewedAt")
        VALUES ($1, $2, $3, $4, $5, NOW())
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(concept_id)
    .bind(response.quality)
    .bind(response.response_time_ms)
    .execute(proxy.pool())
    .await?;

    Ok(())
}

fn state_from_row(row: &sqlx::postgres::PgRow) -> ConceptMasteryState {
    ConceptMasteryState {
        concept_id: row.try_get::<String, _>("conceptId").unwrap_or_default(),
        mastery_level: row.try_get::<f64, _>("masteryLevel").unwrap_or(0.0),
        repetition_count: row
            .try_get::<i32, _>("repetitionCount")
            .unwrap_or(0)
            .max(0) as u32,
        ease_factor: row
            .try_get::<f64, _>("easeFactor")
            .unwrap_or(notewise_algo::DEFAULT_EASE_FACTOR),
        interval_days: row.try_get::<i32, _>("intervalDays").unwrap_or(1).max(1) as u32,
        due_date: row
            .try_get::<NaiveDate, _>("dueDate")
            .unwrap_or_else(|_| chrono::Utc::now().date_naive()),
    }
}
