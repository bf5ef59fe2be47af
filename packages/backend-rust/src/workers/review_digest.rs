use std::sync::Arc;
use std::time::Instant;

use sqlx::Row;
use tracing::info;

use crate::db::DatabaseProxy;

#[derive(Debug, Default)]
struct DigestStats {
    users_scanned: i64,
    concepts_due: i64,
    duration_secs: f64,
}

/// Log a per-user digest of concepts that are due for review. Downstream
/// notification delivery consumes these log lines; the backend itself does
/// not send anything.
pub async fn scan_due_reviews(db: Arc<DatabaseProxy>) -> Result<(), super::WorkerError> {
    let start = Instant::now();
    info!("Starting due-review digest scan");

    let rows = sqlx::query(
        r#"
        SELECT "userId", COUNT(*) AS "dueCount"
        FROM "concept_mastery_states"
        WHERE "dueDate" <= CURRENT_DATE
        GROUP BY "userId"
        ORDER BY "dueCount" DESC
        "#,
    )
    .fetch_all(db.pool())
    .await?;

    let mut stats = DigestStats::default();
    for row in rows {
        let user_id = row.try_get::<String, _>("userId").unwrap_or_default();
        let due_count = row.try_get::<i64, _>("dueCount").unwrap_or(0);
        stats.users_scanned += 1;
        stats.concepts_due += due_count;
        info!(user_id = %user_id, due_count, "review digest");
    }

    stats.duration_secs = start.elapsed().as_secs_f64();

    info!(
        users_scanned = stats.users_scanned,
        concepts_due = stats.concepts_due,
        duration_secs = format!("{:.2}", stats.duration_secs),
        "Due-review digest scan completed"
    );

    Ok(())
}
