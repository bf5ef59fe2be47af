use std::sync::Arc;

use tracing::{debug, info};

use crate::db::DatabaseProxy;
use crate::services::gaps;

const DEFAULT_RETENTION_DAYS: i64 = 90;

/// Gap rows are append-only; this sweep keeps the table from growing
/// without bound.
pub async fn prune_stale_gaps(db: Arc<DatabaseProxy>) -> Result<(), super::WorkerError> {
    let retention_days = std::env::var("GAP_RETENTION_DAYS")
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(DEFAULT_RETENTION_DAYS);

    let removed = gaps::prune_stale(db.pool(), retention_days).await?;

    if removed > 0 {
        info!(removed, retention_days, "Pruned stale knowledge gaps");
    } else {
        debug!(retention_days, "No stale knowledge gaps to prune");
    }

    Ok(())
}
