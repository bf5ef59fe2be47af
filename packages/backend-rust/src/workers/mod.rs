mod gap_retention;
mod review_digest;

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};
use tracing::{error, info};

use crate::db::DatabaseProxy;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("scheduler error: {0}")]
    Scheduler(#[from] JobSchedulerError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub struct WorkerManager {
    scheduler: Mutex<JobScheduler>,
    db_proxy: Arc<DatabaseProxy>,
}

impl WorkerManager {
    pub async fn new(db_proxy: Arc<DatabaseProxy>) -> Result<Self, WorkerError> {
        let scheduler = JobScheduler::new().await?;
        Ok(Self {
            scheduler: Mutex::new(scheduler),
            db_proxy,
        })
    }

    pub async fn start(&self) -> Result<(), WorkerError> {
        let leader = std::env::var("WORKER_LEADER")
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false);

        if !leader {
            info!("WORKER_LEADER not set, skipping worker startup");
            return Ok(());
        }

        info!("Starting workers (leader mode)");

        let enable_digest = env_flag("ENABLE_REVIEW_DIGEST_WORKER", true);
        let enable_retention = env_flag("ENABLE_GAP_RETENTION_WORKER", true);

        let scheduler = self.scheduler.lock().await;

        if enable_digest {
            let db = Arc::clone(&self.db_proxy);
            let schedule = std::env::var("REVIEW_DIGEST_CRON")
                .unwrap_or_else(|_| "0 0 6 * * *".to_string());
            let job = Job::new_async(schedule.as_str(), move |_uuid, _scheduler| {
                let db = Arc::clone(&db);
                Box::pin(async move {
                    if let Err(e) = review_digest::scan_due_reviews(db).await {
                        error!(error = %e, "review digest scan failed");
                    }
                })
            })?;
            scheduler.add(job).await?;
            info!(schedule = %schedule, "review digest worker scheduled");
        }

        if enable_retention {
            let db = Arc::clone(&self.db_proxy);
            let schedule = std::env::var("GAP_RETENTION_CRON")
                .unwrap_or_else(|_| "0 30 6 * * *".to_string());
            let job = Job::new_async(schedule.as_str(), move |_uuid, _scheduler| {
                let db = Arc::clone(&db);
                Box::pin(async move {
                    if let Err(e) = gap_retention::prune_stale_gaps(db).await {
                        error!(error = %e, "gap retention sweep failed");
                    }
                })
            })?;
            scheduler.add(job).await?;
            info!(schedule = %schedule, "gap retention worker scheduled");
        }

        scheduler.start().await?;
        Ok(())
    }

    pub async fn stop(&self) {
        let mut scheduler = self.scheduler.lock().await;
        if let Err(e) = scheduler.shutdown().await {
            error!(error = %e, "scheduler shutdown failed");
        }
        info!("Workers stopped");
    }
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v != "false" && v != "0")
        .unwrap_or(default)
}
