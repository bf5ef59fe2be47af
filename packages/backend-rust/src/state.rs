use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime};

use crate::db::DatabaseProxy;
use crate::services::extraction::ExtractionClient;
use crate::services::review::ReviewLockRegistry;

#[derive(Debug)]
pub struct RuntimeConfig {
    pub llm_enabled: AtomicBool,
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        let llm_enabled = std::env::var("LLM_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);
        Self {
            llm_enabled: AtomicBool::new(llm_enabled),
        }
    }

    pub fn is_llm_enabled(&self) -> bool {
        self.llm_enabled.load(Ordering::Relaxed)
    }
}

#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    started_at_system: SystemTime,
    db_proxy: Option<Arc<DatabaseProxy>>,
    extractor: Arc<ExtractionClient>,
    review_locks: Arc<ReviewLockRegistry>,
    runtime: Arc<RuntimeConfig>,
}

impl AppState {
    pub fn new(db_proxy: Option<Arc<DatabaseProxy>>) -> Self {
        Self {
            started_at: Instant::now(),
            started_at_system: SystemTime::now(),
            db_proxy,
            extractor: Arc::new(ExtractionClient::from_env()),
            review_locks: Arc::new(ReviewLockRegistry::new()),
            runtime: Arc::new(RuntimeConfig::from_env()),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn started_at_system(&self) -> SystemTime {
        self.started_at_system
    }

    pub fn db_proxy(&self) -> Option<Arc<DatabaseProxy>> {
        self.db_proxy.clone()
    }

    pub fn extractor(&self) -> Arc<ExtractionClient> {
        Arc::clone(&self.extractor)
    }

    pub fn review_locks(&self) -> Arc<ReviewLockRegistry> {
        Arc::clone(&self.review_locks)
    }

    pub fn runtime(&self) -> Arc<RuntimeConfig> {
        Arc::clone(&self.runtime)
    }
}
