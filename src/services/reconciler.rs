use std::time::Duration;

use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::db::repository;
use crate::error::AppError;

/// Periodically recomputes `enrolled_count` from the enrollment rows so
/// counters left inconsistent by earlier data converge again.
pub struct CounterReconciler {
    db: SqlitePool,
    interval: Duration,
}

impl CounterReconciler {
    pub fn new(db: SqlitePool, interval_secs: u64) -> Self {
        Self {
            db,
            interval: Duration::from_secs(interval_secs),
        }
    }

    /// One reconciliation pass. Returns how many counters were corrected.
    pub async fn run_once(&self) -> Result<u64, AppError> {
        let fixed = repository::reconcile_enrolled_counts(&self.db).await?;
        if fixed > 0 {
            warn!("Repaired enrolled_count on {} course(s)", fixed);
        } else {
            debug!("Enrollment counters consistent");
        }
        Ok(fixed)
    }

    /// Runs forever; a failed pass is logged and retried on the next tick.
    pub async fn start(self) {
        info!("Starting counter reconciler (interval: {:?})", self.interval);

        loop {
            tokio::time::sleep(self.interval).await;

            if let Err(e) = self.run_once().await {
                warn!("Counter reconciliation failed: {:?}", e);
            }
        }
    }
}
