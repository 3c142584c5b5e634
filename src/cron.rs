use crate::config::AccountsConfig;
use crate::errors::AccountsError;
use crate::storage::Storage;
use chrono::Utc;
use std::sync::Arc;
use tokio::time::{self, Duration};
use tracing::{error, info, instrument};

/// Periodic sweep of records nothing will ever read again: expired
/// verification codes and rate-limit windows past the retention horizon.
/// The horizon is fixed and independent of any key's own window length.
pub struct CleanupService {
    storage: Arc<dyn Storage>,
    retention_seconds: u64,
}

impl CleanupService {
    pub fn new(storage: Arc<dyn Storage>, config: &AccountsConfig) -> Self {
        Self {
            storage,
            retention_seconds: config.rate_limit_retention_seconds,
        }
    }

    #[instrument(skip(self))]
    pub async fn run_cleanup(&self) -> Result<(), AccountsError> {
        let now = Utc::now();

        let expired_codes = self.storage.purge_expired_verifications(now).await?;
        let cutoff = now - chrono::Duration::seconds(self.retention_seconds as i64);
        let stale_windows = self.storage.purge_rate_limits(cutoff).await?;

        info!(expired_codes, stale_windows, "cleanup pass finished");
        Ok(())
    }

    /// Starts a background scheduler that runs the cleanup every `interval`.
    /// This consumes the service instance as it runs forever.
    pub async fn start_scheduler(self: Arc<Self>, interval: Duration) {
        let mut timer = time::interval(interval);

        info!("Cleanup scheduler started with interval: {:?}", interval);

        loop {
            timer.tick().await;

            // Spawn the job as a separate task so the timer doesn't drift if the job is slow
            let service = self.clone();
            tokio::spawn(async move {
                if let Err(e) = service.run_cleanup().await {
                    error!("Cleanup job failed: {:?}", e);
                }
            });
        }
    }
}
