//! Cancellation watch
//!
//! Polls the orchestrator while a job runs and flips a watch channel once
//! the job is flagged as canceled.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, info, warn};

use crate::repository::JobRepository;

/// Spawn the watch; abort the returned handle when the job is done
pub fn spawn_cancel_watch(
    repository: Arc<dyn JobRepository>,
    job_id: String,
    interval: Duration,
) -> (watch::Receiver<bool>, JoinHandle<()>) {
    let (tx, rx) = watch::channel(false);

    let handle = tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        // the first tick fires immediately; the job was just claimed
        ticker.tick().await;

        loop {
            ticker.tick().await;

            match repository.is_canceled(&job_id).await {
                Ok(true) => {
                    info!(job_id = %job_id, "Cancellation observed");
                    let _ = tx.send(true);
                    return;
                }
                Ok(false) => debug!(job_id = %job_id, "Job not canceled"),
                Err(e) => warn!(job_id = %job_id, "Failed to check cancellation: {:#}", e),
            }
        }
    });

    (rx, handle)
}
