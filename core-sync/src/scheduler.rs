//! Periodic sync driver.
//!
//! Ticks on a tokio interval and runs a [`SyncTrigger::Periodic`] sync on
//! each tick until cancelled. A tick that lands while another sync runs
//! falls into the orchestrator's skip path. Cancellation takes effect
//! between syncs, never in the middle of one.

use crate::orchestrator::{SyncOrchestrator, SyncTrigger};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct SyncScheduler {
    cancellation_token: CancellationToken,
    handle: Option<JoinHandle<()>>,
    interval: Duration,
}

impl SyncScheduler {
    /// Start ticking. The first sync runs one `interval` from now.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(orchestrator: Arc<SyncOrchestrator>, interval: Duration) -> Self {
        let cancellation_token = CancellationToken::new();
        let token = cancellation_token.clone();

        let handle = tokio::spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut ticker = tokio::time::interval_at(start, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        match orchestrator.perform_sync_triggered(SyncTrigger::Periodic).await {
                            Ok(report) => debug!(message = %report.message(), "Periodic sync finished"),
                            Err(e) => warn!(error = %e, "Periodic sync failed"),
                        }
                    }
                }
            }

            debug!("Sync scheduler loop exited");
        });

        info!(interval_secs = interval.as_secs(), "Periodic sync scheduled");
        Self {
            cancellation_token,
            handle: Some(handle),
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stop ticking and wait for an in-flight sync to finish.
    pub async fn stop(mut self) {
        self.cancellation_token.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "Sync scheduler task ended abnormally");
            }
        }
        info!("Periodic sync stopped");
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        self.cancellation_token.cancel();
    }
}
