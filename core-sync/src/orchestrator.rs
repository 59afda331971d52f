//! # Sync Orchestrator
//!
//! Sequences one sync pass and owns the single-sync-at-a-time guard.
//!
//! ## Workflow
//!
//! 1. Try to take the sync lock; if another sync holds it, report
//!    [`SyncReport::AlreadyInProgress`] and return immediately
//! 2. Load credential and remote coordinates, fail with `NotConfigured`
//!    if either is missing
//! 3. Build the local snapshot, tombstones for pending deletions included
//! 4. Fetch the remote snapshot. Not-found or empty means first sync: upload
//!    the local snapshot as-is and stop
//! 5. Parse it. Corrupt content fails the sync with nothing mutated
//! 6. Compare the fetched version token with the last recorded one
//! 7. Merge
//! 8. Apply the merged snapshot to the local stores
//! 9. Skip the upload when nothing changed remotely and the merged snapshot
//!    is equivalent to the remote one
//! 10. Upload with the fetched token as precondition
//! 11. Commit the new token and sync time, clear pending deletions
//!
//! A rejected credential is erased before the error is returned, so the
//! next attempt fails fast as `NotConfigured` until the user signs in
//! again. Nothing else is mutated on failure, and local changes applied in
//! step 8 are not rolled back if the upload fails; the next pass
//! reconciles them.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let orchestrator = SyncOrchestrator::new(config_store, remote, library, event_bus, "Laptop");
//! match orchestrator.perform_sync().await {
//!     Ok(report) => println!("{}", report.message()),
//!     Err(e) => eprintln!("Sync failed: {}", e),
//! }
//! ```

use crate::config_store::SyncConfigStore;
use crate::diff::snapshots_equivalent;
use crate::error::{Result, SyncError};
use crate::local::LocalStateAdapter;
use crate::merge::merge;
use crate::model::{ChangeLogEntry, SyncSnapshot, CHANGE_LOG_CAP};
use crate::outcome::SyncOutcome;
use bridge_traits::{Clock, RemoteCoordinates, RemoteSnapshotStore, RemoteStoreError, SystemClock};
use core_library::LocalLibrary;
use core_runtime::events::{AuthEvent, CoreEvent, EventBus, SyncEvent};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// What asked for a sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncTrigger {
    Manual,
    Periodic,
    AppResume,
}

impl SyncTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncTrigger::Manual => "manual",
            SyncTrigger::Periodic => "periodic",
            SyncTrigger::AppResume => "app_resume",
        }
    }
}

impl fmt::Display for SyncTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Successful end of a sync attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncReport {
    /// Another sync held the lock. Nothing was done.
    AlreadyInProgress,

    /// The remote had no snapshot; the local one was uploaded as-is.
    InitialUpload {
        version_token: String,
        playlists: usize,
    },

    /// A full merge pass ran.
    Synced {
        outcome: SyncOutcome,
        /// False when the remote already matched and the upload was skipped.
        uploaded: bool,
        version_token: String,
    },
}

impl SyncReport {
    pub fn outcome(&self) -> Option<&SyncOutcome> {
        match self {
            SyncReport::Synced { outcome, .. } => Some(outcome),
            _ => None,
        }
    }

    pub fn uploaded(&self) -> bool {
        match self {
            SyncReport::AlreadyInProgress => false,
            SyncReport::InitialUpload { .. } => true,
            SyncReport::Synced { uploaded, .. } => *uploaded,
        }
    }

    /// User-facing text for this result.
    pub fn message(&self) -> String {
        match self {
            SyncReport::AlreadyInProgress => "A sync is already in progress".to_string(),
            SyncReport::InitialUpload { playlists, .. } => format!(
                "First sync: uploaded {} playlist{} from this device",
                playlists,
                if *playlists == 1 { "" } else { "s" }
            ),
            SyncReport::Synced {
                outcome, uploaded, ..
            } => {
                if !outcome.has_changes() && !uploaded {
                    "Everything is already up to date".to_string()
                } else {
                    format!("Sync complete: {}", outcome.summary())
                }
            }
        }
    }
}

pub struct SyncOrchestrator {
    config_store: Arc<dyn SyncConfigStore>,
    remote: Arc<dyn RemoteSnapshotStore>,
    local: LocalStateAdapter,
    event_bus: EventBus,
    clock: Arc<dyn Clock>,
    device_name: String,
    sync_lock: Mutex<()>,
}

impl SyncOrchestrator {
    pub fn new(
        config_store: Arc<dyn SyncConfigStore>,
        remote: Arc<dyn RemoteSnapshotStore>,
        library: LocalLibrary,
        event_bus: EventBus,
        device_name: impl Into<String>,
    ) -> Self {
        Self {
            config_store,
            remote,
            local: LocalStateAdapter::new(library, event_bus.clone()),
            event_bus,
            clock: Arc::new(SystemClock),
            device_name: device_name.into(),
            sync_lock: Mutex::new(()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn library(&self) -> &LocalLibrary {
        self.local.library()
    }

    /// Whether a sync currently holds the lock.
    pub fn is_syncing(&self) -> bool {
        self.sync_lock.try_lock().is_err()
    }

    /// Run a manually triggered sync.
    pub async fn perform_sync(&self) -> Result<SyncReport> {
        self.perform_sync_triggered(SyncTrigger::Manual).await
    }

    /// Run one sync pass.
    ///
    /// Safe to call from several triggers at once: a call that finds another
    /// sync running returns [`SyncReport::AlreadyInProgress`] without
    /// waiting.
    ///
    /// # Errors
    ///
    /// Every failure of the pass is returned as a [`SyncError`]. On
    /// [`SyncError::CredentialExpired`] the stored credential has already
    /// been erased.
    #[instrument(skip_all, fields(trigger = %trigger))]
    pub async fn perform_sync_triggered(&self, trigger: SyncTrigger) -> Result<SyncReport> {
        let Ok(_guard) = self.sync_lock.try_lock() else {
            info!("Sync already in progress, skipping");
            self.event_bus
                .emit(CoreEvent::Sync(SyncEvent::Skipped {
                    trigger: trigger.to_string(),
                    reason: "already_in_progress".to_string(),
                }))
                .ok();
            return Ok(SyncReport::AlreadyInProgress);
        };

        let sync_id = Uuid::new_v4().to_string();
        let started = Instant::now();
        info!(%sync_id, "Sync started");
        self.event_bus
            .emit(CoreEvent::Sync(SyncEvent::Started {
                sync_id: sync_id.clone(),
                trigger: trigger.to_string(),
            }))
            .ok();

        let result = self.run().await;

        match &result {
            Ok(report) => {
                let outcome = report.outcome().cloned().unwrap_or_default();
                let duration_ms = started.elapsed().as_millis() as u64;
                info!(
                    %sync_id,
                    uploaded = report.uploaded(),
                    summary = %outcome.summary(),
                    duration_ms,
                    "Sync completed"
                );
                self.event_bus
                    .emit(CoreEvent::Sync(SyncEvent::Completed {
                        sync_id,
                        playlists_added: outcome.playlists_added as u64,
                        playlists_updated: outcome.playlists_updated as u64,
                        playlists_deleted: outcome.playlists_deleted as u64,
                        songs_added: outcome.songs_added as u64,
                        songs_removed: outcome.songs_removed as u64,
                        conflicts: outcome.conflicts.len() as u64,
                        uploaded: report.uploaded(),
                        duration_ms,
                    }))
                    .ok();
            }
            Err(e) => {
                if matches!(e, SyncError::CredentialExpired(_)) {
                    self.invalidate_credential().await;
                }
                warn!(%sync_id, kind = e.kind(), error = %e, "Sync failed");
                self.event_bus
                    .emit(CoreEvent::Sync(SyncEvent::Failed {
                        sync_id,
                        kind: e.kind().to_string(),
                        message: e.to_string(),
                        recoverable: e.is_recoverable(),
                    }))
                    .ok();
            }
        }

        result
    }

    async fn run(&self) -> Result<SyncReport> {
        let credential = self
            .config_store
            .get_credential()
            .await?
            .ok_or_else(|| SyncError::NotConfigured("no sync credential stored".to_string()))?;
        let coordinates = self
            .config_store
            .get_remote_coordinates()
            .await?
            .ok_or_else(|| {
                SyncError::NotConfigured("remote repository is not configured".to_string())
            })?;

        let device_id = self.config_store.device_id().await?;
        let now = self.clock.unix_timestamp_millis();
        let local = self
            .local
            .build_snapshot(&device_id, &self.device_name, now)
            .await?;

        let fetched = match self.remote.fetch(&credential, &coordinates).await {
            Ok(snapshot) => snapshot,
            Err(RemoteStoreError::NotFound) => {
                info!(remote = %coordinates, "No remote snapshot yet, uploading local state");
                return self
                    .initial_upload(&credential, &coordinates, &local, None, now)
                    .await;
            }
            Err(e) => return Err(SyncError::from_fetch(e)),
        };

        if fetched.content.trim().is_empty() {
            info!(remote = %coordinates, "Remote snapshot is empty, uploading local state");
            return self
                .initial_upload(
                    &credential,
                    &coordinates,
                    &local,
                    Some(&fetched.version_token),
                    now,
                )
                .await;
        }

        let remote = SyncSnapshot::from_json(&fetched.content).map_err(|e| {
            error!(
                remote = %coordinates,
                content_length = fetched.content.len(),
                error = %e,
                "Remote snapshot could not be parsed, local data left untouched"
            );
            SyncError::RemoteContentCorrupt {
                reason: e.to_string(),
            }
        })?;

        let last_token = self.config_store.get_last_version_token().await?;
        let remote_has_changed = last_token.as_deref() != Some(fetched.version_token.as_str());
        debug!(
            remote_has_changed,
            remote_device = %remote.device_id,
            "Fetched remote snapshot"
        );

        let (mut merged, outcome) = merge(&local, &remote, remote_has_changed);
        for conflict in &outcome.conflicts {
            info!(
                playlist_id = conflict.playlist_id,
                resolution = %conflict.resolution,
                "{}",
                conflict.description
            );
        }

        self.local.apply(&merged, remote_has_changed, now).await?;

        if !remote_has_changed && snapshots_equivalent(&merged, &remote) {
            info!("Remote already up to date, skipping upload");
            self.record_success(&fetched.version_token, now, &local.tombstone_ids()).await?;
            return Ok(SyncReport::Synced {
                outcome,
                uploaded: false,
                version_token: fetched.version_token,
            });
        }

        merged.change_log.retain(|entry| entry.timestamp != now);
        merged
            .change_log
            .insert(0, ChangeLogEntry::sync(now, &device_id, outcome.summary()));
        merged.change_log.truncate(CHANGE_LOG_CAP);

        let content = merged
            .to_json()
            .map_err(|e| SyncError::Serialization(e.to_string()))?;
        let version_token = self
            .remote
            .upload(
                &credential,
                &coordinates,
                &content,
                Some(&fetched.version_token),
            )
            .await
            .map_err(SyncError::from_upload)?;

        self.record_success(&version_token, now, &local.tombstone_ids()).await?;
        Ok(SyncReport::Synced {
            outcome,
            uploaded: true,
            version_token,
        })
    }

    async fn initial_upload(
        &self,
        credential: &str,
        coordinates: &RemoteCoordinates,
        local: &SyncSnapshot,
        expected_version: Option<&str>,
        now: i64,
    ) -> Result<SyncReport> {
        let content = local
            .to_json()
            .map_err(|e| SyncError::Serialization(e.to_string()))?;
        let version_token = self
            .remote
            .upload(credential, coordinates, &content, expected_version)
            .await
            .map_err(SyncError::from_upload)?;

        self.record_success(&version_token, now, &local.tombstone_ids()).await?;
        Ok(SyncReport::InitialUpload {
            version_token,
            playlists: local.live_playlists().count(),
        })
    }

    /// Commit the new version and forget the deletions whose tombstones the
    /// remote now holds.
    async fn record_success(
        &self,
        version_token: &str,
        now: i64,
        tombstoned: &BTreeSet<i64>,
    ) -> Result<()> {
        self.config_store.commit_sync(version_token, now).await?;
        self.library().pending_deletions.remove_all(tombstoned).await?;
        Ok(())
    }

    async fn invalidate_credential(&self) {
        match self.config_store.clear_credential().await {
            Ok(()) => {
                warn!("Remote rejected the sync credential, cleared it");
                self.event_bus
                    .emit(CoreEvent::Auth(AuthEvent::CredentialCleared {
                        reason: "expired".to_string(),
                    }))
                    .ok();
            }
            Err(e) => error!(error = %e, "Failed to clear rejected sync credential"),
        }
    }
}
