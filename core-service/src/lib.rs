//! Core service façade and bootstrap helpers.
//!
//! This crate wires the host-provided bridges (HTTP, secure storage,
//! settings) from a validated [`CoreConfig`] into the sync engine: the local
//! JSON stores, the GitHub snapshot store, the sync orchestrator and the
//! periodic scheduler. Desktop apps typically enable the `desktop-shims`
//! feature so `CoreConfig` fills in the `bridge-desktop` adapters.
//!
//! ## Usage
//!
//! ```ignore
//! let config = CoreConfig::builder().data_dir(app_dir).build()?;
//! let service = SyncService::new(config).await?;
//!
//! service.sign_in("ghp_...", Some("octocat")).await?;
//! service.configure_remote(&RemoteCoordinates::new("octocat", "music")).await?;
//! let report = service.sync_now().await?;
//! println!("{}", report.message());
//! ```

pub mod error;

pub use error::{CoreError, Result};

pub use bridge_traits::RemoteCoordinates;
pub use core_runtime::config::{CoreConfig, FeatureFlags};
pub use core_runtime::events::{CoreEvent, EventBus};
pub use core_sync::{SyncError, SyncOutcome, SyncReport, SyncTrigger};

use bridge_traits::{Clock, RemoteSnapshotStore};
use core_auth::{CredentialStore, SyncCredential};
use core_library::LocalLibrary;
use core_runtime::events::AuthEvent;
use core_runtime::logging::{redact_if_sensitive, strip_path};
use core_sync::{BridgeSyncConfigStore, SyncConfigStore, SyncOrchestrator, SyncScheduler};
use provider_github::GitHubSnapshotStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::Receiver;
use tokio::sync::Mutex;
use tracing::{debug, info};

const EVENT_BUS_CAPACITY: usize = 256;

/// Primary façade exposed to host applications.
pub struct SyncService {
    config_store: Arc<BridgeSyncConfigStore>,
    orchestrator: Arc<SyncOrchestrator>,
    event_bus: EventBus,
    clock: Arc<dyn Clock>,
    sync_interval: Duration,
    features: FeatureFlags,
    scheduler: Mutex<Option<SyncScheduler>>,
}

impl SyncService {
    /// Build the service against GitHub.
    ///
    /// Starts periodic sync right away when the config enables it, so this
    /// must run inside a tokio runtime.
    pub async fn new(config: CoreConfig) -> Result<Self> {
        config.validate()?;
        let remote = GitHubSnapshotStore::new(Arc::clone(&config.http_client))
            .with_api_base(config.github_api_base.clone());
        Self::with_remote_store(config, Arc::new(remote)).await
    }

    /// Build the service against any remote snapshot store.
    pub async fn with_remote_store(
        config: CoreConfig,
        remote: Arc<dyn RemoteSnapshotStore>,
    ) -> Result<Self> {
        config.validate()?;

        let library = LocalLibrary::open(config.data_dir.clone());
        library
            .ensure_system_playlist(config.clock.unix_timestamp_millis())
            .await?;

        let config_store = Arc::new(BridgeSyncConfigStore::new(
            CredentialStore::new(Arc::clone(&config.secure_store)),
            Arc::clone(&config.settings_store),
        ));
        let event_bus = EventBus::new(EVENT_BUS_CAPACITY);
        let orchestrator = SyncOrchestrator::new(
            config_store.clone(),
            remote,
            library,
            event_bus.clone(),
            config.device_name.clone(),
        )
        .with_clock(Arc::clone(&config.clock));

        let service = Self {
            config_store,
            orchestrator: Arc::new(orchestrator),
            event_bus,
            clock: Arc::clone(&config.clock),
            sync_interval: config.sync_interval,
            features: config.features,
            scheduler: Mutex::new(None),
        };

        if service.features.enable_periodic_sync {
            service.start_periodic_sync().await;
        }

        info!(
            device_name = %config.device_name,
            data_dir = strip_path(&config.data_dir.to_string_lossy()),
            periodic = service.features.enable_periodic_sync,
            "Sync service ready"
        );
        Ok(service)
    }

    pub fn library(&self) -> &LocalLibrary {
        self.orchestrator.library()
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn subscribe_events(&self) -> Receiver<CoreEvent> {
        self.event_bus.subscribe()
    }

    // ------------------------------------------------------------------
    // Credentials and remote
    // ------------------------------------------------------------------

    /// Store the access token used for the remote snapshot.
    ///
    /// Restarts periodic sync when the config enables it, since
    /// [`sign_out`](Self::sign_out) stops it.
    pub async fn sign_in(&self, token: &str, account: Option<&str>) -> Result<()> {
        if token.trim().is_empty() {
            return Err(CoreError::InvalidInput {
                field: "token".to_string(),
                message: "Access token cannot be blank".to_string(),
            });
        }

        let mut credential = SyncCredential::new(token.trim(), self.clock.unix_timestamp_millis());
        if let Some(account) = account {
            credential = credential.with_account(account);
        }
        self.config_store.store_credential(&credential).await?;
        info!(
            account = %redact_if_sensitive("account", account.unwrap_or("")),
            "Signed in to sync"
        );

        self.event_bus
            .emit(CoreEvent::Auth(AuthEvent::CredentialStored {
                account: account.map(str::to_string),
            }))
            .ok();

        if self.features.enable_periodic_sync && self.start_periodic_sync().await {
            debug!("Periodic sync restarted after sign-in");
        }
        Ok(())
    }

    /// Erase the credential and stop periodic sync.
    pub async fn sign_out(&self) -> Result<()> {
        self.stop_periodic_sync().await;
        self.config_store.clear_credential().await?;

        self.event_bus
            .emit(CoreEvent::Auth(AuthEvent::CredentialCleared {
                reason: "sign_out".to_string(),
            }))
            .ok();
        info!("Signed out of sync");
        Ok(())
    }

    /// Point sync at a repository file. Forgets the last version token.
    pub async fn configure_remote(&self, coordinates: &RemoteCoordinates) -> Result<()> {
        if !coordinates.is_complete() {
            return Err(CoreError::InvalidInput {
                field: "remote".to_string(),
                message: format!("Owner, repository and path are required, got {}", coordinates),
            });
        }
        self.config_store.configure_remote(coordinates).await?;
        Ok(())
    }

    pub async fn remote_coordinates(&self) -> Result<Option<RemoteCoordinates>> {
        Ok(self.config_store.get_remote_coordinates().await?)
    }

    /// Both a credential and a remote are stored.
    pub async fn is_configured(&self) -> Result<bool> {
        Ok(self.config_store.has_credential().await?
            && self.config_store.get_remote_coordinates().await?.is_some())
    }

    /// Epoch millis of the last successful sync.
    pub async fn last_sync_time(&self) -> Result<Option<i64>> {
        Ok(self.config_store.last_sync_time().await?)
    }

    // ------------------------------------------------------------------
    // Sync triggers
    // ------------------------------------------------------------------

    pub async fn sync_now(&self) -> Result<SyncReport> {
        Ok(self
            .orchestrator
            .perform_sync_triggered(SyncTrigger::Manual)
            .await?)
    }

    /// Host callback for the app returning to the foreground.
    ///
    /// Returns `Ok(None)` when resume sync is disabled or sync is not set
    /// up yet, so an unconfigured app stays quiet.
    pub async fn on_app_resumed(&self) -> Result<Option<SyncReport>> {
        if !self.features.sync_on_resume {
            return Ok(None);
        }
        if !self.is_configured().await? {
            debug!("Sync not configured, skipping resume sync");
            return Ok(None);
        }

        let report = self
            .orchestrator
            .perform_sync_triggered(SyncTrigger::AppResume)
            .await?;
        Ok(Some(report))
    }

    /// Start the periodic scheduler. Returns `false` if it already runs.
    pub async fn start_periodic_sync(&self) -> bool {
        let mut scheduler = self.scheduler.lock().await;
        if scheduler.as_ref().is_some_and(SyncScheduler::is_running) {
            return false;
        }
        *scheduler = Some(SyncScheduler::spawn(
            Arc::clone(&self.orchestrator),
            self.sync_interval,
        ));
        true
    }

    /// Stop the scheduler, waiting for an in-flight periodic sync.
    pub async fn stop_periodic_sync(&self) {
        let scheduler = self.scheduler.lock().await.take();
        if let Some(scheduler) = scheduler {
            scheduler.stop().await;
        }
    }

    pub async fn is_periodic_sync_running(&self) -> bool {
        self.scheduler
            .lock()
            .await
            .as_ref()
            .is_some_and(SyncScheduler::is_running)
    }

    // ------------------------------------------------------------------
    // Library
    // ------------------------------------------------------------------

    /// Delete a playlist here and propagate the deletion on the next sync.
    pub async fn delete_playlist(&self, id: i64) -> Result<bool> {
        Ok(self.library().delete_playlist(id).await?)
    }

    pub async fn shutdown(&self) {
        self.stop_periodic_sync().await;
        info!("Sync service shut down");
    }
}
