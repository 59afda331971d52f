//! # Sync Configuration Store
//!
//! Credential, remote coordinates and sync bookkeeping as seen by the
//! orchestrator.
//!
//! [`BridgeSyncConfigStore`] keeps the credential in the host
//! [`SecureStore`](bridge_traits::SecureStore) through a
//! [`CredentialStore`] and everything else in the
//! [`SettingsStore`] under `sync.*` keys.

use crate::error::Result;
use async_trait::async_trait;
use bridge_traits::{RemoteCoordinates, SettingsStore};
use core_auth::{AuthError, CredentialStore, SyncCredential};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const KEY_REMOTE_OWNER: &str = "sync.remote.owner";
pub const KEY_REMOTE_REPO: &str = "sync.remote.repo";
pub const KEY_REMOTE_PATH: &str = "sync.remote.path";
pub const KEY_REMOTE_BRANCH: &str = "sync.remote.branch";
pub const KEY_LAST_VERSION_TOKEN: &str = "sync.last_version_token";
pub const KEY_LAST_SYNC_TIME: &str = "sync.last_sync_time";
pub const KEY_DEVICE_ID: &str = "sync.device_id";

#[async_trait]
pub trait SyncConfigStore: Send + Sync {
    /// The remote-store access token, if one is stored.
    async fn get_credential(&self) -> Result<Option<String>>;

    /// Coordinates of the remote snapshot, if fully configured.
    async fn get_remote_coordinates(&self) -> Result<Option<RemoteCoordinates>>;

    /// Erase the credential. Called when the remote rejects it.
    async fn clear_credential(&self) -> Result<()>;

    async fn get_last_version_token(&self) -> Result<Option<String>>;

    async fn save_last_version_token(&self, token: &str) -> Result<()>;

    async fn save_last_sync_time(&self, timestamp: i64) -> Result<()>;

    /// Persist the observed version token and the sync time as one unit.
    ///
    /// Only called once a sync has succeeded, so a stored token always
    /// names a revision this device fully reconciled with.
    async fn commit_sync(&self, token: &str, timestamp: i64) -> Result<()> {
        self.save_last_version_token(token).await?;
        self.save_last_sync_time(timestamp).await
    }

    /// Stable per-installation identifier.
    async fn device_id(&self) -> Result<String>;
}

pub struct BridgeSyncConfigStore {
    credentials: CredentialStore,
    settings: Arc<dyn SettingsStore>,
}

impl BridgeSyncConfigStore {
    pub fn new(credentials: CredentialStore, settings: Arc<dyn SettingsStore>) -> Self {
        Self {
            credentials,
            settings,
        }
    }

    /// Save where the snapshot lives. An unset branch clears any stored one.
    pub async fn configure_remote(&self, coordinates: &RemoteCoordinates) -> Result<()> {
        self.settings
            .set_string(KEY_REMOTE_OWNER, coordinates.owner.trim())
            .await?;
        self.settings
            .set_string(KEY_REMOTE_REPO, coordinates.repo.trim())
            .await?;
        self.settings
            .set_string(KEY_REMOTE_PATH, coordinates.path.trim())
            .await?;
        match &coordinates.branch {
            Some(branch) => self.settings.set_string(KEY_REMOTE_BRANCH, branch).await?,
            None => self.settings.delete(KEY_REMOTE_BRANCH).await?,
        }

        // A different remote means the old token describes nothing we know.
        self.settings.delete(KEY_LAST_VERSION_TOKEN).await?;

        info!(remote = %coordinates, "Sync remote configured");
        Ok(())
    }

    pub async fn store_credential(&self, credential: &SyncCredential) -> Result<()> {
        self.credentials.store(credential).await?;
        Ok(())
    }

    pub async fn has_credential(&self) -> Result<bool> {
        Ok(self.credentials.has_credential().await?)
    }

    pub async fn last_sync_time(&self) -> Result<Option<i64>> {
        let value = self.settings.get_string(KEY_LAST_SYNC_TIME).await?;
        Ok(value.and_then(|v| v.parse().ok()))
    }
}

#[async_trait]
impl SyncConfigStore for BridgeSyncConfigStore {
    async fn get_credential(&self) -> Result<Option<String>> {
        match self.credentials.retrieve().await {
            Ok(credential) => Ok(credential.map(|c| c.token().to_string())),
            Err(AuthError::CredentialCorrupted { reason }) => {
                warn!(%reason, "Stored sync credential was unreadable and has been erased");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_remote_coordinates(&self) -> Result<Option<RemoteCoordinates>> {
        let owner = self.settings.get_string(KEY_REMOTE_OWNER).await?;
        let repo = self.settings.get_string(KEY_REMOTE_REPO).await?;
        let (Some(owner), Some(repo)) = (owner, repo) else {
            debug!("Sync remote not configured");
            return Ok(None);
        };

        let mut coordinates = RemoteCoordinates::new(owner, repo);
        if let Some(path) = self
            .settings
            .get_string(KEY_REMOTE_PATH)
            .await?
            .filter(|p| !p.trim().is_empty())
        {
            coordinates = coordinates.with_path(path);
        }
        if let Some(branch) = self
            .settings
            .get_string(KEY_REMOTE_BRANCH)
            .await?
            .filter(|b| !b.trim().is_empty())
        {
            coordinates = coordinates.with_branch(branch);
        }

        Ok(coordinates.is_complete().then_some(coordinates))
    }

    async fn clear_credential(&self) -> Result<()> {
        self.credentials.clear().await?;
        Ok(())
    }

    async fn get_last_version_token(&self) -> Result<Option<String>> {
        Ok(self.settings.get_string(KEY_LAST_VERSION_TOKEN).await?)
    }

    async fn save_last_version_token(&self, token: &str) -> Result<()> {
        self.settings
            .set_string(KEY_LAST_VERSION_TOKEN, token)
            .await?;
        Ok(())
    }

    async fn save_last_sync_time(&self, timestamp: i64) -> Result<()> {
        self.settings
            .set_string(KEY_LAST_SYNC_TIME, &timestamp.to_string())
            .await?;
        Ok(())
    }

    async fn commit_sync(&self, token: &str, timestamp: i64) -> Result<()> {
        let mut tx = self.settings.begin_transaction().await?;
        tx.set_string(KEY_LAST_VERSION_TOKEN, token).await?;
        tx.set_string(KEY_LAST_SYNC_TIME, &timestamp.to_string())
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn device_id(&self) -> Result<String> {
        if let Some(id) = self
            .settings
            .get_string(KEY_DEVICE_ID)
            .await?
            .filter(|id| !id.is_empty())
        {
            return Ok(id);
        }

        let id = uuid::Uuid::new_v4().to_string();
        self.settings.set_string(KEY_DEVICE_ID, &id).await?;
        info!(device_id = %id, "Generated sync device id");
        Ok(id)
    }
}
