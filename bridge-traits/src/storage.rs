//! Credential and Settings Storage Abstractions
//!
//! The sync core keeps two kinds of host state: the remote-store credential,
//! which belongs in the platform secret store, and plain bookkeeping (remote
//! coordinates, last version token, last sync time) in a settings store.

use async_trait::async_trait;

use crate::error::Result;

/// Platform secret storage (Keychain, Credential Manager, Secret Service).
///
/// Implementations must never log stored values.
///
/// ```ignore
/// store.set_secret("github_sync_token", token.as_bytes()).await?;
/// let raw = store.get_secret("github_sync_token").await?;
/// ```
#[async_trait]
pub trait SecureStore: Send + Sync {
    /// Replace whatever is stored under `key`.
    async fn set_secret(&self, key: &str, value: &[u8]) -> Result<()>;

    /// `Ok(None)` when nothing is stored under `key`.
    async fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Deleting a missing key succeeds.
    async fn delete_secret(&self, key: &str) -> Result<()>;

    async fn has_secret(&self, key: &str) -> Result<bool> {
        Ok(self.get_secret(key).await?.is_some())
    }
}

/// String key-value settings.
///
/// Keys are dotted paths such as `sync.remote.owner`. Values that must change
/// together go through [`SettingsStore::begin_transaction`].
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn set_string(&self, key: &str, value: &str) -> Result<()>;

    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    /// Removing a missing key succeeds.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Writes made through the transaction become visible together on
    /// [`SettingsTransaction::commit`], or not at all.
    async fn begin_transaction(&self) -> Result<Box<dyn SettingsTransaction + Send>>;
}

#[async_trait]
pub trait SettingsTransaction: Send {
    async fn set_string(&mut self, key: &str, value: &str) -> Result<()>;

    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}
