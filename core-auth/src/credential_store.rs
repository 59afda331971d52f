//! Secure Credential Storage
//!
//! Persists the remote-store credential through the host's
//! [`SecureStore`](bridge_traits::storage::SecureStore).
//!
//! ## Security Features
//!
//! - Credentials are never logged or exposed in error messages
//! - A stored entry that no longer parses is erased on read
//! - Clearing is idempotent, so the sync engine can invalidate an expired
//!   credential without checking first
//!
//! ## Example
//!
//! ```no_run
//! use core_auth::{CredentialStore, SyncCredential};
//! use std::sync::Arc;
//! # use bridge_traits::storage::SecureStore;
//! # async fn example(secure_store: Arc<dyn SecureStore>) -> core_auth::Result<()> {
//! let store = CredentialStore::new(secure_store);
//!
//! store.store(&SyncCredential::new("ghp_example", 0)).await?;
//! let credential = store.retrieve().await?;
//! store.clear().await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::types::SyncCredential;
use bridge_traits::storage::SecureStore;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Key under which the credential is kept.
pub const DEFAULT_CREDENTIAL_KEY: &str = "github_sync_token";

#[derive(Clone)]
pub struct CredentialStore {
    secure_store: Arc<dyn SecureStore>,
    key: String,
}

impl CredentialStore {
    pub fn new(secure_store: Arc<dyn SecureStore>) -> Self {
        Self::with_key(secure_store, DEFAULT_CREDENTIAL_KEY)
    }

    pub fn with_key(secure_store: Arc<dyn SecureStore>, key: impl Into<String>) -> Self {
        Self {
            secure_store,
            key: key.into(),
        }
    }

    /// Store the credential, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Rejects blank tokens before touching storage.
    pub async fn store(&self, credential: &SyncCredential) -> Result<()> {
        credential.validate().map_err(AuthError::InvalidCredential)?;

        let json = serde_json::to_vec(credential).map_err(|source| {
            AuthError::SerializationFailed {
                context: "sync credential".to_string(),
                source,
            }
        })?;

        self.secure_store
            .set_secret(&self.key, &json)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to store credential in secure storage");
                AuthError::SecureStorageUnavailable(e.to_string())
            })?;

        info!(
            has_account = credential.account().is_some(),
            "Sync credential stored securely"
        );
        Ok(())
    }

    /// Retrieve the credential
    ///
    /// Returns:
    /// - `Ok(Some(credential))` if one exists and parses
    /// - `Ok(None)` if none is stored
    /// - `Err(CredentialCorrupted)` if the entry was unreadable; it has been
    ///   erased, so the next call returns `Ok(None)`
    pub async fn retrieve(&self) -> Result<Option<SyncCredential>> {
        let data = self.secure_store.get_secret(&self.key).await.map_err(|e| {
            warn!(error = %e, "Failed to retrieve credential from secure storage");
            AuthError::SecureStorageUnavailable(e.to_string())
        })?;

        let Some(data) = data else {
            debug!("No sync credential stored");
            return Ok(None);
        };

        match serde_json::from_slice::<SyncCredential>(&data) {
            Ok(credential) => Ok(Some(credential)),
            Err(e) => {
                warn!(error = %e, "Stored credential is corrupted, erasing it");
                if let Err(delete_err) = self.secure_store.delete_secret(&self.key).await {
                    warn!(error = %delete_err, "Failed to erase corrupted credential");
                }
                Err(AuthError::CredentialCorrupted {
                    reason: e.to_string(),
                })
            }
        }
    }

    /// Erase the credential. Succeeds when nothing is stored.
    pub async fn clear(&self) -> Result<()> {
        self.secure_store
            .delete_secret(&self.key)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to erase credential from secure storage");
                AuthError::SecureStorageUnavailable(e.to_string())
            })?;

        info!("Sync credential cleared");
        Ok(())
    }

    pub async fn has_credential(&self) -> Result<bool> {
        self.secure_store
            .has_secret(&self.key)
            .await
            .map_err(|e| AuthError::SecureStorageUnavailable(e.to_string()))
    }
}
