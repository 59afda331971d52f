//! `SecureStore` on the OS keychain via the `keyring` crate
//! (Keychain on macOS, Credential Manager on Windows, Secret Service on Linux).

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bridge_traits::{
    error::{BridgeError, Result},
    storage::SecureStore,
};
use keyring::Entry;
use tracing::{debug, warn};

/// Secrets are base64-encoded because keyring entries hold text.
pub struct KeyringSecureStore {
    service: String,
}

impl KeyringSecureStore {
    pub const DEFAULT_SERVICE: &'static str = "tunesync";

    pub fn new() -> Self {
        Self::with_service_name(Self::DEFAULT_SERVICE)
    }

    /// Separate namespace, e.g. one per profile or for tests.
    pub fn with_service_name(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry> {
        Entry::new(&self.service, key).map_err(keyring_error)
    }
}

impl Default for KeyringSecureStore {
    fn default() -> Self {
        Self::new()
    }
}

fn keyring_error(error: keyring::Error) -> BridgeError {
    BridgeError::OperationFailed(format!("keyring: {}", error))
}

#[async_trait]
impl SecureStore for KeyringSecureStore {
    async fn set_secret(&self, key: &str, value: &[u8]) -> Result<()> {
        self.entry(key)?
            .set_password(&STANDARD.encode(value))
            .map_err(keyring_error)?;
        debug!(key, "Secret written to keyring");
        Ok(())
    }

    async fn get_secret(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let encoded = match self.entry(key)?.get_password() {
            Ok(encoded) => encoded,
            Err(keyring::Error::NoEntry) => return Ok(None),
            Err(e) => return Err(keyring_error(e)),
        };

        STANDARD.decode(encoded.as_bytes()).map(Some).map_err(|e| {
            warn!(key, error = %e, "Keyring entry is not valid base64");
            BridgeError::OperationFailed(format!("keyring entry {} is not base64: {}", key, e))
        })
    }

    async fn delete_secret(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(keyring_error(e)),
        }
    }
}
