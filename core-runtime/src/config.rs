//! # Core Configuration Module
//!
//! Builder-based configuration for the sync core.
//!
//! ## Overview
//!
//! [`CoreConfigBuilder`] collects every host capability and setting the
//! sync service needs and validates them up front, so a misconfigured host
//! fails at startup with an actionable message instead of during the first
//! sync.
//!
//! ## Required Dependencies
//!
//! - `HttpClient` - transport for the remote snapshot store
//! - `SecureStore` - credential persistence
//! - `SettingsStore` - remote coordinates and sync bookkeeping
//!
//! When the `desktop-shims` feature is enabled, desktop defaults
//! (`ReqwestHttpClient`, `KeyringSecureStore`, `SqliteSettingsStore`) are
//! injected for any of these that is not provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::time::Duration;
//!
//! let config = CoreConfig::builder()
//!     .data_dir("/home/me/.local/share/tunesync")
//!     .device_name("Living room PC")
//!     .sync_interval(Duration::from_secs(30 * 60))
//!     .enable_periodic_sync(true)
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{Clock, HttpClient, SecureStore, SettingsStore, SystemClock};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_GITHUB_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_DEVICE_NAME: &str = "tunesync-device";
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(15 * 60);
pub const MIN_SYNC_INTERVAL: Duration = Duration::from_secs(60);
pub const MAX_SYNC_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Core configuration for the sync service.
#[derive(Clone)]
pub struct CoreConfig {
    /// Directory holding the local JSON stores and the settings database
    pub data_dir: PathBuf,

    /// Human-readable device name written into every snapshot
    pub device_name: String,

    /// Base URL of the GitHub REST API (override for GitHub Enterprise)
    pub github_api_base: String,

    /// Period between automatic syncs when periodic sync is enabled
    pub sync_interval: Duration,

    pub http_client: Arc<dyn HttpClient>,

    pub secure_store: Arc<dyn SecureStore>,

    pub settings_store: Arc<dyn SettingsStore>,

    /// Time source for snapshot and bookkeeping timestamps
    pub clock: Arc<dyn Clock>,

    pub features: FeatureFlags,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("data_dir", &self.data_dir)
            .field("device_name", &self.device_name)
            .field("github_api_base", &self.github_api_base)
            .field("sync_interval", &self.sync_interval)
            .field("http_client", &"HttpClient { ... }")
            .field("secure_store", &"SecureStore { ... }")
            .field("settings_store", &"SettingsStore { ... }")
            .field("features", &self.features)
            .finish()
    }
}

/// Feature flags control optional sync triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Run a sync every `sync_interval` in the background
    pub enable_periodic_sync: bool,

    /// Run a sync whenever the host reports the app returned to foreground
    pub sync_on_resume: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            enable_periodic_sync: false,
            sync_on_resume: true,
        }
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Data directory is not empty
    /// - Device name is not blank
    /// - API base is an http(s) URL
    /// - Sync interval lies between one minute and one day
    pub fn validate(&self) -> Result<()> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(Error::Config("Data directory cannot be empty".to_string()));
        }

        if self.device_name.trim().is_empty() {
            return Err(Error::Config("Device name cannot be blank".to_string()));
        }

        if !(self.github_api_base.starts_with("https://")
            || self.github_api_base.starts_with("http://"))
        {
            return Err(Error::Config(format!(
                "GitHub API base must be an http(s) URL, got '{}'",
                self.github_api_base
            )));
        }

        if self.sync_interval < MIN_SYNC_INTERVAL || self.sync_interval > MAX_SYNC_INTERVAL {
            return Err(Error::Config(format!(
                "Sync interval must be between {}s and {}s, got {}s",
                MIN_SYNC_INTERVAL.as_secs(),
                MAX_SYNC_INTERVAL.as_secs(),
                self.sync_interval.as_secs()
            )));
        }

        Ok(())
    }

    /// Path of the settings database used by the desktop default store.
    pub fn settings_db_path(&self) -> PathBuf {
        settings_db_path(&self.data_dir)
    }
}

fn settings_db_path(data_dir: &Path) -> PathBuf {
    data_dir.join("settings.db")
}

fn host_device_name() -> String {
    ["HOSTNAME", "COMPUTERNAME"]
        .iter()
        .find_map(|var| std::env::var(var).ok().filter(|v| !v.trim().is_empty()))
        .unwrap_or_else(|| DEFAULT_DEVICE_NAME.to_string())
}

#[cfg(not(feature = "desktop-shims"))]
fn capability_missing(capability: &str, purpose: &str, desktop_default: &str) -> Error {
    Error::CapabilityMissing {
        capability: capability.to_string(),
        message: format!(
            "{} implementation is required for {}. \
             Desktop: enable the 'desktop-shims' feature to use the default {}. \
             Mobile: inject a platform-native adapter.",
            capability, purpose, desktop_default
        ),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Ok(Arc::new(bridge_desktop::ReqwestHttpClient::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(capability_missing(
        "HttpClient",
        "talking to the remote snapshot store",
        "ReqwestHttpClient",
    ))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_secure_store() -> Result<Arc<dyn SecureStore>> {
    Ok(Arc::new(bridge_desktop::KeyringSecureStore::new()))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_secure_store() -> Result<Arc<dyn SecureStore>> {
    Err(capability_missing(
        "SecureStore",
        "credential persistence",
        "KeyringSecureStore",
    ))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_settings_store(data_dir: &Path) -> Result<Arc<dyn SettingsStore>> {
    use bridge_desktop::SqliteSettingsStore;
    use std::thread;
    use tokio::runtime::{Handle, Runtime};

    let path = settings_db_path(data_dir);

    let init_store = |path: PathBuf| -> Result<SqliteSettingsStore> {
        let runtime = Runtime::new().map_err(|e| {
            Error::Internal(format!(
                "Failed to create Tokio runtime for default settings store: {}",
                e
            ))
        })?;

        runtime
            .block_on(SqliteSettingsStore::new(path))
            .map_err(|e| {
                Error::Internal(format!("Failed to initialize default SettingsStore: {}", e))
            })
    };

    // block_on panics inside a runtime, so build the store on a plain thread.
    let store = match Handle::try_current() {
        Ok(_) => thread::spawn(move || init_store(path))
            .join()
            .map_err(|_| {
                Error::Internal(
                    "Worker thread panicked while creating default SettingsStore".to_string(),
                )
            })??,
        Err(_) => init_store(path)?,
    };

    Ok(Arc::new(store))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_settings_store(_data_dir: &Path) -> Result<Arc<dyn SettingsStore>> {
    Err(capability_missing(
        "SettingsStore",
        "sync bookkeeping",
        "SqliteSettingsStore",
    ))
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    data_dir: Option<PathBuf>,
    device_name: Option<String>,
    github_api_base: Option<String>,
    sync_interval: Option<Duration>,
    http_client: Option<Arc<dyn HttpClient>>,
    secure_store: Option<Arc<dyn SecureStore>>,
    settings_store: Option<Arc<dyn SettingsStore>>,
    clock: Option<Arc<dyn Clock>>,
    features: FeatureFlags,
}

impl CoreConfigBuilder {
    /// Sets the data directory (required).
    pub fn data_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.data_dir = Some(path.into());
        self
    }

    pub fn device_name(mut self, name: impl Into<String>) -> Self {
        self.device_name = Some(name.into());
        self
    }

    pub fn github_api_base(mut self, base: impl Into<String>) -> Self {
        self.github_api_base = Some(base.into());
        self
    }

    pub fn sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = Some(interval);
        self
    }

    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn secure_store(mut self, store: Arc<dyn SecureStore>) -> Self {
        self.secure_store = Some(store);
        self
    }

    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn enable_periodic_sync(mut self, enabled: bool) -> Self {
        self.features.enable_periodic_sync = enabled;
        self
    }

    pub fn sync_on_resume(mut self, enabled: bool) -> Self {
        self.features.sync_on_resume = enabled;
        self
    }

    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = features;
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The data directory was not set
    /// - A required capability is missing and no desktop default exists
    /// - Validation fails
    pub fn build(self) -> Result<CoreConfig> {
        let data_dir = self.data_dir.ok_or_else(|| {
            Error::Config("Data directory is required. Use .data_dir() to set it.".to_string())
        })?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        let secure_store = match self.secure_store {
            Some(store) => store,
            None => provide_default_secure_store()?,
        };

        let settings_store = match self.settings_store {
            Some(store) => store,
            None => provide_default_settings_store(&data_dir)?,
        };

        let config = CoreConfig {
            data_dir,
            device_name: self.device_name.unwrap_or_else(host_device_name),
            github_api_base: self
                .github_api_base
                .unwrap_or_else(|| DEFAULT_GITHUB_API_BASE.to_string()),
            sync_interval: self.sync_interval.unwrap_or(DEFAULT_SYNC_INTERVAL),
            http_client,
            secure_store,
            settings_store,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            features: self.features,
        };

        config.validate()?;
        Ok(config)
    }
}
