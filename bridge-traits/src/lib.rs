//! # Host Bridge Traits
//!
//! Capability contracts the sync core consumes but never implements itself.
//!
//! ## Overview
//!
//! Each trait is a seam between the platform-independent sync engine and a
//! host-specific adapter. The desktop adapters live in `bridge-desktop`; the
//! remote snapshot transport lives in `provider-github`. Tests substitute
//! in-memory fakes for every trait here.
//!
//! ## Traits
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - Single-shot HTTPS exchange
//! - [`RemoteSnapshotStore`](snapshot::RemoteSnapshotStore) - Versioned blob
//!   fetch/upload with an optimistic-concurrency token
//!
//! ### Security & Storage
//! - [`SecureStore`](storage::SecureStore) - Credential persistence (Keychain/Keystore)
//! - [`SettingsStore`](storage::SettingsStore) - Key-value preferences with transactions
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Fail-Fast Strategy
//!
//! The core refuses to start when a required capability is missing and names
//! the missing trait in its error:
//!
//! ```ignore
//! let http_client = config.http_client
//!     .ok_or_else(|| Error::CapabilityMissing {
//!         capability: "HttpClient".to_string(),
//!         message: "No HTTP client implementation provided. \
//!                  Desktop: enable the `desktop-shims` feature.".to_string(),
//!     })?;
//! ```
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so they can be shared as
//! `Arc<dyn Trait>` across async tasks.

pub mod error;
pub mod http;
pub mod snapshot;
pub mod storage;
pub mod time;

pub use error::BridgeError;

pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
pub use snapshot::{RemoteCoordinates, RemoteSnapshot, RemoteSnapshotStore, RemoteStoreError};
pub use storage::{SecureStore, SettingsStore, SettingsTransaction};
pub use time::{Clock, LogEntry, LogLevel, LoggerSink, SystemClock};
