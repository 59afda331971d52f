//! # Events
//!
//! The core publishes [`CoreEvent`]s on a `tokio::sync::broadcast` channel so
//! a UI can follow sync progress and credential changes without polling.
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(32);
//! let mut events = bus.subscribe();
//!
//! bus.emit(CoreEvent::Sync(SyncEvent::Skipped {
//!     trigger: "periodic".to_string(),
//!     reason: "already_syncing".to_string(),
//! }))
//! .ok();
//!
//! assert!(matches!(events.recv().await, Ok(CoreEvent::Sync(SyncEvent::Skipped { .. }))));
//! # }
//! ```
//!
//! Publishers ignore the error returned when nobody is subscribed. A
//! subscriber that falls more than `capacity` events behind gets
//! `RecvError::Lagged` once and then continues from the oldest buffered event.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

pub const DEFAULT_EVENT_CAPACITY: usize = 128;

// ============================================================================
// Event Types
// ============================================================================

/// Everything the core publishes, tagged by domain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Credential lifecycle
    Auth(AuthEvent),
    /// Sync attempts and their outcomes
    Sync(SyncEvent),
    /// Local store writes performed by a sync
    Library(LibraryEvent),
}

// ============================================================================
// Authentication Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum AuthEvent {
    /// A remote-store credential was saved.
    CredentialStored {
        /// Account login, when known.
        account: Option<String>,
    },
    /// The credential was erased, by the user or because the remote rejected it.
    CredentialCleared {
        /// `"sign_out"` or `"expired"`.
        reason: String,
    },
}

// ============================================================================
// Sync Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SyncEvent {
    /// A sync acquired the lock and began.
    Started {
        sync_id: String,
        /// `"manual"`, `"periodic"` or `"app_resume"`.
        trigger: String,
    },
    /// A sync request found another sync running and did nothing.
    Skipped { trigger: String, reason: String },
    /// Sync finished successfully.
    Completed {
        sync_id: String,
        playlists_added: u64,
        playlists_updated: u64,
        playlists_deleted: u64,
        songs_added: u64,
        songs_removed: u64,
        conflicts: u64,
        /// Whether a new snapshot was written to the remote store.
        uploaded: bool,
        duration_ms: u64,
    },
    /// Sync stopped with an error.
    Failed {
        sync_id: String,
        /// Stable error tag, e.g. `"credential_expired"`.
        kind: String,
        message: String,
        /// Whether re-triggering later can succeed without user action.
        recoverable: bool,
    },
}

// ============================================================================
// Library Events
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum LibraryEvent {
    /// The playlist collection was replaced with merged content.
    PlaylistsReplaced { count: u64 },
    /// Favorite playlists were added or refreshed.
    FavoritesUpserted { count: u64 },
    /// Play history was replaced with merged content.
    HistoryReplaced { count: u64 },
}

// ============================================================================
// Event Bus
// ============================================================================

/// Broadcast sender shared by every publisher. Clones feed the same channel.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Number of subscribers reached, or `Err` when there are none.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Only events emitted after this call are delivered.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
