//! # Sync Module
//!
//! Cross-device synchronization of playlists, favorites and play history
//! against a single remote JSON snapshot.
//!
//! ## Overview
//!
//! Each sync pass snapshots the local stores, fetches the remote snapshot,
//! runs a three-way merge, writes the result back locally and uploads it
//! with an optimistic-concurrency check on the remote version token.
//!
//! ## Components
//!
//! - **Data Model** (`model`): The JSON snapshot format shared by all devices
//! - **Merge Engine** (`merge`): Pure reconciliation of local and remote snapshots
//! - **Outcome** (`outcome`): Counts and conflict records reported to the user
//! - **Change Detection** (`diff`): Decides whether an upload is needed
//! - **Config Store** (`config_store`): Credential, remote coordinates, version token
//! - **Local Adapter** (`local`): Local stores to snapshot and back
//! - **Orchestrator** (`orchestrator`): One sync pass, serialized by a try-lock
//! - **Scheduler** (`scheduler`): Periodic trigger

pub mod config_store;
pub mod diff;
pub mod error;
pub mod local;
pub mod merge;
pub mod model;
pub mod orchestrator;
pub mod outcome;
pub mod scheduler;

pub use config_store::{BridgeSyncConfigStore, SyncConfigStore};
pub use diff::snapshots_equivalent;
pub use error::{Result, SyncError};
pub use local::{ApplySummary, LocalStateAdapter};
pub use merge::merge;
pub use model::{
    ChangeLogEntry, SyncFavoritePlaylist, SyncPlaylist, SyncRecentPlay, SyncSnapshot, SyncSong,
    CHANGE_LOG_CAP, RECENT_PLAYS_CAP,
};
pub use orchestrator::{SyncOrchestrator, SyncReport, SyncTrigger};
pub use outcome::{ConflictResolution, ConflictType, SyncConflict, SyncOutcome};
pub use scheduler::SyncScheduler;
