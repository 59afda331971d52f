//! # Repository Pattern Implementation
//!
//! Repository traits for the four local stores the sync engine reads from
//! and writes to, plus JSON-file implementations.
//!
//! ## Architecture
//!
//! - Traits define the interface for each store
//! - Each store is its own consistency domain: mutations are serialized
//!   behind the store's own async mutex
//! - Bulk writes go through [`JsonFile`](crate::store::JsonFile), which
//!   replaces the file atomically
//!
//! ## Available Repositories
//!
//! - `PlaylistRepository` - User playlists, ordered, distinguished playlist first
//! - `FavoriteRepository` - Bookmarked platform playlists, keyed by `(id, source)`
//! - `HistoryRepository` - Play history, newest first, capped
//! - `PendingDeletionRepository` - Ids of locally deleted playlists not yet
//!   confirmed purged remotely

pub mod favorite;
pub mod history;
pub mod pending;
pub mod playlist;

pub use favorite::{FavoriteRepository, JsonFavoriteRepository};
pub use history::{HistoryRepository, JsonHistoryRepository, HISTORY_CAP};
pub use pending::{JsonPendingDeletionRepository, PendingDeletionRepository};
pub use playlist::{JsonPlaylistRepository, PlaylistRepository};
