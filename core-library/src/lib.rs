//! # Local Library
//!
//! Locally authoritative state the sync engine reads from and writes back to.
//!
//! ## Overview
//!
//! This crate owns:
//! - Domain models for playlists, favorite playlists and play history
//! - Repository traits, one per store, plus JSON-file implementations with
//!   atomic write-replace
//! - The distinguished playlist lookup shared by every caller
//! - [`LocalLibrary`], the bundle of stores handed to the sync engine

pub mod error;
pub mod library;
pub mod models;
pub mod repositories;
pub mod store;
pub mod system_playlist;

pub use error::{LibraryError, Result};
pub use library::LocalLibrary;
pub use models::{FavoriteKey, FavoritePlaylist, LocalPlaylist, LocalSong, PlayedEntry};
pub use repositories::{
    FavoriteRepository, HistoryRepository, PendingDeletionRepository, PlaylistRepository,
};
pub use system_playlist::{free_playlist_id, is_system_playlist, SYSTEM_PLAYLIST_NAME};
