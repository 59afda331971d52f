//! Bundle of the four local stores.

use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::error::{LibraryError, Result};
use crate::repositories::{
    FavoriteRepository, HistoryRepository, JsonFavoriteRepository, JsonHistoryRepository,
    JsonPendingDeletionRepository, JsonPlaylistRepository, PendingDeletionRepository,
    PlaylistRepository,
};
use crate::system_playlist::{is_system_playlist, pin_system_playlist};

/// Handles to every local store, shared with the sync engine.
#[derive(Clone)]
pub struct LocalLibrary {
    pub playlists: Arc<dyn PlaylistRepository>,
    pub favorites: Arc<dyn FavoriteRepository>,
    pub history: Arc<dyn HistoryRepository>,
    pub pending_deletions: Arc<dyn PendingDeletionRepository>,
}

impl LocalLibrary {
    pub fn new(
        playlists: Arc<dyn PlaylistRepository>,
        favorites: Arc<dyn FavoriteRepository>,
        history: Arc<dyn HistoryRepository>,
        pending_deletions: Arc<dyn PendingDeletionRepository>,
    ) -> Self {
        Self {
            playlists,
            favorites,
            history,
            pending_deletions,
        }
    }

    /// JSON-file stores under `data_dir`.
    pub fn open(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self::new(
            Arc::new(JsonPlaylistRepository::in_dir(&data_dir)),
            Arc::new(JsonFavoriteRepository::in_dir(&data_dir)),
            Arc::new(JsonHistoryRepository::in_dir(&data_dir)),
            Arc::new(JsonPendingDeletionRepository::in_dir(&data_dir)),
        )
    }

    /// Make sure the distinguished playlist exists and is first.
    pub async fn ensure_system_playlist(&self, now: i64) -> Result<()> {
        let mut playlists = self.playlists.read_all().await?;
        if pin_system_playlist(&mut playlists, now) {
            self.playlists.replace_all(playlists).await?;
        }
        Ok(())
    }

    /// Delete a playlist and remember the id so the deletion reaches other
    /// devices as a tombstone on the next sync.
    ///
    /// # Returns
    /// - `Ok(true)` if the playlist was deleted
    /// - `Ok(false)` if not found
    ///
    /// # Errors
    /// The distinguished playlist cannot be deleted.
    pub async fn delete_playlist(&self, id: i64) -> Result<bool> {
        let playlists = self.playlists.read_all().await?;
        let Some(target) = playlists.iter().find(|p| p.id == id) else {
            return Ok(false);
        };
        if is_system_playlist(&target.name) {
            return Err(LibraryError::InvalidInput {
                field: "playlist.id".to_string(),
                message: format!("Playlist {} is the distinguished playlist", id),
            });
        }

        if self.playlists.remove(id).await?.is_none() {
            return Ok(false);
        }
        self.pending_deletions.add(id).await?;

        info!(playlist_id = id, "Playlist deleted, tombstone pending");
        Ok(true)
    }
}
