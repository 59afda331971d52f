//! Playlist repository trait and implementation

use crate::error::{LibraryError, Result};
use crate::models::LocalPlaylist;
use crate::store::JsonFile;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::debug;

/// Playlist repository interface
#[async_trait]
pub trait PlaylistRepository: Send + Sync {
    /// All playlists in display order.
    async fn read_all(&self) -> Result<Vec<LocalPlaylist>>;

    /// Atomically replace the whole collection.
    ///
    /// # Errors
    /// Returns error if any playlist fails validation or ids are not unique;
    /// nothing is written in that case.
    async fn replace_all(&self, playlists: Vec<LocalPlaylist>) -> Result<()>;

    /// Remove a playlist by id
    ///
    /// # Returns
    /// - `Ok(Some(playlist))` if it was removed
    /// - `Ok(None)` if not found
    async fn remove(&self, id: i64) -> Result<Option<LocalPlaylist>>;
}

pub(crate) fn validate_collection(playlists: &[LocalPlaylist]) -> Result<()> {
    let mut seen = std::collections::HashSet::with_capacity(playlists.len());
    for playlist in playlists {
        playlist
            .validate()
            .map_err(|message| LibraryError::InvalidInput {
                field: "playlist".to_string(),
                message,
            })?;
        if !seen.insert(playlist.id) {
            return Err(LibraryError::InvalidInput {
                field: "playlist.id".to_string(),
                message: format!("Duplicate playlist id {}", playlist.id),
            });
        }
    }
    Ok(())
}

/// JSON-file implementation of [`PlaylistRepository`]
pub struct JsonPlaylistRepository {
    file: JsonFile<Vec<LocalPlaylist>>,
    write_lock: Mutex<()>,
}

impl JsonPlaylistRepository {
    pub const FILE_NAME: &'static str = "playlists.json";

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: JsonFile::new(path),
            write_lock: Mutex::new(()),
        }
    }

    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self::new(data_dir.into().join(Self::FILE_NAME))
    }
}

#[async_trait]
impl PlaylistRepository for JsonPlaylistRepository {
    async fn read_all(&self) -> Result<Vec<LocalPlaylist>> {
        let _guard = self.write_lock.lock().await;
        self.file.load().await
    }

    async fn replace_all(&self, playlists: Vec<LocalPlaylist>) -> Result<()> {
        validate_collection(&playlists)?;

        let _guard = self.write_lock.lock().await;
        self.file.save(&playlists).await?;
        debug!(count = playlists.len(), "Replaced playlists");
        Ok(())
    }

    async fn remove(&self, id: i64) -> Result<Option<LocalPlaylist>> {
        let _guard = self.write_lock.lock().await;
        let mut playlists = self.file.load().await?;

        let Some(index) = playlists.iter().position(|p| p.id == id) else {
            return Ok(None);
        };
        let removed = playlists.remove(index);
        self.file.save(&playlists).await?;

        debug!(playlist_id = id, "Removed playlist");
        Ok(Some(removed))
    }
}
