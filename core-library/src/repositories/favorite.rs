//! Favorite playlist repository

use crate::error::Result;
use crate::models::FavoritePlaylist;
use crate::store::JsonFile;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::debug;

#[async_trait]
pub trait FavoriteRepository: Send + Sync {
    async fn read_all(&self) -> Result<Vec<FavoritePlaylist>>;

    /// Add if absent, replace if `favorite.added_time` is newer.
    ///
    /// Returns `true` when the store changed. Idempotent.
    async fn upsert(&self, favorite: FavoritePlaylist) -> Result<bool>;
}

pub struct JsonFavoriteRepository {
    file: JsonFile<Vec<FavoritePlaylist>>,
    write_lock: Mutex<()>,
}

impl JsonFavoriteRepository {
    pub const FILE_NAME: &'static str = "favorite_playlists.json";

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

/// Applies the upsert rule to an in-memory collection.
pub fn upsert_favorite(favorites: &mut Vec<FavoritePlaylist>, favorite: FavoritePlaylist) -> bool {
    match favorites.iter_mut().find(|f| f.same_key(&favorite)) {
        Some(existing) if favorite.added_time > existing.added_time => {
            *existing = favorite;
            true
        }
        Some(_) => false,
        None => {
            favorites.push(favorite);
            true
        }
    }
}

#[async_trait]
impl FavoriteRepository for JsonFavoriteRepository {
    async fn read_all(&self) -> Result<Vec<FavoritePlaylist>> {
        let _guard = self.write_lock.lock().await;
        self.file.load().await
    }

    async fn upsert(&self, favorite: FavoritePlaylist) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut favorites = self.file.load().await?;

        let id = favorite.id;
        let changed = upsert_favorite(&mut favorites, favorite);
        if changed {
            self.file.save(&favorites).await?;
            debug!(favorite_id = id, "Upserted favorite playlist");
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn favorite(id: i64, source: &str, name: &str, added_time: i64) -> FavoritePlaylist {
        FavoritePlaylist {
            id,
            source: source.to_string(),
            name: name.to_string(),
            cover_url: String::new(),
            track_count: 0,
            creator_name: String::new(),
            added_time,
        }
    }

    #[tokio::test]
    async fn test_upsert_adds_then_keeps_newer() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonFavoriteRepository::in_dir(dir.path());

        assert!(repo.upsert(favorite(1, "netease", "v1", 10)).await.unwrap());
        assert!(!repo.upsert(favorite(1, "netease", "old", 5)).await.unwrap());
        assert!(!repo.upsert(favorite(1, "netease", "same", 10)).await.unwrap());
        assert!(repo.upsert(favorite(1, "netease", "v2", 20)).await.unwrap());
        assert!(repo.upsert(favorite(1, "bilibili", "other", 1)).await.unwrap());

        let all = repo.read_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "v2");
    }
}
