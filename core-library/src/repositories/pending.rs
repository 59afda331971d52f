//! Pending playlist deletions

use crate::error::Result;
use crate::store::JsonFile;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tokio::sync::Mutex;

/// Ids of playlists deleted locally whose tombstones have not yet reached the
/// remote snapshot. An id is removed only after an upload that carried its
/// tombstone succeeded.
#[async_trait]
pub trait PendingDeletionRepository: Send + Sync {
    async fn read_all(&self) -> Result<BTreeSet<i64>>;

    async fn add(&self, playlist_id: i64) -> Result<()>;

    /// Forget the given ids. Ids added since they were read stay pending.
    async fn remove_all(&self, playlist_ids: &BTreeSet<i64>) -> Result<()>;
}

pub struct JsonPendingDeletionRepository {
    file: JsonFile<BTreeSet<i64>>,
    write_lock: Mutex<()>,
}

impl JsonPendingDeletionRepository {
    pub const FILE_NAME: &'static str = "pending_deletions.json";

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
impl PendingDeletionRepository for JsonPendingDeletionRepository {
    async fn read_all(&self) -> Result<BTreeSet<i64>> {
        let _guard = self.write_lock.lock().await;
        self.file.load().await
    }

    async fn add(&self, playlist_id: i64) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut ids = self.file.load().await?;
        if ids.insert(playlist_id) {
            self.file.save(&ids).await?;
        }
        Ok(())
    }

    async fn remove_all(&self, playlist_ids: &BTreeSet<i64>) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut ids = self.file.load().await?;
        let before = ids.len();
        ids.retain(|id| !playlist_ids.contains(id));
        if ids.len() != before {
            self.file.save(&ids).await?;
        }
        Ok(())
    }
}
