//! Play history repository
//!
//! `append` is the only record path used during playback. It runs under the
//! store's mutex, so concurrent appends never interleave a read-modify-write.

use crate::error::Result;
use crate::models::PlayedEntry;
use crate::store::JsonFile;
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::sync::Mutex;
use tracing::debug;

/// Maximum number of history entries kept locally.
pub const HISTORY_CAP: usize = 500;

#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// Entries, newest first.
    async fn read_all(&self) -> Result<Vec<PlayedEntry>>;

    async fn replace_all(&self, entries: Vec<PlayedEntry>) -> Result<()>;

    /// Record one play at the head of the log.
    ///
    /// An entry with the same `(song id, played_at)` as an existing one is
    /// ignored. The log is truncated to [`HISTORY_CAP`].
    async fn append(&self, entry: PlayedEntry) -> Result<()>;
}

pub struct JsonHistoryRepository {
    file: JsonFile<Vec<PlayedEntry>>,
    write_lock: Mutex<()>,
}

impl JsonHistoryRepository {
    pub const FILE_NAME: &'static str = "play_history.json";

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
impl HistoryRepository for JsonHistoryRepository {
    async fn read_all(&self) -> Result<Vec<PlayedEntry>> {
        let _guard = self.write_lock.lock().await;
        self.file.load().await
    }

    async fn replace_all(&self, entries: Vec<PlayedEntry>) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.file.save(&entries).await?;
        debug!(count = entries.len(), "Replaced play history");
        Ok(())
    }

    async fn append(&self, entry: PlayedEntry) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.file.load().await?;

        if entries.iter().any(|e| e.identity() == entry.identity()) {
            return Ok(());
        }

        let insert_at = entries
            .iter()
            .position(|e| e.played_at <= entry.played_at)
            .unwrap_or(entries.len());
        entries.insert(insert_at, entry);
        entries.truncate(HISTORY_CAP);

        self.file.save(&entries).await
    }
}
