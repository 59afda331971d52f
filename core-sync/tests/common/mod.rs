//! In-memory fakes shared by the sync integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bridge_traits::{
    Clock, RemoteCoordinates, RemoteSnapshot, RemoteSnapshotStore, RemoteStoreError,
};
use chrono::{DateTime, TimeZone, Utc};
use core_library::repositories::favorite::upsert_favorite;
use core_library::{
    FavoritePlaylist, FavoriteRepository, HistoryRepository, LocalLibrary, LocalPlaylist,
    LocalSong, PendingDeletionRepository, PlayedEntry, PlaylistRepository,
};
use core_runtime::events::EventBus;
use core_sync::{SyncConfigStore, SyncOrchestrator};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub const NOW: i64 = 1_700_000_000_000;
pub const DEVICE_ID: &str = "device-test";

// ============================================================================
// Clock
// ============================================================================

pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.0).unwrap()
    }
}

// ============================================================================
// Config store
// ============================================================================

#[derive(Default)]
pub struct ConfigState {
    pub credential: Option<String>,
    pub coordinates: Option<RemoteCoordinates>,
    pub last_token: Option<String>,
    pub last_sync_time: Option<i64>,
    pub clear_calls: usize,
    pub commits: usize,
}

#[derive(Default)]
pub struct MemoryConfigStore {
    pub state: Mutex<ConfigState>,
}

impl MemoryConfigStore {
    pub fn configured() -> Self {
        let store = Self::default();
        {
            let mut state = store.state.lock().unwrap();
            state.credential = Some("ghp_test".to_string());
            state.coordinates = Some(RemoteCoordinates::new("octocat", "music"));
        }
        store
    }

    pub fn with_last_token(self, token: &str) -> Self {
        self.state.lock().unwrap().last_token = Some(token.to_string());
        self
    }
}

#[async_trait]
impl SyncConfigStore for MemoryConfigStore {
    async fn get_credential(&self) -> core_sync::Result<Option<String>> {
        Ok(self.state.lock().unwrap().credential.clone())
    }

    async fn get_remote_coordinates(&self) -> core_sync::Result<Option<RemoteCoordinates>> {
        Ok(self.state.lock().unwrap().coordinates.clone())
    }

    async fn clear_credential(&self) -> core_sync::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.credential = None;
        state.clear_calls += 1;
        Ok(())
    }

    async fn get_last_version_token(&self) -> core_sync::Result<Option<String>> {
        Ok(self.state.lock().unwrap().last_token.clone())
    }

    async fn save_last_version_token(&self, token: &str) -> core_sync::Result<()> {
        self.state.lock().unwrap().last_token = Some(token.to_string());
        Ok(())
    }

    async fn save_last_sync_time(&self, timestamp: i64) -> core_sync::Result<()> {
        self.state.lock().unwrap().last_sync_time = Some(timestamp);
        Ok(())
    }

    async fn commit_sync(&self, token: &str, timestamp: i64) -> core_sync::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.last_token = Some(token.to_string());
        state.last_sync_time = Some(timestamp);
        state.commits += 1;
        Ok(())
    }

    async fn device_id(&self) -> core_sync::Result<String> {
        Ok(DEVICE_ID.to_string())
    }
}

// ============================================================================
// Remote store
// ============================================================================

pub struct Upload {
    pub content: String,
    pub expected: Option<String>,
}

#[derive(Default)]
pub struct RemoteState {
    /// `(content, version_token)` of the stored document.
    pub document: Option<(String, String)>,
    pub fail_fetch: Option<RemoteStoreError>,
    pub fail_upload: Option<RemoteStoreError>,
    pub uploads: Vec<Upload>,
    pub fetch_calls: usize,
    pub version: u32,
}

#[derive(Default)]
pub struct MemoryRemote {
    pub state: Mutex<RemoteState>,
    /// When set, `fetch` signals `entered` and waits for `release`.
    pub gated: AtomicBool,
    pub entered: Notify,
    pub release: Notify,
}

impl MemoryRemote {
    pub fn with_document(content: impl Into<String>, token: &str) -> Self {
        let remote = Self::default();
        remote.state.lock().unwrap().document = Some((content.into(), token.to_string()));
        remote
    }

    pub fn current_content(&self) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .document
            .as_ref()
            .map(|(content, _)| content.clone())
    }

    pub fn upload_count(&self) -> usize {
        self.state.lock().unwrap().uploads.len()
    }
}

#[async_trait]
impl RemoteSnapshotStore for MemoryRemote {
    async fn fetch(
        &self,
        _credential: &str,
        _coordinates: &RemoteCoordinates,
    ) -> bridge_traits::snapshot::Result<RemoteSnapshot> {
        if self.gated.load(Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }

        let mut state = self.state.lock().unwrap();
        state.fetch_calls += 1;
        if let Some(error) = state.fail_fetch.take() {
            return Err(error);
        }
        match &state.document {
            Some((content, token)) => Ok(RemoteSnapshot {
                content: content.clone(),
                version_token: token.clone(),
            }),
            None => Err(RemoteStoreError::NotFound),
        }
    }

    async fn upload(
        &self,
        _credential: &str,
        _coordinates: &RemoteCoordinates,
        content: &str,
        expected_version: Option<&str>,
    ) -> bridge_traits::snapshot::Result<String> {
        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.fail_upload.take() {
            return Err(error);
        }
        if let (Some(expected), Some((_, current))) = (expected_version, &state.document) {
            if expected != current {
                return Err(RemoteStoreError::VersionConflict {
                    expected: Some(expected.to_string()),
                });
            }
        }

        state.version += 1;
        let token = format!("sha-{}", state.version);
        state.document = Some((content.to_string(), token.clone()));
        state.uploads.push(Upload {
            content: content.to_string(),
            expected: expected_version.map(str::to_string),
        });
        Ok(token)
    }
}

// ============================================================================
// Local stores
// ============================================================================

#[derive(Default)]
pub struct MemoryPlaylists {
    pub items: Mutex<Vec<LocalPlaylist>>,
    pub writes: AtomicUsize,
}

#[async_trait]
impl PlaylistRepository for MemoryPlaylists {
    async fn read_all(&self) -> core_library::Result<Vec<LocalPlaylist>> {
        Ok(self.items.lock().unwrap().clone())
    }

    async fn replace_all(&self, playlists: Vec<LocalPlaylist>) -> core_library::Result<()> {
        *self.items.lock().unwrap() = playlists;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn remove(&self, id: i64) -> core_library::Result<Option<LocalPlaylist>> {
        let mut items = self.items.lock().unwrap();
        let position = items.iter().position(|p| p.id == id);
        Ok(position.map(|index| items.remove(index)))
    }
}

#[derive(Default)]
pub struct MemoryFavorites {
    pub items: Mutex<Vec<FavoritePlaylist>>,
    pub writes: AtomicUsize,
}

#[async_trait]
impl FavoriteRepository for MemoryFavorites {
    async fn read_all(&self) -> core_library::Result<Vec<FavoritePlaylist>> {
        Ok(self.items.lock().unwrap().clone())
    }

    async fn upsert(&self, favorite: FavoritePlaylist) -> core_library::Result<bool> {
        let changed = upsert_favorite(&mut self.items.lock().unwrap(), favorite);
        if changed {
            self.writes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(changed)
    }
}

#[derive(Default)]
pub struct MemoryHistory {
    pub items: Mutex<Vec<PlayedEntry>>,
    pub writes: AtomicUsize,
}

#[async_trait]
impl HistoryRepository for MemoryHistory {
    async fn read_all(&self) -> core_library::Result<Vec<PlayedEntry>> {
        Ok(self.items.lock().unwrap().clone())
    }

    async fn replace_all(&self, entries: Vec<PlayedEntry>) -> core_library::Result<()> {
        *self.items.lock().unwrap() = entries;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn append(&self, entry: PlayedEntry) -> core_library::Result<()> {
        self.items.lock().unwrap().insert(0, entry);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryPending {
    pub ids: Mutex<BTreeSet<i64>>,
}

#[async_trait]
impl PendingDeletionRepository for MemoryPending {
    async fn read_all(&self) -> core_library::Result<BTreeSet<i64>> {
        Ok(self.ids.lock().unwrap().clone())
    }

    async fn add(&self, playlist_id: i64) -> core_library::Result<()> {
        self.ids.lock().unwrap().insert(playlist_id);
        Ok(())
    }

    async fn remove_all(&self, playlist_ids: &BTreeSet<i64>) -> core_library::Result<()> {
        self.ids
            .lock()
            .unwrap()
            .retain(|id| !playlist_ids.contains(id));
        Ok(())
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub config: Arc<MemoryConfigStore>,
    pub remote: Arc<MemoryRemote>,
    pub playlists: Arc<MemoryPlaylists>,
    pub favorites: Arc<MemoryFavorites>,
    pub history: Arc<MemoryHistory>,
    pub pending: Arc<MemoryPending>,
    pub library: LocalLibrary,
    pub events: EventBus,
    pub orchestrator: Arc<SyncOrchestrator>,
}

impl Harness {
    pub fn new(config: MemoryConfigStore, remote: MemoryRemote) -> Self {
        Self::with_local(config, remote, Vec::new())
    }

    pub fn with_local(
        config: MemoryConfigStore,
        remote: MemoryRemote,
        playlists: Vec<LocalPlaylist>,
    ) -> Self {
        let config = Arc::new(config);
        let remote = Arc::new(remote);
        let playlist_store = Arc::new(MemoryPlaylists::default());
        *playlist_store.items.lock().unwrap() = playlists;
        let favorites = Arc::new(MemoryFavorites::default());
        let history = Arc::new(MemoryHistory::default());
        let pending = Arc::new(MemoryPending::default());
        let events = EventBus::new(64);

        let library = LocalLibrary::new(
            playlist_store.clone(),
            favorites.clone(),
            history.clone(),
            pending.clone(),
        );
        let orchestrator = SyncOrchestrator::new(
            config.clone(),
            remote.clone(),
            library.clone(),
            events.clone(),
            "Test laptop",
        )
        .with_clock(Arc::new(FixedClock(NOW)));

        Self {
            config,
            remote,
            playlists: playlist_store,
            favorites,
            history,
            pending,
            library,
            events,
            orchestrator: Arc::new(orchestrator),
        }
    }

    pub fn local_writes(&self) -> usize {
        self.playlists.writes.load(Ordering::SeqCst)
            + self.favorites.writes.load(Ordering::SeqCst)
            + self.history.writes.load(Ordering::SeqCst)
    }

    pub fn local_playlists(&self) -> Vec<LocalPlaylist> {
        self.playlists.items.lock().unwrap().clone()
    }
}

// ============================================================================
// Builders
// ============================================================================

pub fn song(id: i64) -> LocalSong {
    LocalSong::new(id, format!("Song {}", id))
}

pub fn playlist(id: i64, name: &str, songs: &[i64], modified_at: i64) -> LocalPlaylist {
    LocalPlaylist {
        id,
        name: name.to_string(),
        songs: songs.iter().copied().map(song).collect(),
        created_at: 1,
        modified_at,
    }
}

pub fn played(song_id: i64, played_at: i64) -> PlayedEntry {
    PlayedEntry {
        song: song(song_id),
        played_at,
        device_id: "phone".to_string(),
    }
}
