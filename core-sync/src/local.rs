//! # Local State Adapter
//!
//! Moves data between the local stores and the sync data model.
//!
//! ## Building
//!
//! The local snapshot is built fresh from the stores on every sync. Ids in
//! the pending-deletion store that no longer exist locally are
//! re-materialized as tombstones so the deletion reaches other devices.
//!
//! ## Applying
//!
//! - Playlists still pending deletion are skipped, even when the merge
//!   carried them back.
//! - Playlists are matched to existing local ones by distinguished name,
//!   then id, then name. Matched playlists keep their local id. The
//!   distinguished playlist is re-pinned first (created empty if missing).
//!   The store is only rewritten when the result differs.
//! - Favorites go through the store's upsert, only for entries that are new
//!   or newer.
//! - Play history is replaced wholesale only when the remote changed, or
//!   when local history is empty and the merge has entries to restore.

use crate::error::Result;
use crate::model::{SyncFavoritePlaylist, SyncPlaylist, SyncRecentPlay, SyncSnapshot};
use core_library::system_playlist::pin_system_playlist;
use core_library::{
    free_playlist_id, is_system_playlist, FavoritePlaylist, LocalLibrary, LocalPlaylist,
    LocalSong, PlayedEntry,
};
use core_runtime::events::{CoreEvent, EventBus, LibraryEvent};
use std::collections::HashSet;
use tracing::{debug, info};

/// What [`LocalStateAdapter::apply`] wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub playlists_replaced: bool,
    pub favorites_upserted: usize,
    pub history_replaced: bool,
}

#[derive(Clone)]
pub struct LocalStateAdapter {
    library: LocalLibrary,
    event_bus: EventBus,
}

impl LocalStateAdapter {
    pub fn new(library: LocalLibrary, event_bus: EventBus) -> Self {
        Self { library, event_bus }
    }

    pub fn library(&self) -> &LocalLibrary {
        &self.library
    }

    /// Snapshot the current local state.
    pub async fn build_snapshot(
        &self,
        device_id: &str,
        device_name: &str,
        now: i64,
    ) -> Result<SyncSnapshot> {
        let local_playlists = self.library.playlists.read_all().await?;
        let pending = self.library.pending_deletions.read_all().await?;
        let favorites = self.library.favorites.read_all().await?;
        let history = self.library.history.read_all().await?;

        let live_ids: HashSet<i64> = local_playlists.iter().map(|p| p.id).collect();
        let mut playlists: Vec<SyncPlaylist> =
            local_playlists.iter().map(SyncPlaylist::from).collect();
        playlists.extend(
            pending
                .iter()
                .filter(|id| !live_ids.contains(id))
                .map(|id| SyncPlaylist::tombstone(*id, now)),
        );

        debug!(
            playlists = local_playlists.len(),
            tombstones = playlists.len() - local_playlists.len(),
            favorites = favorites.len(),
            recent_plays = history.len(),
            "Built local snapshot"
        );

        Ok(SyncSnapshot {
            device_id: device_id.to_string(),
            device_name: device_name.to_string(),
            last_modified: now,
            playlists,
            favorite_playlists: favorites.iter().map(SyncFavoritePlaylist::from).collect(),
            recent_plays: history.iter().map(SyncRecentPlay::from).collect(),
            change_log: Vec::new(),
        })
    }

    /// Write the merged snapshot back into the local stores.
    pub async fn apply(
        &self,
        merged: &SyncSnapshot,
        remote_has_changed: bool,
        now: i64,
    ) -> Result<ApplySummary> {
        let mut summary = ApplySummary::default();

        let existing = self.library.playlists.read_all().await?;
        // Deletions made after the snapshot was built must not be undone.
        let pending = self.library.pending_deletions.read_all().await?;
        let candidates: Vec<SyncPlaylist> = merged
            .playlists
            .iter()
            .filter(|p| !pending.contains(&p.id))
            .cloned()
            .collect();
        let mut playlists = reconcile_playlists(&existing, &candidates);
        pin_system_playlist(&mut playlists, now);
        if playlists != existing {
            let count = playlists.len() as u64;
            self.library.playlists.replace_all(playlists).await?;
            summary.playlists_replaced = true;
            self.event_bus
                .emit(CoreEvent::Library(LibraryEvent::PlaylistsReplaced { count }))
                .ok();
        }

        let current = self.library.favorites.read_all().await?;
        for favorite in &merged.favorite_playlists {
            let is_new_or_newer = current
                .iter()
                .find(|f| f.id == favorite.id && f.source == favorite.source)
                .map_or(true, |f| favorite.added_time > f.added_time);
            if is_new_or_newer
                && self
                    .library
                    .favorites
                    .upsert(FavoritePlaylist::from(favorite))
                    .await?
            {
                summary.favorites_upserted += 1;
            }
        }
        if summary.favorites_upserted > 0 {
            self.event_bus
                .emit(CoreEvent::Library(LibraryEvent::FavoritesUpserted {
                    count: summary.favorites_upserted as u64,
                }))
                .ok();
        }

        let history_empty = self.library.history.read_all().await?.is_empty();
        if remote_has_changed || (history_empty && !merged.recent_plays.is_empty()) {
            let entries: Vec<PlayedEntry> =
                merged.recent_plays.iter().map(PlayedEntry::from).collect();
            let count = entries.len() as u64;
            self.library.history.replace_all(entries).await?;
            summary.history_replaced = true;
            self.event_bus
                .emit(CoreEvent::Library(LibraryEvent::HistoryReplaced { count }))
                .ok();
        }

        info!(
            playlists_replaced = summary.playlists_replaced,
            favorites_upserted = summary.favorites_upserted,
            history_replaced = summary.history_replaced,
            "Applied merged snapshot locally"
        );
        Ok(summary)
    }
}

/// Map merged playlists onto local ones, preserving local ids.
fn reconcile_playlists(existing: &[LocalPlaylist], merged: &[SyncPlaylist]) -> Vec<LocalPlaylist> {
    let live: Vec<&SyncPlaylist> = merged.iter().filter(|p| !p.is_deleted).collect();

    let mut claimed = vec![false; existing.len()];
    let mut matches: Vec<Option<usize>> = Vec::with_capacity(live.len());
    for playlist in &live {
        let found = find_local_match(existing, &claimed, playlist);
        if let Some(index) = found {
            claimed[index] = true;
        }
        matches.push(found);
    }

    let mut used_ids: HashSet<i64> = matches
        .iter()
        .flatten()
        .map(|index| existing[*index].id)
        .collect();
    let mut taken: HashSet<i64> = existing
        .iter()
        .map(|p| p.id)
        .chain(live.iter().map(|p| p.id))
        .collect();

    live.iter()
        .zip(&matches)
        .map(|(playlist, matched)| {
            let id = match matched {
                Some(index) => existing[*index].id,
                None if used_ids.insert(playlist.id) => playlist.id,
                None => {
                    let id = free_playlist_id(&taken);
                    taken.insert(id);
                    used_ids.insert(id);
                    id
                }
            };
            let name = if !playlist.name.trim().is_empty() {
                playlist.name.clone()
            } else if let Some(index) = matched {
                existing[*index].name.clone()
            } else {
                untitled_playlist_name(id)
            };
            LocalPlaylist {
                id,
                name,
                songs: playlist.songs.iter().map(LocalSong::from).collect(),
                created_at: playlist.created_at,
                modified_at: playlist.modified_at.max(playlist.created_at),
            }
        })
        .collect()
}

/// Local name for a playlist that arrived without one.
fn untitled_playlist_name(id: i64) -> String {
    format!("Playlist {id}")
}

fn find_local_match(
    existing: &[LocalPlaylist],
    claimed: &[bool],
    playlist: &SyncPlaylist,
) -> Option<usize> {
    let free = |index: &usize| !claimed[*index];

    if is_system_playlist(&playlist.name) {
        return (0..existing.len())
            .filter(free)
            .find(|i| is_system_playlist(&existing[*i].name));
    }

    (0..existing.len())
        .filter(free)
        .find(|i| existing[*i].id == playlist.id && !is_system_playlist(&existing[*i].name))
        .or_else(|| {
            (0..existing.len())
                .filter(free)
                .find(|i| existing[*i].name == playlist.name)
        })
}
