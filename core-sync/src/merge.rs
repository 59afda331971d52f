//! # Three-Way Merge Engine
//!
//! Reconciles the local snapshot with the fetched remote snapshot.
//!
//! ## Overview
//!
//! [`merge`] is a pure function: no I/O, no clock, no hidden state. Given the
//! same inputs it always produces the same merged snapshot and
//! [`SyncOutcome`]. There is no common ancestor to diff against, so
//! conflicts are settled by heuristics:
//!
//! - **Tombstones** veto everything. A playlist deleted on either side is
//!   dropped from the merged output.
//! - **Names** that differ are a conflict. The strictly newer `modifiedAt`
//!   wins, ties keep the local name.
//! - **Songs** follow a priority list, first match wins:
//!   1. remote empty, local not: keep local (protects against an
//!      uninitialized remote)
//!   2. local empty, remote not: take remote
//!   3. the remote revision changed since this device last saw it: take remote
//!   4. strictly newer `modifiedAt` wins, ties keep local
//! - **Favorites** are a union keyed by `(id, source)`, newer `addedTime` wins.
//! - **Recent plays** are a union keyed by `(songId, playedAt)`, newest first,
//!   capped at [`RECENT_PLAYS_CAP`].
//! - **Change log** is a union keyed by timestamp, capped at [`CHANGE_LOG_CAP`].
//!
//! ## Pairing
//!
//! Playlists are paired across sides by id, except the distinguished
//! playlist, which is paired by name because every device creates its own
//! with its own id. Merged output lists local playlists first, in local
//! order, then remote-only playlists in remote order.

use crate::model::{
    ChangeLogEntry, SyncFavoritePlaylist, SyncPlaylist, SyncRecentPlay, SyncSnapshot, SyncSong,
    CHANGE_LOG_CAP, RECENT_PLAYS_CAP,
};
use crate::outcome::{ConflictResolution, ConflictType, SyncConflict, SyncOutcome};
use core_library::{free_playlist_id, is_system_playlist};
use std::collections::{HashMap, HashSet};

/// Merge `local` with `remote`.
///
/// `remote_has_changed` is true when the remote version token differs from
/// the last one this device recorded, or when no token was ever recorded.
///
/// Device fields of the merged snapshot come from `local`.
pub fn merge(
    local: &SyncSnapshot,
    remote: &SyncSnapshot,
    remote_has_changed: bool,
) -> (SyncSnapshot, SyncOutcome) {
    let mut outcome = SyncOutcome::default();

    let playlists = merge_playlists(
        &local.playlists,
        &remote.playlists,
        remote_has_changed,
        &mut outcome,
    );

    let merged = SyncSnapshot {
        device_id: local.device_id.clone(),
        device_name: local.device_name.clone(),
        last_modified: local.last_modified,
        playlists,
        favorite_playlists: merge_favorites(
            &local.favorite_playlists,
            &remote.favorite_playlists,
        ),
        recent_plays: merge_recent_plays(&local.recent_plays, &remote.recent_plays),
        change_log: merge_change_log(&local.change_log, &remote.change_log),
    };

    (merged, outcome)
}

// ============================================================================
// Playlists
// ============================================================================

fn merge_playlists(
    local: &[SyncPlaylist],
    remote: &[SyncPlaylist],
    remote_has_changed: bool,
    outcome: &mut SyncOutcome,
) -> Vec<SyncPlaylist> {
    let partners = pair_playlists(local, remote);
    let mut remote_paired = vec![false; remote.len()];
    let mut merged = Vec::with_capacity(local.len().max(remote.len()));

    for (local_playlist, partner) in local.iter().zip(&partners) {
        match partner {
            Some(remote_index) => {
                remote_paired[*remote_index] = true;
                let remote_playlist = &remote[*remote_index];
                if let Some(playlist) =
                    merge_pair(local_playlist, remote_playlist, remote_has_changed, outcome)
                {
                    merged.push(playlist);
                }
            }
            None => {
                if let Some(playlist) = take_one_sided(local_playlist, outcome) {
                    merged.push(playlist);
                }
            }
        }
    }

    let mut used_ids: HashSet<i64> = merged.iter().map(|p| p.id).collect();
    // Fresh ids avoid every id seen on either side, tombstones included.
    let mut taken: HashSet<i64> = local.iter().chain(remote).map(|p| p.id).collect();

    for (remote_playlist, _) in remote
        .iter()
        .zip(&remote_paired)
        .filter(|(_, paired)| !**paired)
    {
        if let Some(mut playlist) = take_one_sided(remote_playlist, outcome) {
            // Another device's id may already be in use here.
            if !used_ids.insert(playlist.id) {
                playlist.id = free_playlist_id(&taken);
                taken.insert(playlist.id);
                used_ids.insert(playlist.id);
            }
            merged.push(playlist);
        }
    }

    merged
}

/// For each local playlist, the index of its remote counterpart.
fn pair_playlists(local: &[SyncPlaylist], remote: &[SyncPlaylist]) -> Vec<Option<usize>> {
    let mut partners = vec![None; local.len()];
    let mut taken = vec![false; remote.len()];

    let local_system = local.iter().position(|p| is_system_playlist(&p.name));
    let remote_system = remote.iter().position(|p| is_system_playlist(&p.name));
    if let (Some(l), Some(r)) = (local_system, remote_system) {
        partners[l] = Some(r);
        taken[r] = true;
    }

    for (index, playlist) in local.iter().enumerate() {
        if is_system_playlist(&playlist.name) {
            continue;
        }
        let found = remote.iter().enumerate().position(|(r, candidate)| {
            !taken[r] && candidate.id == playlist.id && !is_system_playlist(&candidate.name)
        });
        if let Some(r) = found {
            partners[index] = Some(r);
            taken[r] = true;
        }
    }

    partners
}

fn take_one_sided(playlist: &SyncPlaylist, outcome: &mut SyncOutcome) -> Option<SyncPlaylist> {
    if playlist.is_deleted {
        outcome.playlists_deleted += 1;
        return None;
    }

    outcome.playlists_added += 1;
    Some(SyncPlaylist {
        songs: dedupe_songs(&playlist.songs),
        ..playlist.clone()
    })
}

fn merge_pair(
    local: &SyncPlaylist,
    remote: &SyncPlaylist,
    remote_has_changed: bool,
    outcome: &mut SyncOutcome,
) -> Option<SyncPlaylist> {
    if local.is_deleted || remote.is_deleted {
        if !(local.is_deleted && remote.is_deleted) {
            outcome.playlists_deleted += 1;
        }
        return None;
    }

    let name = if local.name == remote.name || remote.name.trim().is_empty() {
        local.name.clone()
    } else {
        let resolution = if remote.modified_at > local.modified_at {
            ConflictResolution::RemoteWins
        } else {
            ConflictResolution::LocalWins
        };
        let kept = match resolution {
            ConflictResolution::RemoteWins => remote.name.clone(),
            ConflictResolution::LocalWins => local.name.clone(),
        };
        outcome.conflicts.push(SyncConflict {
            conflict_type: ConflictType::PlaylistName,
            playlist_id: local.id,
            playlist_name: kept.clone(),
            description: format!(
                "Playlist renamed on two devices: \"{}\" here, \"{}\" remotely; kept \"{}\" ({})",
                local.name, remote.name, kept, resolution
            ),
            resolution,
        });
        kept
    };

    let songs = dedupe_songs(choose_songs(local, remote, remote_has_changed));

    let local_ids: HashSet<i64> = local.songs.iter().map(|s| s.id).collect();
    let merged_ids: HashSet<i64> = songs.iter().map(|s| s.id).collect();
    outcome.songs_added += merged_ids.difference(&local_ids).count();
    outcome.songs_removed += local_ids.difference(&merged_ids).count();

    if name != local.name || songs != local.songs {
        outcome.playlists_updated += 1;
    }

    Some(SyncPlaylist {
        id: local.id,
        name,
        songs,
        created_at: local.created_at,
        modified_at: local.modified_at.max(remote.modified_at),
        is_deleted: false,
    })
}

fn choose_songs<'a>(
    local: &'a SyncPlaylist,
    remote: &'a SyncPlaylist,
    remote_has_changed: bool,
) -> &'a [SyncSong] {
    if remote.songs.is_empty() && !local.songs.is_empty() {
        &local.songs
    } else if local.songs.is_empty() && !remote.songs.is_empty() {
        &remote.songs
    } else if remote_has_changed || remote.modified_at > local.modified_at {
        &remote.songs
    } else {
        &local.songs
    }
}

/// Drop repeated song ids, keeping the first occurrence.
fn dedupe_songs(songs: &[SyncSong]) -> Vec<SyncSong> {
    let mut seen = HashSet::with_capacity(songs.len());
    songs
        .iter()
        .filter(|song| seen.insert(song.id))
        .cloned()
        .collect()
}

// ============================================================================
// Favorites, recent plays, change log
// ============================================================================

fn merge_favorites(
    local: &[SyncFavoritePlaylist],
    remote: &[SyncFavoritePlaylist],
) -> Vec<SyncFavoritePlaylist> {
    let mut merged: Vec<SyncFavoritePlaylist> = Vec::with_capacity(local.len() + remote.len());
    let mut index: HashMap<(i64, &str), usize> = HashMap::new();

    for favorite in local.iter().chain(remote) {
        match index.get(&favorite.key()) {
            Some(&position) => {
                if favorite.added_time > merged[position].added_time {
                    merged[position] = favorite.clone();
                }
            }
            None => {
                index.insert(favorite.key(), merged.len());
                merged.push(favorite.clone());
            }
        }
    }

    merged
}

fn merge_recent_plays(local: &[SyncRecentPlay], remote: &[SyncRecentPlay]) -> Vec<SyncRecentPlay> {
    let mut seen = HashSet::with_capacity(local.len() + remote.len());
    let mut merged: Vec<SyncRecentPlay> = local
        .iter()
        .chain(remote)
        .filter(|play| seen.insert(play.identity()))
        .cloned()
        .collect();

    // Stable sort keeps local entries ahead of remote ones on equal times.
    merged.sort_by(|a, b| b.played_at.cmp(&a.played_at));
    merged.truncate(RECENT_PLAYS_CAP);
    merged
}

fn merge_change_log(local: &[ChangeLogEntry], remote: &[ChangeLogEntry]) -> Vec<ChangeLogEntry> {
    let mut seen = HashSet::with_capacity(local.len() + remote.len());
    let mut merged: Vec<ChangeLogEntry> = local
        .iter()
        .chain(remote)
        .filter(|entry| seen.insert(entry.timestamp))
        .cloned()
        .collect();

    merged.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    merged.truncate(CHANGE_LOG_CAP);
    merged
}
