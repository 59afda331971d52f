//! Change detection between a merged snapshot and the fetched remote.
//!
//! Deliberately coarser than `PartialEq`: device fields, timestamps and
//! display metadata never force an upload on their own.

use crate::model::SyncSnapshot;
use std::collections::HashSet;

/// Number of leading recent plays compared.
pub const RECENT_PLAYS_COMPARED: usize = 50;

/// True when uploading `merged` would not change anything another device
/// cares about.
///
/// Compares playlist count, then per position the name and song-id
/// sequence, the favorite `(id, source)` key set, and the `(songId,
/// playedAt)` pairs of the first [`RECENT_PLAYS_COMPARED`] recent plays.
pub fn snapshots_equivalent(merged: &SyncSnapshot, remote: &SyncSnapshot) -> bool {
    playlists_equivalent(merged, remote)
        && favorites_equivalent(merged, remote)
        && recent_plays_equivalent(merged, remote)
}

fn playlists_equivalent(a: &SyncSnapshot, b: &SyncSnapshot) -> bool {
    a.playlists.len() == b.playlists.len()
        && a.playlists.iter().zip(&b.playlists).all(|(x, y)| {
            x.name == y.name
                && x.songs.len() == y.songs.len()
                && x.songs.iter().zip(&y.songs).all(|(s, t)| s.id == t.id)
        })
}

fn favorites_equivalent(a: &SyncSnapshot, b: &SyncSnapshot) -> bool {
    let keys = |snapshot: &SyncSnapshot| -> HashSet<(i64, String)> {
        snapshot
            .favorite_playlists
            .iter()
            .map(|f| (f.id, f.source.clone()))
            .collect()
    };
    keys(a) == keys(b)
}

fn recent_plays_equivalent(a: &SyncSnapshot, b: &SyncSnapshot) -> bool {
    let head = |snapshot: &SyncSnapshot| -> Vec<(i64, i64)> {
        snapshot
            .recent_plays
            .iter()
            .take(RECENT_PLAYS_COMPARED)
            .map(|p| p.identity())
            .collect()
    };
    head(a) == head(b)
}
