//! The distinguished playlist every device has exactly once, always first.
//!
//! It is identified by its well-known name. All matching goes through
//! [`is_system_playlist`] so merge, apply and library code agree.

use crate::models::LocalPlaylist;
use std::collections::HashSet;

/// Well-known name of the distinguished playlist.
pub const SYSTEM_PLAYLIST_NAME: &str = "My Favorite Music";

pub fn is_system_playlist(name: &str) -> bool {
    name == SYSTEM_PLAYLIST_NAME
}

/// Position of the distinguished playlist, if present.
pub fn find_system_playlist(playlists: &[LocalPlaylist]) -> Option<usize> {
    playlists.iter().position(|p| is_system_playlist(&p.name))
}

/// Fresh id for a new playlist in `playlists`.
pub fn next_playlist_id(playlists: &[LocalPlaylist]) -> i64 {
    let taken: HashSet<i64> = playlists.iter().map(|p| p.id).collect();
    free_playlist_id(&taken)
}

/// An id not in `taken`.
///
/// One past the largest taken id (at least 1). When that would overflow,
/// the smallest unused positive id instead.
pub fn free_playlist_id(taken: &HashSet<i64>) -> i64 {
    let largest = taken.iter().copied().max().unwrap_or(0).max(0);
    if let Some(id) = largest.checked_add(1) {
        return id;
    }
    let mut id = 1;
    while taken.contains(&id) {
        id += 1;
    }
    id
}

/// Move the distinguished playlist to index 0, creating it empty if absent.
///
/// Returns `true` when the sequence was modified.
pub fn pin_system_playlist(playlists: &mut Vec<LocalPlaylist>, now: i64) -> bool {
    match find_system_playlist(playlists) {
        Some(0) => false,
        Some(index) => {
            let system = playlists.remove(index);
            playlists.insert(0, system);
            true
        }
        None => {
            let id = next_playlist_id(playlists);
            playlists.insert(0, LocalPlaylist::new(id, SYSTEM_PLAYLIST_NAME, now));
            true
        }
    }
}
