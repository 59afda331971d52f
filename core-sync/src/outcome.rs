//! Merge results surfaced to the user.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of a conflict was kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConflictResolution {
    LocalWins,
    RemoteWins,
}

impl fmt::Display for ConflictResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictResolution::LocalWins => write!(f, "local wins"),
            ConflictResolution::RemoteWins => write!(f, "remote wins"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConflictType {
    /// The same playlist was renamed differently on two devices.
    PlaylistName,
}

/// One conflict the merge resolved automatically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConflict {
    pub conflict_type: ConflictType,
    pub playlist_id: i64,
    /// Name of the playlist after resolution.
    pub playlist_name: String,
    pub description: String,
    pub resolution: ConflictResolution,
}

/// What a merge changed, relative to the local copy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncOutcome {
    pub playlists_added: usize,
    pub playlists_updated: usize,
    pub playlists_deleted: usize,
    pub songs_added: usize,
    pub songs_removed: usize,
    pub conflicts: Vec<SyncConflict>,
}

impl SyncOutcome {
    pub fn has_changes(&self) -> bool {
        self.playlists_added > 0
            || self.playlists_updated > 0
            || self.playlists_deleted > 0
            || self.songs_added > 0
            || self.songs_removed > 0
            || !self.conflicts.is_empty()
    }

    /// Short human-readable summary, e.g. `"1 playlist added, 2 songs removed"`.
    pub fn summary(&self) -> String {
        let parts: Vec<String> = [
            (self.playlists_added, "playlist", "added"),
            (self.playlists_updated, "playlist", "updated"),
            (self.playlists_deleted, "playlist", "deleted"),
            (self.songs_added, "song", "added"),
            (self.songs_removed, "song", "removed"),
            (self.conflicts.len(), "conflict", "resolved"),
        ]
        .into_iter()
        .filter(|(count, _, _)| *count > 0)
        .map(|(count, noun, verb)| {
            let plural = if count == 1 { "" } else { "s" };
            format!("{} {}{} {}", count, noun, plural, verb)
        })
        .collect();

        if parts.is_empty() {
            "no changes".to_string()
        } else {
            parts.join(", ")
        }
    }
}
