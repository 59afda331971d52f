//! # Sync Data Model
//!
//! The JSON document exchanged with the remote snapshot store.
//!
//! ## Compatibility
//!
//! The snapshot is a durable artifact read by old and new clients alike, so
//! the schema only ever grows: every field carries a serde default and
//! unknown fields are ignored. Field names are camelCase on the wire.
//! Timestamps are epoch milliseconds.

use core_library::{FavoritePlaylist, LocalPlaylist, LocalSong, PlayedEntry};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Maximum number of recent plays carried in a snapshot.
pub const RECENT_PLAYS_CAP: usize = 500;

/// Maximum number of change-log entries carried in a snapshot.
pub const CHANGE_LOG_CAP: usize = 100;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncSnapshot {
    pub device_id: String,
    pub device_name: String,
    /// Informational only, never used for merge decisions.
    pub last_modified: i64,
    pub playlists: Vec<SyncPlaylist>,
    pub favorite_playlists: Vec<SyncFavoritePlaylist>,
    /// Newest first.
    pub recent_plays: Vec<SyncRecentPlay>,
    pub change_log: Vec<ChangeLogEntry>,
}

impl SyncSnapshot {
    pub fn from_json(content: &str) -> serde_json::Result<Self> {
        serde_json::from_str(content)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Live (non-tombstoned) playlists.
    pub fn live_playlists(&self) -> impl Iterator<Item = &SyncPlaylist> {
        self.playlists.iter().filter(|p| !p.is_deleted)
    }

    /// Ids of tombstoned playlists.
    pub fn tombstone_ids(&self) -> BTreeSet<i64> {
        self.playlists
            .iter()
            .filter(|p| p.is_deleted)
            .map(|p| p.id)
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncPlaylist {
    pub id: i64,
    pub name: String,
    pub songs: Vec<SyncSong>,
    pub created_at: i64,
    pub modified_at: i64,
    pub is_deleted: bool,
}

impl SyncPlaylist {
    /// A tombstone for a playlist deleted on this device.
    pub fn tombstone(id: i64, deleted_at: i64) -> Self {
        Self {
            id,
            created_at: deleted_at,
            modified_at: deleted_at,
            is_deleted: true,
            ..Self::default()
        }
    }

    pub fn song_ids(&self) -> Vec<i64> {
        self.songs.iter().map(|song| song.id).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncSong {
    pub id: i64,
    pub name: String,
    pub artist: String,
    pub album: String,
    pub album_id: i64,
    pub duration_ms: i64,
    pub cover_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncFavoritePlaylist {
    pub id: i64,
    /// Platform tag, e.g. `"netease"` or `"bilibili"`.
    pub source: String,
    pub name: String,
    pub cover_url: String,
    pub track_count: i64,
    pub creator_name: String,
    pub added_time: i64,
}

impl SyncFavoritePlaylist {
    pub fn key(&self) -> (i64, &str) {
        (self.id, self.source.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncRecentPlay {
    pub song_id: i64,
    pub song: SyncSong,
    pub played_at: i64,
    pub device_id: String,
}

impl SyncRecentPlay {
    pub fn identity(&self) -> (i64, i64) {
        (self.song_id, self.played_at)
    }
}

/// Advisory change-log entry. Only `timestamp` is interpreted; every other
/// field round-trips untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeLogEntry {
    #[serde(default)]
    pub timestamp: i64,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ChangeLogEntry {
    /// Entry written by this device when it uploads a merged snapshot.
    pub fn sync(timestamp: i64, device_id: &str, summary: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert("deviceId".to_string(), Value::from(device_id));
        fields.insert("action".to_string(), Value::from("sync"));
        fields.insert("summary".to_string(), Value::from(summary.into()));
        Self { timestamp, fields }
    }
}

// ============================================================================
// Local model conversions
// ============================================================================

impl From<&LocalSong> for SyncSong {
    fn from(song: &LocalSong) -> Self {
        Self {
            id: song.id,
            name: song.name.clone(),
            artist: song.artist.clone(),
            album: song.album.clone(),
            album_id: song.album_id,
            duration_ms: song.duration_ms,
            cover_url: song.cover_url.clone(),
        }
    }
}

impl From<&SyncSong> for LocalSong {
    fn from(song: &SyncSong) -> Self {
        Self {
            id: song.id,
            name: song.name.clone(),
            artist: song.artist.clone(),
            album: song.album.clone(),
            album_id: song.album_id,
            duration_ms: song.duration_ms,
            cover_url: song.cover_url.clone(),
        }
    }
}

impl From<&LocalPlaylist> for SyncPlaylist {
    fn from(playlist: &LocalPlaylist) -> Self {
        Self {
            id: playlist.id,
            name: playlist.name.clone(),
            songs: playlist.songs.iter().map(SyncSong::from).collect(),
            created_at: playlist.created_at,
            modified_at: playlist.modified_at,
            is_deleted: false,
        }
    }
}

impl From<&FavoritePlaylist> for SyncFavoritePlaylist {
    fn from(favorite: &FavoritePlaylist) -> Self {
        Self {
            id: favorite.id,
            source: favorite.source.clone(),
            name: favorite.name.clone(),
            cover_url: favorite.cover_url.clone(),
            track_count: favorite.track_count,
            creator_name: favorite.creator_name.clone(),
            added_time: favorite.added_time,
        }
    }
}

impl From<&SyncFavoritePlaylist> for FavoritePlaylist {
    fn from(favorite: &SyncFavoritePlaylist) -> Self {
        Self {
            id: favorite.id,
            source: favorite.source.clone(),
            name: favorite.name.clone(),
            cover_url: favorite.cover_url.clone(),
            track_count: favorite.track_count,
            creator_name: favorite.creator_name.clone(),
            added_time: favorite.added_time,
        }
    }
}

impl From<&PlayedEntry> for SyncRecentPlay {
    fn from(entry: &PlayedEntry) -> Self {
        Self {
            song_id: entry.song.id,
            song: SyncSong::from(&entry.song),
            played_at: entry.played_at,
            device_id: entry.device_id.clone(),
        }
    }
}

impl From<&SyncRecentPlay> for PlayedEntry {
    fn from(play: &SyncRecentPlay) -> Self {
        let mut song = LocalSong::from(&play.song);
        song.id = play.song_id;
        Self {
            song,
            played_at: play.played_at,
            device_id: play.device_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format_is_camel_case() {
        let snapshot = SyncSnapshot {
            device_id: "dev-1".into(),
            playlists: vec![SyncPlaylist {
                id: 1,
                name: "Chill".into(),
                created_at: 10,
                modified_at: 20,
                ..SyncPlaylist::default()
            }],
            ..SyncSnapshot::default()
        };

        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["deviceId"], "dev-1");
        assert_eq!(value["playlists"][0]["modifiedAt"], 20);
        assert_eq!(value["playlists"][0]["isDeleted"], false);
        assert!(value.get("favoritePlaylists").is_some());
        assert!(value.get("recentPlays").is_some());
    }

    #[test]
    fn test_missing_fields_default_and_unknown_fields_are_ignored() {
        let json = r#"{
            "deviceId": "phone",
            "playlists": [{"id": 3, "name": "Gym", "futureField": true}],
            "schemaHint": "v9"
        }"#;

        let snapshot = SyncSnapshot::from_json(json).unwrap();
        assert_eq!(snapshot.device_id, "phone");
        assert_eq!(snapshot.playlists[0].id, 3);
        assert!(!snapshot.playlists[0].is_deleted);
        assert!(snapshot.playlists[0].songs.is_empty());
        assert!(snapshot.recent_plays.is_empty());
    }

    #[test]
    fn test_change_log_keeps_unknown_fields() {
        let json = r#"{"changeLog": [{"timestamp": 5, "action": "import", "count": 3}]}"#;
        let snapshot = SyncSnapshot::from_json(json).unwrap();

        let entry = &snapshot.change_log[0];
        assert_eq!(entry.timestamp, 5);
        assert_eq!(entry.fields["action"], "import");

        let back = serde_json::to_value(entry).unwrap();
        assert_eq!(back["count"], 3);
    }

    #[test]
    fn test_sync_change_log_entry() {
        let entry = ChangeLogEntry::sync(99, "dev-1", "2 playlists added");
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["timestamp"], 99);
        assert_eq!(value["deviceId"], "dev-1");
        assert_eq!(value["action"], "sync");
        assert_eq!(value["summary"], "2 playlists added");
    }

    #[test]
    fn test_tombstone() {
        let tombstone = SyncPlaylist::tombstone(8, 1_000);
        assert!(tombstone.is_deleted);
        assert_eq!(tombstone.modified_at, 1_000);
    }

    #[test]
    fn test_recent_play_song_id_wins_over_embedded_song() {
        let play = SyncRecentPlay {
            song_id: 42,
            song: SyncSong {
                id: 0,
                name: "Intro".into(),
                ..SyncSong::default()
            },
            played_at: 7,
            device_id: "d".into(),
        };
        let entry = PlayedEntry::from(&play);
        assert_eq!(entry.song.id, 42);
        assert_eq!(entry.identity(), (42, 7));
    }
}
