//! Domain models for the local library
//!
//! Everything here is locally authoritative. Timestamps are epoch
//! milliseconds.

use serde::{Deserialize, Serialize};

/// A song as stored inside a playlist or a history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalSong {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub album: String,
    #[serde(default)]
    pub album_id: i64,
    #[serde(default)]
    pub duration_ms: i64,
    #[serde(default)]
    pub cover_url: String,
}

impl LocalSong {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            artist: String::new(),
            album: String::new(),
            album_id: 0,
            duration_ms: 0,
            cover_url: String::new(),
        }
    }
}

/// A user playlist, ordered as the user arranged it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalPlaylist {
    /// Unique within this device's store only.
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub songs: Vec<LocalSong>,
    pub created_at: i64,
    /// Last local mutation; drives conflict resolution during sync.
    pub modified_at: i64,
}

impl LocalPlaylist {
    pub fn new(id: i64, name: impl Into<String>, now: i64) -> Self {
        Self {
            id,
            name: name.into(),
            songs: Vec::new(),
            created_at: now,
            modified_at: now,
        }
    }

    pub fn with_songs(mut self, songs: Vec<LocalSong>) -> Self {
        self.songs = songs;
        self
    }

    pub fn song_ids(&self) -> impl Iterator<Item = i64> + '_ {
        self.songs.iter().map(|song| song.id)
    }

    /// Validate playlist data
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Playlist name cannot be empty".to_string());
        }
        if self.modified_at < self.created_at {
            return Err(format!(
                "Playlist {} modified before it was created",
                self.id
            ));
        }
        Ok(())
    }
}

/// Identity of a favorite playlist: `(id, source)`.
pub type FavoriteKey = (i64, String);

/// A playlist from a streaming platform the user bookmarked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoritePlaylist {
    pub id: i64,
    /// Platform tag, e.g. `"netease"` or `"bilibili"`.
    pub source: String,
    pub name: String,
    #[serde(default)]
    pub cover_url: String,
    #[serde(default)]
    pub track_count: i64,
    #[serde(default)]
    pub creator_name: String,
    pub added_time: i64,
}

impl FavoritePlaylist {
    pub fn key(&self) -> FavoriteKey {
        (self.id, self.source.clone())
    }

    pub fn same_key(&self, other: &FavoritePlaylist) -> bool {
        self.id == other.id && self.source == other.source
    }
}

/// One play of one song.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayedEntry {
    pub song: LocalSong,
    pub played_at: i64,
    /// Device that recorded the play.
    #[serde(default)]
    pub device_id: String,
}

impl PlayedEntry {
    /// The same song replayed at another instant is a distinct entry.
    pub fn identity(&self) -> (i64, i64) {
        (self.song.id, self.played_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playlist_validation() {
        let playlist = LocalPlaylist::new(1, "Road trip", 1_000);
        assert!(playlist.validate().is_ok());

        let blank = LocalPlaylist::new(2, "  ", 1_000);
        assert!(blank.validate().is_err());

        let mut backwards = LocalPlaylist::new(3, "Late", 2_000);
        backwards.modified_at = 1_000;
        assert!(backwards.validate().is_err());
    }

    #[test]
    fn test_song_fields_default_when_missing() {
        let song: LocalSong = serde_json::from_str(r#"{"id": 7, "name": "Intro"}"#).unwrap();
        assert_eq!(song, LocalSong::new(7, "Intro"));
    }

    #[test]
    fn test_favorite_key_includes_source() {
        let a = FavoritePlaylist {
            id: 10,
            source: "netease".into(),
            name: "Top".into(),
            cover_url: String::new(),
            track_count: 0,
            creator_name: String::new(),
            added_time: 1,
        };
        let b = FavoritePlaylist {
            source: "bilibili".into(),
            ..a.clone()
        };
        assert!(!a.same_key(&b));
        assert_eq!(a.key(), (10, "netease".to_string()));
    }
}
