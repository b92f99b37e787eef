//! Core playback vocabulary types

use serde::{Deserialize, Serialize};

/// Library-wide song identity. Queue entries and the "current song" are
/// references into the normalized song map, keyed by this id.
pub type SongId = u64;

/// A song as delivered by the library endpoints.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub id: SongId,
    /// Content address, reported to analytics as `sha_id`.
    pub hash_id: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration_ms: u64,
    pub art_url: Option<String>,
    #[serde(default)]
    pub liked: bool,
    #[serde(default)]
    pub disliked: bool,
}

/// Playback state machine states.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing,
    Paused,
}

/// Repeat mode state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    #[default]
    Off,
    All,
    Once,
}

impl RepeatMode {
    pub fn next(self) -> Self {
        match self {
            RepeatMode::Off => RepeatMode::All,
            RepeatMode::All => RepeatMode::Once,
            RepeatMode::Once => RepeatMode::Off,
        }
    }
}

/// Where a play action originated. Attribution only; no effect on queue
/// mechanics.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlayContextKind {
    Radio,
    Playlist,
    Album,
    Artist,
    Search,
    Queue,
    ForYou,
    Liked,
}

impl PlayContextKind {
    /// Wire name used as `context_type` in session start requests.
    pub fn as_str(self) -> &'static str {
        match self {
            PlayContextKind::Radio => "radio",
            PlayContextKind::Playlist => "playlist",
            PlayContextKind::Album => "album",
            PlayContextKind::Artist => "artist",
            PlayContextKind::Search => "search",
            PlayContextKind::Queue => "queue",
            PlayContextKind::ForYou => "for-you",
            PlayContextKind::Liked => "liked",
        }
    }
}

/// Provenance tag attached to a play action.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayContext {
    pub kind: PlayContextKind,
    pub id: String,
    pub name: Option<String>,
}

impl PlayContext {
    pub fn new(kind: PlayContextKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeat_mode_cycles() {
        assert_eq!(RepeatMode::Off.next(), RepeatMode::All);
        assert_eq!(RepeatMode::All.next(), RepeatMode::Once);
        assert_eq!(RepeatMode::Once.next(), RepeatMode::Off);
    }

    #[test]
    fn context_kind_wire_names() {
        assert_eq!(PlayContextKind::ForYou.as_str(), "for-you");
        assert_eq!(PlayContextKind::Playlist.as_str(), "playlist");
    }

    #[test]
    fn song_deserializes_without_preference_flags() {
        let song: Song = serde_json::from_str(
            r#"{
                "id": 7,
                "hash_id": "abc123",
                "title": "Night Drive",
                "artist": "Neon Fields",
                "album": "Afterglow",
                "duration_ms": 215000,
                "art_url": null
            }"#,
        )
        .unwrap();
        assert!(!song.liked);
        assert!(!song.disliked);
    }
}
