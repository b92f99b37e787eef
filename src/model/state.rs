//! Normalized player state and the snapshot handed to subscribers.

use std::collections::HashMap;

use crate::model::song::{PlayContext, PlaybackState, RepeatMode, Song, SongId};
use crate::queue::{QueueManager, UpNextQueue};

/// Canonical player state.
///
/// Songs live once in a normalized by-id map; the main queue, the up-next
/// queue, and the current song are `SongId` references into it. This keeps a
/// preference write visible everywhere at once instead of dual-writing a
/// standalone "current song" copy.
#[derive(Default)]
pub struct PlayerState {
    library: HashMap<SongId, Song>,
    pub(crate) queue: QueueManager,
    pub(crate) up_next: UpNextQueue,
    pub(crate) current: Option<SongId>,
    pub(crate) playback: PlaybackState,
    pub(crate) repeat: RepeatMode,
    pub(crate) context: Option<PlayContext>,
    pub(crate) playback_version: u64,
    pub(crate) position_ms: u64,
}

impl PlayerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or refresh songs in the normalized map.
    pub(crate) fn intern(&mut self, songs: impl IntoIterator<Item = Song>) {
        for song in songs {
            self.library.insert(song.id, song);
        }
    }

    pub(crate) fn song(&self, id: SongId) -> Option<&Song> {
        self.library.get(&id)
    }

    pub(crate) fn song_mut(&mut self, id: SongId) -> Option<&mut Song> {
        self.library.get_mut(&id)
    }

    pub(crate) fn current_song(&self) -> Option<&Song> {
        self.current.and_then(|id| self.library.get(&id))
    }

    pub(crate) fn is_playing(&self) -> bool {
        self.playback == PlaybackState::Playing
    }

    /// Materialize an immutable view for subscribers.
    pub(crate) fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            current_song: self.current.and_then(|id| self.library.get(&id).cloned()),
            state: self.playback,
            queue: self
                .queue
                .order()
                .iter()
                .filter_map(|id| self.library.get(id).cloned())
                .collect(),
            up_next: self
                .up_next
                .iter()
                .filter_map(|id| self.library.get(&id).cloned())
                .collect(),
            current_index: self.queue.current_index(),
            repeat_mode: self.repeat,
            shuffle_enabled: self.queue.shuffle_enabled(),
            playback_version: self.playback_version,
            position_ms: self.position_ms,
            context: self.context.clone(),
        }
    }
}

/// Read-only view of the player, published on every state change.
#[derive(Clone, Debug, Default)]
pub struct PlayerSnapshot {
    pub current_song: Option<Song>,
    pub state: PlaybackState,
    pub queue: Vec<Song>,
    pub up_next: Vec<Song>,
    pub current_index: usize,
    pub repeat_mode: RepeatMode,
    pub shuffle_enabled: bool,
    pub playback_version: u64,
    pub position_ms: u64,
    pub context: Option<PlayContext>,
}

impl PlayerSnapshot {
    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }
}
