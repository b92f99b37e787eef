//! Observable store around [`PlayerState`].
//!
//! The UI layer never touches `PlayerState` directly: it subscribes to
//! snapshots and calls operations on the controller, which funnel every
//! mutation through [`PlayerStore::mutate`] so a fresh snapshot is published
//! after each change.

use std::sync::Arc;

use tokio::sync::{Mutex, watch};

use crate::model::song::{PlaybackState, RepeatMode, Song, SongId};
use crate::model::state::{PlayerSnapshot, PlayerState};

#[derive(Clone)]
pub struct PlayerStore {
    state: Arc<Mutex<PlayerState>>,
    snapshot_tx: Arc<watch::Sender<PlayerSnapshot>>,
}

impl PlayerStore {
    pub fn new() -> Self {
        let (snapshot_tx, _rx) = watch::channel(PlayerSnapshot::default());
        Self {
            state: Arc::new(Mutex::new(PlayerState::new())),
            snapshot_tx: Arc::new(snapshot_tx),
        }
    }

    /// Subscribe to state snapshots. The receiver immediately holds the
    /// latest published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<PlayerSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Current snapshot without subscribing.
    pub async fn snapshot(&self) -> PlayerSnapshot {
        self.state.lock().await.snapshot()
    }

    /// Apply a mutation and publish the resulting snapshot.
    pub(crate) async fn mutate<R>(&self, f: impl FnOnce(&mut PlayerState) -> R) -> R {
        let mut state = self.state.lock().await;
        let result = f(&mut state);
        self.snapshot_tx.send_replace(state.snapshot());
        result
    }

    /// Read-only access without publishing.
    pub(crate) async fn read<R>(&self, f: impl FnOnce(&PlayerState) -> R) -> R {
        f(&*self.state.lock().await)
    }

    pub async fn current_song(&self) -> Option<Song> {
        self.read(|s| s.current_song().cloned()).await
    }

    pub async fn is_playing(&self) -> bool {
        self.read(|s| s.is_playing()).await
    }

    pub async fn playback_state(&self) -> PlaybackState {
        self.read(|s| s.playback).await
    }

    pub async fn repeat_mode(&self) -> RepeatMode {
        self.read(|s| s.repeat).await
    }

    pub async fn shuffle_enabled(&self) -> bool {
        self.read(|s| s.queue.shuffle_enabled()).await
    }

    pub async fn playback_version(&self) -> u64 {
        self.read(|s| s.playback_version).await
    }

    pub async fn position_ms(&self) -> u64 {
        self.read(|s| s.position_ms).await
    }

    /// Append a song to the up-next queue, interning it in the library map.
    pub async fn add_to_up_next(&self, song: Song) {
        let id = song.id;
        tracing::debug!(song_id = id, title = %song.title, "Adding song to up-next queue");
        self.mutate(|s| {
            s.intern([song]);
            s.up_next.push(id);
        })
        .await;
    }

    pub async fn up_next_ids(&self) -> Vec<SongId> {
        self.read(|s| s.up_next.iter().collect()).await
    }
}

impl Default for PlayerStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(id: SongId) -> Song {
        Song {
            id,
            hash_id: format!("sha{id}"),
            title: format!("Song {id}"),
            artist: "Artist".to_string(),
            album: "Album".to_string(),
            duration_ms: 180_000,
            art_url: None,
            liked: false,
            disliked: false,
        }
    }

    #[tokio::test]
    async fn subscribers_see_published_mutations() {
        let store = PlayerStore::new();
        let rx = store.subscribe();

        store.add_to_up_next(song(3)).await;

        let snapshot = rx.borrow().clone();
        assert_eq!(snapshot.up_next.len(), 1);
        assert_eq!(snapshot.up_next[0].id, 3);
    }

    #[tokio::test]
    async fn snapshot_reflects_interned_songs() {
        let store = PlayerStore::new();
        store.add_to_up_next(song(1)).await;
        store.add_to_up_next(song(2)).await;

        let snapshot = store.snapshot().await;
        assert_eq!(snapshot.up_next.iter().map(|s| s.id).collect::<Vec<_>>(), vec![1, 2]);
        assert!(snapshot.current_song.is_none());
        assert!(!snapshot.is_playing());
    }
}
