//! Like/dislike preference flags.
//!
//! Preferences are written straight into the normalized song map, so the
//! current-song view, the main queue, and the up-next queue all observe a
//! toggle in the same published snapshot.

use crate::model::{PlayerStore, SongId};

impl PlayerStore {
    /// Toggle the liked flag on a song. Liking clears a standing dislike.
    pub async fn like_song(&self, id: SongId) {
        self.mutate(|s| {
            if let Some(song) = s.song_mut(id) {
                song.liked = !song.liked;
                if song.liked {
                    song.disliked = false;
                }
                tracing::debug!(song_id = id, liked = song.liked, "Toggled song like");
            } else {
                tracing::warn!(song_id = id, "Like toggle for unknown song");
            }
        })
        .await;
    }

    /// Toggle the disliked flag on a song. Disliking clears a standing like.
    pub async fn dislike_song(&self, id: SongId) {
        self.mutate(|s| {
            if let Some(song) = s.song_mut(id) {
                song.disliked = !song.disliked;
                if song.disliked {
                    song.liked = false;
                }
                tracing::debug!(song_id = id, disliked = song.disliked, "Toggled song dislike");
            } else {
                tracing::warn!(song_id = id, "Dislike toggle for unknown song");
            }
        })
        .await;
    }
}

#[cfg(test)]
mod tests {
    use crate::controller::PlaybackController;
    use crate::model::{PlayerStore, Song};

    fn song(id: u64) -> Song {
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
    async fn like_updates_current_song_and_queue_together() {
        let controller = PlaybackController::untracked(PlayerStore::new());
        let list = vec![song(1), song(2), song(3)];
        controller.play_song(song(2), Some(list), None).await;

        controller.store().like_song(2).await;

        let snap = controller.store().snapshot().await;
        let current = snap.current_song.unwrap();
        assert!(current.liked);
        assert!(!current.disliked);
        let in_queue = snap.queue.iter().find(|s| s.id == 2).unwrap();
        assert!(in_queue.liked);
        assert!(!in_queue.disliked);
    }

    #[tokio::test]
    async fn like_then_dislike_clears_the_opposite_flag() {
        let store = PlayerStore::new();
        store.add_to_up_next(song(7)).await;

        store.like_song(7).await;
        let snap = store.snapshot().await;
        assert!(snap.up_next[0].liked);

        store.dislike_song(7).await;
        let snap = store.snapshot().await;
        assert!(!snap.up_next[0].liked);
        assert!(snap.up_next[0].disliked);
    }

    #[tokio::test]
    async fn like_is_a_toggle() {
        let store = PlayerStore::new();
        store.add_to_up_next(song(4)).await;

        store.like_song(4).await;
        store.like_song(4).await;

        let snap = store.snapshot().await;
        assert!(!snap.up_next[0].liked);
        assert!(!snap.up_next[0].disliked);
    }

    #[tokio::test]
    async fn preference_toggle_for_unknown_song_is_a_noop() {
        let store = PlayerStore::new();
        store.like_song(999).await;
        let snap = store.snapshot().await;
        assert!(snap.queue.is_empty());
        assert!(snap.current_song.is_none());
    }
}
