//! Playback transition methods
//!
//! Every method funnels its state change through the store's `mutate`, then
//! fires the matching tracking call on a detached task so a slow or dead
//! analytics backend never stalls a transition.

use crate::model::{PlayContext, PlaybackState, RepeatMode, Song, SongId};
use crate::tracker::api::{EndReason, SessionApi};

use super::PlaybackController;

/// What `handle_song_end` decided to do, for the tracking follow-up.
enum EndAction {
    /// `Repeat::Once`: the external element restarts the same song.
    Restart,
    /// A new song starts playing.
    Play {
        sha_id: String,
        context: Option<PlayContext>,
    },
    /// End of queue with repeat off; playback pauses in place.
    Stop,
}

impl<A: SessionApi> PlaybackController<A> {
    /// Play `song`, rebuilding the queue from `list` (or just the song
    /// itself).
    ///
    /// Calling this with the song that is already current toggles
    /// play/pause in place: no queue rebuild, no session restart, no
    /// version bump.
    pub async fn play_song(
        &self,
        song: Song,
        list: Option<Vec<Song>>,
        context: Option<PlayContext>,
    ) {
        let is_current = self.store.read(|s| s.current == Some(song.id)).await;
        if is_current {
            tracing::debug!(song_id = song.id, "Song already current, toggling play/pause");
            self.toggle_play_pause().await;
            return;
        }

        let song_id = song.id;
        let sha_id = song.hash_id.clone();
        let tracking_context = context.clone();
        let list = list.unwrap_or_else(|| vec![song.clone()]);

        tracing::info!(
            song_id,
            title = %song.title,
            list_len = list.len(),
            context = ?context.as_ref().map(|c| c.kind),
            "Playing song"
        );

        self.store
            .mutate(move |s| {
                let ids: Vec<SongId> = list.iter().map(|entry| entry.id).collect();
                s.intern(list);
                s.intern([song]);
                let shuffle = s.queue.shuffle_enabled();
                s.queue.set_queue(ids, Some(song_id), shuffle);
                s.current = Some(song_id);
                s.playback = PlaybackState::Playing;
                s.context = context;
                s.playback_version += 1;
                s.position_ms = 0;
            })
            .await;

        if let Some(tracker) = &self.tracker {
            let tracker = tracker.clone();
            tokio::spawn(async move {
                tracker
                    .track_play_start(&sha_id, tracking_context.as_ref(), 0)
                    .await;
            });
        }
    }

    /// Flip Playing/Paused. No other state changes.
    pub async fn toggle_play_pause(&self) {
        let transition = self
            .store
            .mutate(|s| match s.playback {
                PlaybackState::Playing => {
                    s.playback = PlaybackState::Paused;
                    Some((false, s.position_ms))
                }
                PlaybackState::Paused => {
                    s.playback = PlaybackState::Playing;
                    Some((true, s.position_ms))
                }
                PlaybackState::Idle => None,
            })
            .await;

        let Some((resumed, position_ms)) = transition else {
            return;
        };
        tracing::debug!(resumed, position_ms, "Toggled play/pause");

        if let Some(tracker) = &self.tracker {
            let tracker = tracker.clone();
            tokio::spawn(async move {
                if resumed {
                    tracker.track_resume(position_ms).await;
                } else {
                    tracker.track_pause(position_ms).await;
                }
            });
        }
    }

    /// User-initiated skip forward.
    ///
    /// Consumes the up-next head first; otherwise advances the main queue
    /// with wraparound. Deliberately does not special-case `Repeat::Once` -
    /// a manual skip always moves on.
    pub async fn play_next(&self) {
        let next = self
            .store
            .mutate(|s| {
                let skipped_at = s.position_ms;
                if let Some(id) = s.up_next.pop() {
                    tracing::debug!(song_id = id, "Playing from up-next queue");
                    s.current = Some(id);
                    s.playback = PlaybackState::Playing;
                    s.position_ms = 0;
                    return s
                        .song(id)
                        .map(|song| (song.hash_id.clone(), s.context.clone(), skipped_at));
                }
                if s.queue.is_empty() {
                    return None;
                }
                s.queue.advance(1);
                let id = s.queue.current()?;
                s.current = Some(id);
                s.playback = PlaybackState::Playing;
                s.position_ms = 0;
                s.song(id)
                    .map(|song| (song.hash_id.clone(), s.context.clone(), skipped_at))
            })
            .await;

        self.track_skip(next).await;
    }

    /// User-initiated skip backward, always through the main queue.
    pub async fn play_previous(&self) {
        let next = self
            .store
            .mutate(|s| {
                let skipped_at = s.position_ms;
                if s.queue.is_empty() {
                    return None;
                }
                s.queue.advance(-1);
                let id = s.queue.current()?;
                s.current = Some(id);
                s.playback = PlaybackState::Playing;
                s.position_ms = 0;
                s.song(id)
                    .map(|song| (song.hash_id.clone(), s.context.clone(), skipped_at))
            })
            .await;

        self.track_skip(next).await;
    }

    /// The external audio element reported that the track finished.
    ///
    /// Policy, in priority order: `Repeat::Once` leaves the queue alone and
    /// stays Playing (the element restarts the song); then the up-next
    /// queue; then `Repeat::All` wraparound; then `Repeat::Off`, which
    /// pauses in place at the last index.
    pub async fn handle_song_end(&self, position_ms: u64) {
        let action = self
            .store
            .mutate(|s| {
                if s.repeat == RepeatMode::Once {
                    s.position_ms = 0;
                    return EndAction::Restart;
                }
                if let Some(id) = s.up_next.pop() {
                    s.current = Some(id);
                    s.playback = PlaybackState::Playing;
                    s.position_ms = 0;
                    return match s.song(id) {
                        Some(song) => EndAction::Play {
                            sha_id: song.hash_id.clone(),
                            context: s.context.clone(),
                        },
                        None => EndAction::Stop,
                    };
                }
                if s.queue.is_empty() {
                    s.playback = PlaybackState::Paused;
                    return EndAction::Stop;
                }
                if s.repeat == RepeatMode::Off && s.queue.at_last_index() {
                    tracing::debug!("Reached end of queue, pausing");
                    s.playback = PlaybackState::Paused;
                    return EndAction::Stop;
                }
                s.queue.advance(1);
                let next = s
                    .queue
                    .current()
                    .and_then(|id| s.song(id))
                    .map(|song| (song.id, song.hash_id.clone()));
                match next {
                    Some((id, sha_id)) => {
                        s.current = Some(id);
                        s.playback = PlaybackState::Playing;
                        s.position_ms = 0;
                        EndAction::Play {
                            sha_id,
                            context: s.context.clone(),
                        }
                    }
                    None => {
                        s.playback = PlaybackState::Paused;
                        EndAction::Stop
                    }
                }
            })
            .await;

        if let Some(tracker) = &self.tracker {
            let tracker = tracker.clone();
            tokio::spawn(async move {
                tracker.track_song_complete(position_ms).await;
                if let EndAction::Play { sha_id, context } = action {
                    tracker.track_play_start(&sha_id, context.as_ref(), 0).await;
                }
            });
        }
    }

    /// Position tick from the audio element.
    pub async fn handle_time_update(&self, position_ms: u64) {
        if let Some(tracker) = &self.tracker {
            tracker.note_position(position_ms);
        }
        self.store.mutate(|s| s.position_ms = position_ms).await;
    }

    /// User-initiated seek in the audio element.
    pub async fn handle_seek(&self, position_ms: u64) {
        self.store.mutate(|s| s.position_ms = position_ms).await;

        if let Some(tracker) = &self.tracker {
            let tracker = tracker.clone();
            tokio::spawn(async move {
                tracker.track_seek(position_ms).await;
            });
        }
    }

    /// Cycle off -> all -> once -> off.
    pub async fn toggle_repeat(&self) -> RepeatMode {
        self.store
            .mutate(|s| {
                s.repeat = s.repeat.next();
                tracing::debug!(repeat = ?s.repeat, "Repeat mode changed");
                s.repeat
            })
            .await
    }

    /// Delegates to the queue; playback state is untouched.
    pub async fn toggle_shuffle(&self) -> bool {
        self.store
            .mutate(|s| {
                let enabled = s.queue.toggle_shuffle();
                tracing::debug!(enabled, "Shuffle toggled");
                enabled
            })
            .await
    }

    /// Append a song to the up-next queue.
    pub async fn add_to_up_next(&self, song: Song) {
        self.store.add_to_up_next(song).await;
    }

    async fn track_skip(&self, next: Option<(String, Option<PlayContext>, u64)>) {
        let (Some((sha_id, context, skipped_at)), Some(tracker)) = (next, &self.tracker) else {
            return;
        };
        let tracker = tracker.clone();
        tokio::spawn(async move {
            tracker.track_song_end(skipped_at, EndReason::UserSkip).await;
            tracker.track_play_start(&sha_id, context.as_ref(), 0).await;
        });
    }
}
