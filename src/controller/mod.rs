//! Controller module - the play/pause/next/previous state machine
//!
//! The controller is the only writer of queue and playback state. It is
//! organized into submodules by responsibility:
//!
//! - `playback`: playback transitions, repeat/shuffle policy, and the
//!   tracking hooks fired on each transition
//!
//! Session tracking is a composable capability: the controller is generic
//! over the [`SessionApi`] transport and runs fine with no tracker at all.

mod playback;

use crate::model::PlayerStore;
use crate::tracker::SessionTracker;
use crate::tracker::api::{HttpSessionApi, SessionApi, TrackerError};

pub struct PlaybackController<A: SessionApi> {
    pub(crate) store: PlayerStore,
    pub(crate) tracker: Option<SessionTracker<A>>,
}

impl<A: SessionApi> Clone for PlaybackController<A> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            tracker: self.tracker.clone(),
        }
    }
}

impl<A: SessionApi> PlaybackController<A> {
    pub fn new(store: PlayerStore, tracker: Option<SessionTracker<A>>) -> Self {
        Self { store, tracker }
    }

    pub fn store(&self) -> &PlayerStore {
        &self.store
    }

    /// Best-effort synchronous flush of the active session, for the page
    /// unload path. Safe to call with no tracker or no active session.
    pub fn flush_on_close(&self) {
        if let Some(tracker) = &self.tracker {
            tracker.flush_on_close();
        }
    }
}

impl PlaybackController<HttpSessionApi> {
    /// Production wiring: session tracking against the stats backend.
    pub fn with_session_api(store: PlayerStore, base_url: &str) -> Result<Self, TrackerError> {
        let api = HttpSessionApi::new(base_url)?;
        Ok(Self::new(store, Some(SessionTracker::new(api))))
    }

    /// No analytics at all; playback still works in full.
    pub fn untracked(store: PlayerStore) -> Self {
        Self::new(store, None)
    }
}
