//! Playback queue and session-tracking core for a personal music library.
//!
//! The crate is organized the same way the player behaves:
//!
//! - `model`: songs, normalized player state, and the observable store
//! - `queue`: main queue ordering, shuffle, and the up-next queue
//! - `controller`: the play/pause/next/previous state machine
//! - `tracker`: server listening-session lifecycle reporting
//! - `preferences`: like/dislike flags on the normalized song map
//! - `logging`: file-based tracing setup for host applications

pub mod controller;
pub mod logging;
pub mod model;
mod preferences;
pub mod queue;
pub mod tracker;

pub use controller::PlaybackController;
pub use model::{
    PlayContext, PlayContextKind, PlaybackState, PlayerSnapshot, PlayerStore, RepeatMode, Song,
    SongId,
};
pub use tracker::SessionTracker;
pub use tracker::api::{HttpSessionApi, SessionApi, TrackerError};
