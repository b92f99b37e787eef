//! Model module - player state and data types
//!
//! - `song`: core vocabulary (songs, repeat modes, play contexts)
//! - `state`: normalized player state and subscriber snapshots
//! - `store`: the observable store wrapping the state

mod song;
mod state;
mod store;

pub use song::{PlayContext, PlayContextKind, PlaybackState, RepeatMode, Song, SongId};
pub use state::{PlayerSnapshot, PlayerState};
pub use store::PlayerStore;
