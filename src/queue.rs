//! Queue ordering: working order, shuffle/unshuffle, and the up-next FIFO.
//!
//! All operations here are total: empty queues and missing identities fall
//! back to guarded no-ops or index 0, never an error on the playback path.

use std::collections::VecDeque;

use rand::seq::SliceRandom;

use crate::model::SongId;

/// Ordered main queue with a current-position pointer.
///
/// Keeps the pre-shuffle arrangement in `original_order` so shuffle can be
/// reversed, and relocates the pointer by song identity (not index) whenever
/// the working order changes.
#[derive(Debug, Default)]
pub struct QueueManager {
    order: Vec<SongId>,
    original_order: Vec<SongId>,
    current_index: usize,
    shuffle_enabled: bool,
}

impl QueueManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the queue from `songs`, optionally shuffled.
    ///
    /// `start` is located by identity in the resulting order; if it is not
    /// present the pointer lands on index 0.
    pub fn set_queue(&mut self, songs: Vec<SongId>, start: Option<SongId>, shuffle: bool) {
        self.original_order = songs.clone();
        self.order = songs;
        self.shuffle_enabled = shuffle;
        if shuffle {
            self.order.shuffle(&mut rand::thread_rng());
        }
        self.relocate(start);
    }

    /// Flip shuffle state, keeping the current song's identity invariant.
    ///
    /// Enabling reshuffles `original_order`; disabling restores it. Either
    /// way the pointer is relocated to wherever the current song ended up.
    pub fn toggle_shuffle(&mut self) -> bool {
        let current = self.current();
        self.shuffle_enabled = !self.shuffle_enabled;
        self.order = self.original_order.clone();
        if self.shuffle_enabled {
            self.order.shuffle(&mut rand::thread_rng());
        }
        self.relocate(current);
        self.shuffle_enabled
    }

    /// Move the pointer by `step` with wraparound. No-op on an empty queue.
    pub fn advance(&mut self, step: isize) {
        let len = self.order.len();
        if len == 0 {
            return;
        }
        let next = self.current_index as isize + step;
        self.current_index = next.rem_euclid(len as isize) as usize;
    }

    /// Song at the pointer, if the queue is non-empty.
    pub fn current(&self) -> Option<SongId> {
        self.order.get(self.current_index).copied()
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn at_last_index(&self) -> bool {
        !self.order.is_empty() && self.current_index == self.order.len() - 1
    }

    pub fn order(&self) -> &[SongId] {
        &self.order
    }

    pub fn shuffle_enabled(&self) -> bool {
        self.shuffle_enabled
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn relocate(&mut self, id: Option<SongId>) {
        self.current_index = id
            .and_then(|id| self.order.iter().position(|&s| s == id))
            .unwrap_or(0);
    }
}

/// User-inserted FIFO override, consumed before the main queue on every
/// advance.
#[derive(Debug, Default)]
pub struct UpNextQueue {
    entries: VecDeque<SongId>,
}

impl UpNextQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, id: SongId) {
        self.entries.push_back(id);
    }

    pub fn pop(&mut self) -> Option<SongId> {
        self.entries.pop_front()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = SongId> + '_ {
        self.entries.iter().copied()
    }
}
