//! Recently played tracks, newest first.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::library::Track;

use super::playlist::Playlist;

/// Name of the synthesized playlist built from the play history.
pub const RECENTLY_PLAYED: &str = "Recently Played";

pub const DEFAULT_HISTORY_CAPACITY: usize = 30;

/// Bounded, duplicate-free list of recently played tracks.
///
/// Shared between the engine thread (which records plays) and the UI (which
/// reads it), so every operation goes through an internal lock.
#[derive(Debug)]
pub struct PlayHistory {
    inner: Mutex<Inner>,
}

#[derive(Debug)]
struct Inner {
    tracks: Vec<Track>,
    capacity: usize,
}

impl Default for PlayHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl PlayHistory {
    /// A capacity of 0 is treated as 1.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                tracks: Vec::new(),
                capacity: capacity.max(1),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a play: any earlier occurrence is removed, the track goes to the
    /// front and the oldest entries beyond capacity are dropped.
    pub fn add(&self, track: &Track) {
        let mut inner = self.lock();
        inner.tracks.retain(|t| t != track);
        inner.tracks.insert(0, track.clone());
        let cap = inner.capacity;
        inner.tracks.truncate(cap);
    }

    /// Drop the newest entry and return the new head, the track played before it.
    ///
    /// With fewer than two entries there is nothing earlier; the history is
    /// left untouched and `None` is returned.
    pub fn previous(&self) -> Option<Track> {
        let mut inner = self.lock();
        if inner.tracks.len() < 2 {
            return None;
        }
        let dropped = inner.tracks.remove(0);
        debug!(track = %dropped.display(), "dropped newest history entry");
        inner.tracks.first().cloned()
    }

    pub fn first(&self) -> Option<Track> {
        self.lock().tracks.first().cloned()
    }

    pub fn tracks(&self) -> Vec<Track> {
        self.lock().tracks.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().tracks.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.lock().capacity
    }

    /// Shrinking the capacity trims the oldest entries immediately.
    pub fn set_capacity(&self, capacity: usize) {
        let mut inner = self.lock();
        inner.capacity = capacity.max(1);
        let cap = inner.capacity;
        inner.tracks.truncate(cap);
    }

    /// Replace the whole history, e.g. with a restored one. Duplicates keep
    /// their first (newest) occurrence.
    pub fn replace(&self, tracks: Vec<Track>) {
        let mut inner = self.lock();
        let mut deduped: Vec<Track> = Vec::with_capacity(tracks.len());
        for t in tracks {
            if !deduped.contains(&t) {
                deduped.push(t);
            }
        }
        let cap = inner.capacity;
        deduped.truncate(cap);
        inner.tracks = deduped;
    }

    pub fn clear(&self) {
        self.lock().tracks.clear();
    }

    /// The history as a temporary playlist, cursor on the newest entry.
    /// `None` while nothing has been played.
    pub fn recently_played_playlist(&self) -> Option<Playlist> {
        let tracks = self.tracks();
        if tracks.is_empty() {
            return None;
        }
        Playlist::builder(RECENTLY_PLAYED)
            .tracks(tracks)
            .temporary(true)
            .build()
            .ok()
    }
}
