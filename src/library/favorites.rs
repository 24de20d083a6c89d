use std::sync::{Mutex, MutexGuard, PoisonError};

use super::model::{Track, TrackId};

/// Set of favorite track identifiers, most recently marked first.
///
/// Shared between the library (which resolves them into tracks) and the
/// runtime (which toggles them), so access goes through a lock.
#[derive(Debug, Default)]
pub struct Favorites {
    ids: Mutex<Vec<TrackId>>,
}

impl Favorites {
    pub fn new(ids: Vec<TrackId>) -> Self {
        let mut unique: Vec<TrackId> = Vec::with_capacity(ids.len());
        for id in ids {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        Self {
            ids: Mutex::new(unique),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<TrackId>> {
        self.ids.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_marked(&self, track: &Track) -> bool {
        self.lock().contains(&track.id())
    }

    /// Returns false when the track was already a favorite.
    pub fn mark(&self, track: &Track) -> bool {
        let mut ids = self.lock();
        if ids.contains(&track.id()) {
            return false;
        }
        ids.insert(0, track.id());
        true
    }

    /// Returns false when the track was not a favorite.
    pub fn unmark(&self, track: &Track) -> bool {
        let mut ids = self.lock();
        let before = ids.len();
        ids.retain(|id| *id != track.id());
        ids.len() != before
    }

    /// Flip the mark and return the new state.
    pub fn toggle(&self, track: &Track) -> bool {
        if self.unmark(track) {
            false
        } else {
            self.mark(track)
        }
    }

    pub fn ids(&self) -> Vec<TrackId> {
        self.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn poisoned_lock_keeps_the_marks() {
        let track = Track::builder()
            .path("/music/X/01 One.mp3")
            .title("One")
            .build()
            .unwrap();
        let favs = Arc::new(Favorites::new(vec![track.id()]));

        let poisoner = favs.clone();
        let _ = thread::spawn(move || {
            let _guard = poisoner.ids.lock().unwrap();
            panic!("poison the favorites lock");
        })
        .join();
        assert!(favs.ids.is_poisoned());

        assert!(favs.is_marked(&track));
        assert_eq!(favs.ids(), vec![track.id()]);
        assert!(favs.unmark(&track));
        assert!(favs.mark(&track));
    }
}
