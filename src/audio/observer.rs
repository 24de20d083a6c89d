//! Event fan-out from the engine to any number of listeners.

use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};

use super::types::PlayerEvent;

/// Receives engine notifications. Called on the engine thread, so
/// implementations should hand work off rather than block.
pub trait PlayerObserver: Send + Sync {
    fn on_event(&self, event: &PlayerEvent);
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct Registry {
    next_id: u64,
    entries: Vec<(SubscriptionId, Arc<dyn PlayerObserver>)>,
}

/// Registered observers. Shared between the engine and the player handle so
/// subscribing does not have to wait behind queued commands.
#[derive(Default)]
pub struct Observers {
    registry: Mutex<Registry>,
}

impl fmt::Debug for Observers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers").field("len", &self.len()).finish()
    }
}

impl Observers {
    pub fn subscribe(&self, observer: Arc<dyn PlayerObserver>) -> SubscriptionId {
        let mut reg = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        let id = SubscriptionId(reg.next_id);
        reg.next_id += 1;
        reg.entries.push((id, observer));
        id
    }

    /// Returns `false` if `id` was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut reg = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        let before = reg.entries.len();
        reg.entries.retain(|(sid, _)| *sid != id);
        reg.entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn emit(&self, event: &PlayerEvent) {
        // Snapshot the list so observers may (un)subscribe from inside a callback.
        let observers: Vec<Arc<dyn PlayerObserver>> = {
            let reg = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
            reg.entries.iter().map(|(_, o)| o.clone()).collect()
        };
        for o in observers {
            o.on_event(event);
        }
    }
}

/// Forwards every event into a channel, for consumers with their own loop.
pub struct ChannelObserver {
    tx: Sender<PlayerEvent>,
}

impl ChannelObserver {
    pub fn new() -> (Self, Receiver<PlayerEvent>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx }, rx)
    }
}

impl PlayerObserver for ChannelObserver {
    fn on_event(&self, event: &PlayerEvent) {
        // A dropped receiver just means nobody is listening anymore.
        let _ = self.tx.send(event.clone());
    }
}
