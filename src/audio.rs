//! Playback core: playlists and play order, play history, and the engine
//! that drives an audio output from a dedicated thread.
//!
//! UI code talks to `AudioPlayer`, which forwards `PlayerCmd` values to the
//! engine thread and exposes a shared `PlaybackHandle` plus observer
//! subscriptions for change notifications.

mod engine;
mod history;
mod observer;
pub mod order;
mod output;
mod player;
mod playlist;
mod thread;
mod types;

pub use engine::{EngineOptions, PlayerEngine, TickOutcome};
pub use history::{DEFAULT_HISTORY_CAPACITY, PlayHistory, RECENTLY_PLAYED};
pub use observer::{ChannelObserver, Observers, PlayerObserver, SubscriptionId};
pub use output::{AudioOutput, RodioOutput};
pub use player::AudioPlayer;
pub use playlist::{Playlist, PlaylistBuilder, PlaylistKind, PlaylistLookup};
pub use types::{
    PlayOrder, PlaybackHandle, PlaybackInfo, PlaybackState, PlayerCmd, PlayerEvent,
    PlayerStateSnapshot, Reply, Step,
};
