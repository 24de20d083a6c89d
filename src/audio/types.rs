//! Audio-related small types and handles.
//!
//! This module defines the play order, engine states, the commands accepted
//! by the engine thread, the events it emits, and the shared playback info
//! handle the UI polls.

use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::config::PlayOrderSetting;
use crate::error::{PlayerError, Result};
use crate::library::Track;

use super::playlist::Playlist;

/// Policy governing how the cursor moves through a playlist.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlayOrder {
    /// Step forward, stop at the end.
    #[default]
    Normal,
    /// Jump to a random other track.
    Shuffle,
    /// Replay the current track when it ends.
    RepeatOne,
    /// Wrap around to the start of the playlist.
    RepeatAll,
}

impl PlayOrder {
    /// `Normal -> RepeatAll -> RepeatOne -> Shuffle -> Normal`.
    pub fn cycle(self) -> Self {
        match self {
            PlayOrder::Normal => PlayOrder::RepeatAll,
            PlayOrder::RepeatAll => PlayOrder::RepeatOne,
            PlayOrder::RepeatOne => PlayOrder::Shuffle,
            PlayOrder::Shuffle => PlayOrder::Normal,
        }
    }
}

impl From<PlayOrderSetting> for PlayOrder {
    fn from(s: PlayOrderSetting) -> Self {
        match s {
            PlayOrderSetting::Normal => PlayOrder::Normal,
            PlayOrderSetting::Shuffle => PlayOrder::Shuffle,
            PlayOrderSetting::RepeatOne => PlayOrder::RepeatOne,
            PlayOrderSetting::RepeatAll => PlayOrder::RepeatAll,
        }
    }
}

/// Result of moving the cursor.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Step {
    /// The cursor now points at this index.
    Moved(usize),
    /// There is nothing further in this direction. Not an error.
    End,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// Nothing is open in the output.
    #[default]
    Idle,
    /// A track is open but not advancing.
    Paused,
    Playing,
}

/// Notifications emitted by the engine, in the order the changes happened.
#[derive(Debug, Clone)]
pub enum PlayerEvent {
    StateChanged(PlaybackState),
    TimeUpdated { position_secs: f64, duration_secs: f64 },
    TrackChanged(Option<Track>),
    PlayOrderChanged(PlayOrder),
    VolumeChanged { volume: f32, muted: bool },
    PlaybackFailed(PlayerError),
}

/// What the player needs to resume where it left off.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerStateSnapshot {
    pub playlist: Option<Playlist>,
    pub play_order: PlayOrder,
    pub muted: bool,
    pub volume: f32,
    pub position_secs: f64,
}

impl Default for PlayerStateSnapshot {
    fn default() -> Self {
        Self {
            playlist: None,
            play_order: PlayOrder::Normal,
            muted: false,
            volume: 1.0,
            position_secs: 0.0,
        }
    }
}

pub type Reply<T> = Sender<Result<T>>;

#[derive(Debug)]
pub enum PlayerCmd {
    /// Replace the active playlist and start playing its current track.
    Play {
        playlist: Playlist,
        reply: Option<Reply<()>>,
    },
    /// Replace the active playlist and open its current track paused.
    Load { playlist: Playlist },
    /// Load a persisted snapshot, paused at the saved position.
    Restore(PlayerStateSnapshot),
    Pause,
    Resume,
    TogglePlayPause,
    Stop,
    Next,
    Previous,
    /// Seek to an absolute position in seconds.
    SeekTo(f64),
    /// Seek relative to the current position (seconds, positive or negative).
    JumpBy(f64),
    SetVolume(f32),
    Mute,
    Unmute,
    ToggleMute,
    SetPlayOrder(PlayOrder),
    CyclePlayOrder,
    /// Drop the newest history entry and play the one before it.
    PlayPreviousInHistory { reply: Option<Reply<bool>> },
    /// Write the current state through the configured persister.
    Persist,
    /// Quit the engine thread, optionally fading out over `fade_out_ms` milliseconds.
    Quit { fade_out_ms: u64 },
}

#[derive(Debug, Clone, Default)]
/// Runtime playback information shared with the UI.
pub struct PlaybackInfo {
    pub state: PlaybackState,
    pub track: Option<Track>,
    pub playlist_name: Option<String>,
    pub position_secs: f64,
    pub duration_secs: f64,
    pub play_order: PlayOrder,
    pub volume: f32,
    pub muted: bool,
}

pub type PlaybackHandle = Arc<Mutex<PlaybackInfo>>;
