//! Error taxonomy shared by the playback core.
//!
//! End of a playlist is a defined outcome (`Step::End`), never an error.

use crate::library::TrackId;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlayerError {
    /// Bad construction parameters. A caller bug, never retried.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A track, album or playlist could not be found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Persisted data was malformed or carried an unknown schema version.
    #[error("failed to deserialize: {0}")]
    Deserialization(String),

    /// The output primitive could not open or play a track.
    #[error("playback of track {track} failed: {reason}")]
    Playback { track: TrackId, reason: String },

    /// The audio device could not be opened or the engine thread is gone.
    #[error("audio output unavailable: {0}")]
    Output(String),
}

impl From<serde_json::Error> for PlayerError {
    fn from(e: serde_json::Error) -> Self {
        Self::Deserialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PlayerError>;
