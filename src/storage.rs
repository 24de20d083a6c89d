//! Persistence: versioned text encoding of tracks, playlists and the whole
//! app state, plus the on-disk store the binary saves to.
//!
//! Every document is a JSON envelope `{"kind": .., "version": 1, "data": ..}`.
//! Decoders accept exactly their own kind at version 1 and fail with
//! `PlayerError::Deserialization` on anything else.

mod codec;
mod state;

pub use codec::{
    FORMAT_VERSION, decode_playlist, decode_state, decode_track, decode_track_list,
    encode_playlist, encode_state, encode_track, encode_track_list,
};
pub use state::{AppState, AppStatePersister, StatePersister, StateStore, UserPlaylists};

#[cfg(test)]
mod tests;
