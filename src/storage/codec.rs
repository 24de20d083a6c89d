use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::audio::{PlayOrder, PlayerStateSnapshot, Playlist, PlaylistKind};
use crate::error::{PlayerError, Result};
use crate::library::{AlbumId, Track, TrackId, TrackSorting, TrackSource};

use super::state::AppState;

pub const FORMAT_VERSION: u32 = 1;

const KIND_TRACK: &str = "track";
const KIND_TRACK_LIST: &str = "track-list";
const KIND_PLAYLIST: &str = "playlist";
const KIND_STATE: &str = "state";

#[derive(Serialize)]
struct EnvelopeOut<'a, T> {
    kind: &'a str,
    version: u32,
    data: T,
}

#[derive(Deserialize)]
struct EnvelopeIn {
    kind: String,
    version: u32,
    data: serde_json::Value,
}

fn encode<T: Serialize>(kind: &str, data: T) -> Result<String> {
    let envelope = EnvelopeOut {
        kind,
        version: FORMAT_VERSION,
        data,
    };
    Ok(serde_json::to_string_pretty(&envelope)?)
}

fn decode<T: DeserializeOwned>(kind: &str, text: &str) -> Result<T> {
    let envelope: EnvelopeIn = serde_json::from_str(text)?;
    if envelope.kind != kind {
        return Err(PlayerError::Deserialization(format!(
            "expected a '{kind}' document, found '{}'",
            envelope.kind
        )));
    }
    if envelope.version != FORMAT_VERSION {
        return Err(PlayerError::Deserialization(format!(
            "unsupported {kind} version {} (only {FORMAT_VERSION} is known)",
            envelope.version
        )));
    }
    Ok(serde_json::from_value(envelope.data)?)
}

/// Builder validation failures inside a document are decoding failures.
fn invalid(e: PlayerError) -> PlayerError {
    match e {
        PlayerError::Deserialization(_) => e,
        other => PlayerError::Deserialization(other.to_string()),
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct TrackV1 {
    id: TrackId,
    title: String,
    artist: String,
    album_id: AlbumId,
    album_title: String,
    duration_secs: f64,
    track_number: u32,
    path: PathBuf,
    cover: Option<String>,
    lyrics: Option<String>,
    date_added: DateTime<Utc>,
    date_first_played: DateTime<Utc>,
    date_last_played: Option<DateTime<Utc>>,
    #[serde(default)]
    last_played_position: f64,
    source: TrackSource,
}

impl From<&Track> for TrackV1 {
    fn from(t: &Track) -> Self {
        Self {
            id: t.id(),
            title: t.title().to_string(),
            artist: t.artist().to_string(),
            album_id: t.album_id(),
            album_title: t.album_title().to_string(),
            duration_secs: t.duration_secs(),
            track_number: t.track_number(),
            path: t.path().to_path_buf(),
            cover: t.cover().map(str::to_string),
            lyrics: t.lyrics().map(str::to_string),
            date_added: t.date_added(),
            date_first_played: t.date_first_played(),
            date_last_played: t.date_last_played(),
            last_played_position: t.last_played_position(),
            source: t.source().clone(),
        }
    }
}

impl TryFrom<TrackV1> for Track {
    type Error = PlayerError;

    fn try_from(v: TrackV1) -> Result<Track> {
        Track::builder()
            .id(v.id)
            .title(v.title)
            .artist(v.artist)
            .album_id(v.album_id)
            .album_title(v.album_title)
            .duration_secs(v.duration_secs)
            .track_number(v.track_number)
            .path(v.path)
            .cover(v.cover)
            .lyrics(v.lyrics)
            .date_added(v.date_added)
            .date_first_played(v.date_first_played)
            .date_last_played(v.date_last_played)
            .last_played_position(v.last_played_position)
            .source(v.source)
            .build()
            .map_err(invalid)
    }
}

fn tracks_from_v1(tracks: Vec<TrackV1>) -> Result<Vec<Track>> {
    tracks.into_iter().map(Track::try_from).collect()
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct PlaylistV1 {
    name: String,
    tracks: Vec<TrackV1>,
    playing_position: Option<usize>,
    #[serde(default)]
    sorting: TrackSorting,
    #[serde(default)]
    temporary: bool,
    #[serde(default)]
    kind: PlaylistKind,
}

impl From<&Playlist> for PlaylistV1 {
    fn from(p: &Playlist) -> Self {
        Self {
            name: p.name().to_string(),
            tracks: p.tracks().iter().map(TrackV1::from).collect(),
            playing_position: p.playing_position(),
            sorting: p.sorting(),
            temporary: p.is_temporary(),
            kind: p.kind(),
        }
    }
}

impl TryFrom<PlaylistV1> for Playlist {
    type Error = PlayerError;

    fn try_from(v: PlaylistV1) -> Result<Playlist> {
        let tracks = tracks_from_v1(v.tracks)?;
        if tracks.is_empty() && v.playing_position.is_some() {
            return Err(PlayerError::Deserialization(format!(
                "playlist '{}' is empty but has a playing position",
                v.name
            )));
        }
        // Tracks are stored already sorted; rebuilding must not move them.
        let mut builder = Playlist::builder(v.name)
            .tracks(tracks)
            .temporary(v.temporary)
            .kind(v.kind);
        if let Some(pos) = v.playing_position {
            builder = builder.start_index(pos);
        }
        let playlist = builder.build().map_err(invalid)?;
        Ok(playlist.with_sorting_label(v.sorting))
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct PlayerStateV1 {
    playlist: Option<PlaylistV1>,
    play_order: PlayOrder,
    muted: bool,
    volume: f32,
    position_secs: f64,
}

impl From<&PlayerStateSnapshot> for PlayerStateV1 {
    fn from(s: &PlayerStateSnapshot) -> Self {
        Self {
            playlist: s.playlist.as_ref().map(PlaylistV1::from),
            play_order: s.play_order,
            muted: s.muted,
            volume: s.volume,
            position_secs: s.position_secs,
        }
    }
}

impl TryFrom<PlayerStateV1> for PlayerStateSnapshot {
    type Error = PlayerError;

    fn try_from(v: PlayerStateV1) -> Result<PlayerStateSnapshot> {
        if !v.volume.is_finite() || !v.position_secs.is_finite() {
            return Err(PlayerError::Deserialization(
                "volume and position must be finite".to_string(),
            ));
        }
        Ok(PlayerStateSnapshot {
            playlist: v.playlist.map(Playlist::try_from).transpose()?,
            play_order: v.play_order,
            muted: v.muted,
            volume: v.volume.clamp(0.0, 1.0),
            position_secs: v.position_secs.max(0.0),
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct AppStateV1 {
    player: PlayerStateV1,
    #[serde(default)]
    history: Vec<TrackV1>,
    #[serde(default)]
    user_playlists: Vec<PlaylistV1>,
    #[serde(default)]
    favorites: Vec<TrackId>,
}

pub fn encode_track(track: &Track) -> Result<String> {
    encode(KIND_TRACK, TrackV1::from(track))
}

pub fn decode_track(text: &str) -> Result<Track> {
    Track::try_from(decode::<TrackV1>(KIND_TRACK, text)?)
}

pub fn encode_track_list(tracks: &[Track]) -> Result<String> {
    let list: Vec<TrackV1> = tracks.iter().map(TrackV1::from).collect();
    encode(KIND_TRACK_LIST, list)
}

pub fn decode_track_list(text: &str) -> Result<Vec<Track>> {
    tracks_from_v1(decode(KIND_TRACK_LIST, text)?)
}

pub fn encode_playlist(playlist: &Playlist) -> Result<String> {
    encode(KIND_PLAYLIST, PlaylistV1::from(playlist))
}

pub fn decode_playlist(text: &str) -> Result<Playlist> {
    Playlist::try_from(decode::<PlaylistV1>(KIND_PLAYLIST, text)?)
}

/// Temporary user playlists are dropped on the way out.
pub fn encode_state(state: &AppState) -> Result<String> {
    let v1 = AppStateV1 {
        player: PlayerStateV1::from(&state.player),
        history: state.history.iter().map(TrackV1::from).collect(),
        user_playlists: state
            .user_playlists
            .iter()
            .filter(|p| !p.is_temporary())
            .map(PlaylistV1::from)
            .collect(),
        favorites: state.favorites.clone(),
    };
    encode(KIND_STATE, v1)
}

pub fn decode_state(text: &str) -> Result<AppState> {
    let v1: AppStateV1 = decode(KIND_STATE, text)?;
    let user_playlists = v1
        .user_playlists
        .into_iter()
        .map(Playlist::try_from)
        .collect::<Result<Vec<_>>>()?;
    Ok(AppState {
        player: PlayerStateSnapshot::try_from(v1.player)?,
        history: tracks_from_v1(v1.history)?,
        user_playlists: user_playlists
            .into_iter()
            .filter(|p| !p.is_temporary())
            .collect(),
        favorites: v1.favorites,
    })
}
