//! Track and album entities.
//!
//! A `Track` is an immutable description of one piece of media. It can only be
//! produced through `TrackBuilder`, which validates at `build()`. Two tracks are
//! equal when their identifiers are equal, whatever their metadata says.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use xxhash_rust::xxh64::xxh64;

use crate::error::{PlayerError, Result};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(pub u64);

impl TrackId {
    /// Stable identifier derived from a file location.
    pub fn from_path(path: &Path) -> Self {
        Self(xxh64(path.to_string_lossy().as_bytes(), 0))
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlbumId(pub u64);

impl AlbumId {
    /// Albums are keyed by artist and title; the same title by two artists is two albums.
    pub fn from_parts(artist: &str, title: &str) -> Self {
        let key = format!("{}\u{0}{}", artist.trim().to_lowercase(), title.trim().to_lowercase());
        Self(xxh64(key.as_bytes(), 0))
    }
}

impl fmt::Display for AlbumId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Where a track naturally comes from. Used to rebuild a playable list around
/// a track recalled from history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "kebab-case")]
pub enum TrackSource {
    Album(AlbumId),
    Playlist(String),
}

#[derive(Debug, Clone)]
pub struct Track {
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
    last_played_position: f64,
    source: TrackSource,
}

impl Track {
    pub fn builder() -> TrackBuilder {
        TrackBuilder::default()
    }

    pub fn id(&self) -> TrackId {
        self.id
    }
    pub fn title(&self) -> &str {
        &self.title
    }
    pub fn artist(&self) -> &str {
        &self.artist
    }
    pub fn album_id(&self) -> AlbumId {
        self.album_id
    }
    pub fn album_title(&self) -> &str {
        &self.album_title
    }
    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }
    pub fn track_number(&self) -> u32 {
        self.track_number
    }
    pub fn path(&self) -> &Path {
        &self.path
    }
    pub fn cover(&self) -> Option<&str> {
        self.cover.as_deref()
    }
    pub fn lyrics(&self) -> Option<&str> {
        self.lyrics.as_deref()
    }
    pub fn date_added(&self) -> DateTime<Utc> {
        self.date_added
    }
    pub fn date_first_played(&self) -> DateTime<Utc> {
        self.date_first_played
    }
    pub fn date_last_played(&self) -> Option<DateTime<Utc>> {
        self.date_last_played
    }
    pub fn last_played_position(&self) -> f64 {
        self.last_played_position
    }
    pub fn source(&self) -> &TrackSource {
        &self.source
    }

    /// The same track, attributed to another source.
    pub fn with_source(&self, source: TrackSource) -> Track {
        Track {
            source,
            ..self.clone()
        }
    }

    /// "Artist - Title", or just the title when the artist is unknown.
    pub fn display(&self) -> String {
        let artist = self.artist.trim();
        if artist.is_empty() {
            self.title.clone()
        } else {
            format!("{} - {}", artist, self.title)
        }
    }
}

impl PartialEq for Track {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Track {}

impl Hash for Track {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Mutable staging object for `Track`.
///
/// Fields are collected with chained setters; nothing is validated until
/// `build()`. When no identifier is given, one is derived from the path.
#[derive(Debug, Clone, Default)]
pub struct TrackBuilder {
    id: Option<TrackId>,
    title: String,
    artist: String,
    album_id: Option<AlbumId>,
    album_title: String,
    duration_secs: f64,
    track_number: u32,
    path: PathBuf,
    cover: Option<String>,
    lyrics: Option<String>,
    date_added: DateTime<Utc>,
    date_first_played: DateTime<Utc>,
    date_last_played: Option<DateTime<Utc>>,
    last_played_position: f64,
    source: Option<TrackSource>,
}

impl TrackBuilder {
    /// Start from an existing track, keeping every field.
    pub fn from_prototype(track: &Track) -> Self {
        Self {
            id: Some(track.id),
            title: track.title.clone(),
            artist: track.artist.clone(),
            album_id: Some(track.album_id),
            album_title: track.album_title.clone(),
            duration_secs: track.duration_secs,
            track_number: track.track_number,
            path: track.path.clone(),
            cover: track.cover.clone(),
            lyrics: track.lyrics.clone(),
            date_added: track.date_added,
            date_first_played: track.date_first_played,
            date_last_played: track.date_last_played,
            last_played_position: track.last_played_position,
            source: Some(track.source.clone()),
        }
    }

    pub fn id(mut self, id: TrackId) -> Self {
        self.id = Some(id);
        self
    }
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
    pub fn artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = artist.into();
        self
    }
    pub fn album_id(mut self, id: AlbumId) -> Self {
        self.album_id = Some(id);
        self
    }
    pub fn album_title(mut self, title: impl Into<String>) -> Self {
        self.album_title = title.into();
        self
    }
    pub fn duration_secs(mut self, secs: f64) -> Self {
        self.duration_secs = secs;
        self
    }
    pub fn track_number(mut self, n: u32) -> Self {
        self.track_number = n;
        self
    }
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = path.into();
        self
    }
    pub fn cover(mut self, cover: Option<String>) -> Self {
        self.cover = cover;
        self
    }
    pub fn lyrics(mut self, lyrics: Option<String>) -> Self {
        self.lyrics = lyrics;
        self
    }
    pub fn date_added(mut self, date: DateTime<Utc>) -> Self {
        self.date_added = date;
        self
    }
    pub fn date_first_played(mut self, date: DateTime<Utc>) -> Self {
        self.date_first_played = date;
        self
    }
    pub fn date_last_played(mut self, date: Option<DateTime<Utc>>) -> Self {
        self.date_last_played = date;
        self
    }
    pub fn last_played_position(mut self, secs: f64) -> Self {
        self.last_played_position = secs;
        self
    }
    pub fn source(mut self, source: TrackSource) -> Self {
        self.source = Some(source);
        self
    }

    pub fn build(self) -> Result<Track> {
        if !self.duration_secs.is_finite() || self.duration_secs < 0.0 {
            return Err(PlayerError::InvalidArgument(format!(
                "track duration must be a non-negative number of seconds, got {}",
                self.duration_secs
            )));
        }
        if !self.last_played_position.is_finite() || self.last_played_position < 0.0 {
            return Err(PlayerError::InvalidArgument(format!(
                "last played position must be non-negative, got {}",
                self.last_played_position
            )));
        }

        let id = match self.id {
            Some(id) => id,
            None if self.path.as_os_str().is_empty() => {
                return Err(PlayerError::InvalidArgument(
                    "track needs an identifier or a file location".to_string(),
                ));
            }
            None => TrackId::from_path(&self.path),
        };

        let album_id = self
            .album_id
            .unwrap_or_else(|| AlbumId::from_parts(&self.artist, &self.album_title));
        let source = self.source.unwrap_or(TrackSource::Album(album_id));

        Ok(Track {
            id,
            title: self.title,
            artist: self.artist,
            album_id,
            album_title: self.album_title,
            duration_secs: self.duration_secs,
            track_number: self.track_number,
            path: self.path,
            cover: self.cover,
            lyrics: self.lyrics,
            date_added: self.date_added,
            date_first_played: self.date_first_played,
            date_last_played: self.date_last_played,
            last_played_position: self.last_played_position,
            source,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Album {
    pub id: AlbumId,
    pub title: String,
    pub artist: String,
    pub cover: Option<String>,
    /// Track identifiers in album order.
    pub track_ids: Vec<TrackId>,
}
