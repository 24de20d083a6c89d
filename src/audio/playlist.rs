//! Ordered track lists with a playback cursor.
//!
//! A `Playlist` is only constructed through `PlaylistBuilder`, which sorts the
//! tracks and places the cursor. Whenever the list is non-empty the cursor
//! points at a valid index; an empty list has no cursor.

use rand::{Rng, thread_rng};
use serde::{Deserialize, Serialize};

use crate::error::{PlayerError, Result};
use crate::library::{AlbumId, Track, TrackSorting};

use super::order::{next_index, previous_index};
use super::types::{PlayOrder, Step};

/// Where a playlist came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "kebab-case")]
pub enum PlaylistKind {
    /// Every track of one album.
    Album(AlbumId),
    /// Anything assembled by hand or by the app.
    #[default]
    Custom,
}

/// Named playlists the engine can rebuild a history entry's source from.
pub trait PlaylistLookup: Send + Sync {
    fn find_playlist(&self, name: &str) -> Option<Playlist>;
}

#[derive(Debug, Clone)]
pub struct Playlist {
    name: String,
    tracks: Vec<Track>,
    position: Option<usize>,
    sorting: TrackSorting,
    temporary: bool,
    kind: PlaylistKind,
}

impl Playlist {
    pub fn builder(name: impl Into<String>) -> PlaylistBuilder {
        PlaylistBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn contains(&self, track: &Track) -> bool {
        self.tracks.contains(track)
    }

    /// Cursor index; `None` only for an empty playlist.
    pub fn playing_position(&self) -> Option<usize> {
        self.position
    }

    pub fn playing_track(&self) -> Option<&Track> {
        self.position.and_then(|i| self.tracks.get(i))
    }

    pub fn sorting(&self) -> TrackSorting {
        self.sorting
    }

    /// Temporary playlists are synthesized by the app and never stored as user playlists.
    pub fn is_temporary(&self) -> bool {
        self.temporary
    }

    pub fn kind(&self) -> PlaylistKind {
        self.kind
    }

    pub fn is_album_playlist(&self) -> bool {
        matches!(self.kind, PlaylistKind::Album(_))
    }

    /// A copy re-sorted by `sorting`. The cursor follows the track it pointed at.
    pub fn sorted_playlist(&self, sorting: TrackSorting) -> Playlist {
        let (tracks, position) = sort_following(self.tracks.clone(), self.position, sorting);
        Playlist {
            name: self.name.clone(),
            tracks,
            position,
            sorting,
            temporary: self.temporary,
            kind: self.kind,
        }
    }

    /// Record `sorting` as the order the tracks are in, without reordering.
    /// Used when rebuilding a list that was sorted before it was stored.
    pub(crate) fn with_sorting_label(mut self, sorting: TrackSorting) -> Self {
        self.sorting = sorting;
        self
    }

    /// Move the cursor to the first occurrence of `track`.
    pub fn go_to_track(&mut self, track: &Track) -> Result<()> {
        let Some(i) = self.tracks.iter().position(|t| t == track) else {
            return Err(PlayerError::NotFound(format!(
                "track {} is not in playlist '{}'",
                track.id(),
                self.name
            )));
        };
        self.position = Some(i);
        Ok(())
    }

    pub fn go_to_index(&mut self, index: usize) -> Result<()> {
        if index >= self.tracks.len() {
            return Err(PlayerError::InvalidArgument(format!(
                "index {index} is out of bounds for playlist '{}' with {} tracks",
                self.name,
                self.tracks.len()
            )));
        }
        self.position = Some(index);
        Ok(())
    }

    pub fn advance(&mut self, order: PlayOrder) -> Step {
        self.advance_with(order, &mut thread_rng())
    }

    pub fn retreat(&mut self, order: PlayOrder) -> Step {
        self.retreat_with(order, &mut thread_rng())
    }

    /// Move forward under `order`. On `Step::End` the cursor is left where it was.
    pub fn advance_with<R: Rng + ?Sized>(&mut self, order: PlayOrder, rng: &mut R) -> Step {
        let Some(current) = self.position else {
            return Step::End;
        };
        let step = next_index(current, self.tracks.len(), order, rng);
        if let Step::Moved(i) = step {
            self.position = Some(i);
        }
        step
    }

    pub fn retreat_with<R: Rng + ?Sized>(&mut self, order: PlayOrder, rng: &mut R) -> Step {
        let Some(current) = self.position else {
            return Step::End;
        };
        let step = previous_index(current, self.tracks.len(), order, rng);
        if let Step::Moved(i) = step {
            self.position = Some(i);
        }
        step
    }
}

impl PartialEq for Playlist {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.position == other.position && self.tracks == other.tracks
    }
}

/// Builds a `Playlist`, validating the starting point.
///
/// `start_index` refers to the tracks as given, before sorting; the cursor
/// ends up on that same track once sorted. `start_track` and `start_index`
/// are mutually exclusive.
#[derive(Debug, Clone)]
pub struct PlaylistBuilder {
    name: String,
    tracks: Vec<Track>,
    start_track: Option<Track>,
    start_index: Option<usize>,
    sorting: TrackSorting,
    temporary: bool,
    kind: PlaylistKind,
}

impl PlaylistBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tracks: Vec::new(),
            start_track: None,
            start_index: None,
            sorting: TrackSorting::None,
            temporary: false,
            kind: PlaylistKind::Custom,
        }
    }

    pub fn tracks(mut self, tracks: Vec<Track>) -> Self {
        self.tracks = tracks;
        self
    }

    pub fn start_track(mut self, track: Track) -> Self {
        self.start_track = Some(track);
        self
    }

    pub fn start_index(mut self, index: usize) -> Self {
        self.start_index = Some(index);
        self
    }

    pub fn sorting(mut self, sorting: TrackSorting) -> Self {
        self.sorting = sorting;
        self
    }

    pub fn temporary(mut self, temporary: bool) -> Self {
        self.temporary = temporary;
        self
    }

    pub fn kind(mut self, kind: PlaylistKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn build(self) -> Result<Playlist> {
        let start = match (self.start_track, self.start_index) {
            (Some(_), Some(_)) => {
                return Err(PlayerError::InvalidArgument(
                    "start track and start index are mutually exclusive".to_string(),
                ));
            }
            (Some(track), None) => match self.tracks.iter().position(|t| *t == track) {
                Some(i) => Some(i),
                None => {
                    return Err(PlayerError::InvalidArgument(format!(
                        "start track {} is not part of playlist '{}'",
                        track.id(),
                        self.name
                    )));
                }
            },
            (None, Some(i)) if i >= self.tracks.len() => {
                return Err(PlayerError::InvalidArgument(format!(
                    "start index {i} is out of bounds for {} tracks",
                    self.tracks.len()
                )));
            }
            (None, Some(i)) => Some(i),
            (None, None) => None,
        };

        let (tracks, position) = sort_following(self.tracks, start, self.sorting);
        // Without a requested start, begin at the head of the sorted order.
        let position = position.or_else(|| (!tracks.is_empty()).then_some(0));
        Ok(Playlist {
            name: self.name,
            tracks,
            position,
            sorting: self.sorting,
            temporary: self.temporary,
            kind: self.kind,
        })
    }
}

/// Stable sort that reports where the element at `cursor` ended up.
fn sort_following(
    tracks: Vec<Track>,
    cursor: Option<usize>,
    sorting: TrackSorting,
) -> (Vec<Track>, Option<usize>) {
    let Some(cmp) = sorting.comparator() else {
        return (tracks, cursor);
    };
    let mut tagged: Vec<(usize, Track)> = tracks.into_iter().enumerate().collect();
    tagged.sort_by(|(_, a), (_, b)| cmp(a, b));
    let position = cursor.and_then(|c| tagged.iter().position(|(orig, _)| *orig == c));
    (tagged.into_iter().map(|(_, t)| t).collect(), position)
}
