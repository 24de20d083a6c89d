use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::config::LibrarySettings;

use super::favorites::Favorites;
use super::info::AudioInfo;
use super::model::{Album, AlbumId, Track, TrackId};
use super::scan::scan;
use super::sorting::{TrackSorting, sort_tracks};

/// How many tracks the "Recently Added" list holds.
pub const RECENTLY_ADDED_LIMIT: usize = 50;

/// In-memory library built from a directory scan.
pub struct LocalLibrary {
    tracks: Vec<Track>,
    by_id: HashMap<TrackId, usize>,
    albums: Vec<Album>,
    favorites: Arc<Favorites>,
}

impl LocalLibrary {
    pub fn scan(dir: &Path, settings: &LibrarySettings, favorites: Arc<Favorites>) -> Self {
        Self::from_tracks(scan(dir, settings), favorites)
    }

    /// Index `tracks` and group them into albums. Later duplicates of an
    /// identifier are dropped.
    pub fn from_tracks(tracks: Vec<Track>, favorites: Arc<Favorites>) -> Self {
        let mut unique: Vec<Track> = Vec::with_capacity(tracks.len());
        let mut by_id: HashMap<TrackId, usize> = HashMap::new();
        for track in tracks {
            if by_id.contains_key(&track.id()) {
                continue;
            }
            by_id.insert(track.id(), unique.len());
            unique.push(track);
        }

        let mut albums: Vec<Album> = Vec::new();
        let mut album_pos: HashMap<AlbumId, usize> = HashMap::new();
        let mut grouped: Vec<Vec<Track>> = Vec::new();
        for track in &unique {
            let pos = *album_pos.entry(track.album_id()).or_insert_with(|| {
                albums.push(Album {
                    id: track.album_id(),
                    title: track.album_title().to_string(),
                    artist: track.artist().to_string(),
                    cover: track.cover().map(str::to_string),
                    track_ids: Vec::new(),
                });
                grouped.push(Vec::new());
                albums.len() - 1
            });
            grouped[pos].push(track.clone());
        }
        for (album, mut members) in albums.iter_mut().zip(grouped) {
            sort_tracks(&mut members, TrackSorting::TrackNumber);
            album.track_ids = members.iter().map(Track::id).collect();
        }
        albums.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase()));

        Self {
            tracks: unique,
            by_id,
            albums,
            favorites,
        }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn favorites(&self) -> &Arc<Favorites> {
        &self.favorites
    }
}

impl AudioInfo for LocalLibrary {
    fn albums(&self) -> Vec<Album> {
        self.albums.clone()
    }

    fn album(&self, id: AlbumId) -> Option<Album> {
        self.albums.iter().find(|a| a.id == id).cloned()
    }

    fn album_tracks(&self, album: &Album) -> Vec<Track> {
        album
            .track_ids
            .iter()
            .filter_map(|id| self.track(*id))
            .collect()
    }

    fn track(&self, id: TrackId) -> Option<Track> {
        self.by_id.get(&id).map(|&i| self.tracks[i].clone())
    }

    fn search_tracks(&self, query: &str) -> Vec<Track> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }
        self.tracks
            .iter()
            .filter(|t| {
                let haystack =
                    format!("{} {}", t.display(), t.album_title()).to_lowercase();
                fuzzy_match_positions(&haystack, &query).is_some()
            })
            .cloned()
            .collect()
    }

    fn recently_added_tracks(&self) -> Vec<Track> {
        let mut tracks = self.tracks.clone();
        sort_tracks(&mut tracks, TrackSorting::DateAdded);
        tracks.truncate(RECENTLY_ADDED_LIMIT);
        tracks
    }

    fn favorite_tracks(&self) -> Vec<Track> {
        self.favorites
            .ids()
            .into_iter()
            .filter_map(|id| self.track(id))
            .collect()
    }
}

/// Fuzzy/subsequence match: return the character positions in `title`
/// that match `query`, or `None` if not matched.
pub fn fuzzy_match_positions(title: &str, query: &str) -> Option<Vec<usize>> {
    if query.is_empty() {
        return Some(Vec::new());
    }

    let mut positions: Vec<usize> = Vec::new();
    let mut title_iter = title.chars().enumerate();

    for qc in query.chars() {
        let qc_low = qc.to_ascii_lowercase();
        loop {
            match title_iter.next() {
                Some((ti, tc)) if tc.to_ascii_lowercase() == qc_low => {
                    positions.push(ti);
                    break;
                }
                Some(_) => continue,
                None => return None,
            }
        }
    }

    Some(positions)
}
