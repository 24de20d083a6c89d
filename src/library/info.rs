use super::model::{Album, AlbumId, Track, TrackId};

/// Read-only view over a media library.
///
/// The playback core only ever queries through this trait; how the library is
/// discovered and indexed is up to the implementation.
pub trait AudioInfo: Send + Sync {
    fn albums(&self) -> Vec<Album>;

    fn album(&self, id: AlbumId) -> Option<Album>;

    /// Tracks of `album` in album order. Identifiers that no longer resolve are skipped.
    fn album_tracks(&self, album: &Album) -> Vec<Track>;

    fn track(&self, id: TrackId) -> Option<Track>;

    fn search_tracks(&self, query: &str) -> Vec<Track>;

    fn recently_added_tracks(&self) -> Vec<Track>;

    fn favorite_tracks(&self) -> Vec<Track>;
}
