//! Media library: track and album entities, sorting, and the read-only
//! `AudioInfo` query interface the playback core consumes.
//!
//! `LocalLibrary` is the concrete implementation used by the binary; it scans
//! a directory with `walkdir` and reads tags with `lofty`.

mod favorites;
mod info;
mod local;
mod model;
mod scan;
mod sorting;

pub use favorites::Favorites;
pub use info::AudioInfo;
pub use local::{LocalLibrary, RECENTLY_ADDED_LIMIT, fuzzy_match_positions};
pub use model::{Album, AlbumId, Track, TrackBuilder, TrackId, TrackSource};
pub use scan::scan;
pub use sorting::{TrackComparator, TrackSorting, sort_tracks, sort_tracks_by};

#[cfg(test)]
mod tests;
