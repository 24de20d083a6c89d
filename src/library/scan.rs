use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use lofty::file::{AudioFile, TaggedFileExt};
use lofty::tag::{Accessor, ItemKey};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::LibrarySettings;

use super::model::{AlbumId, Track, TrackSource};

pub(super) const UNKNOWN_ALBUM: &str = "Unknown Album";

fn is_audio_file(path: &Path, settings: &LibrarySettings) -> bool {
    let exts: Vec<String> = settings
        .extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect();

    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            exts.iter().any(|e| e == &ext)
        })
        .unwrap_or(false)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

fn non_empty(v: Option<impl AsRef<str>>) -> Option<String> {
    v.map(|s| s.as_ref().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Album title used when the file carries no album tag: the name of the
/// directory it lives in.
fn fallback_album_title(path: &Path) -> String {
    path.parent()
        .and_then(|p| p.file_name())
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| UNKNOWN_ALBUM.to_string())
}

fn read_track(path: &Path) -> Option<Track> {
    let mut title = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("UNKNOWN")
        .to_string();
    let mut artist = String::new();
    let mut album_title = fallback_album_title(path);
    let mut track_number = 0;
    let mut duration_secs = 0.0;
    let mut lyrics = None;

    match lofty::read_from_path(path) {
        Ok(tagged) => {
            duration_secs = tagged.properties().duration().as_secs_f64();

            if let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) {
                if let Some(v) = non_empty(tag.title()) {
                    title = v;
                }
                if let Some(v) = non_empty(tag.artist()) {
                    artist = v;
                }
                if let Some(v) = non_empty(tag.album()) {
                    album_title = v;
                }
                if let Some(n) = tag.track() {
                    track_number = n;
                }
                lyrics = non_empty(tag.get_string(&ItemKey::Lyrics));
            }
        }
        Err(e) => debug!(path = %path.display(), error = %e, "no readable tags"),
    }

    let date_added: DateTime<Utc> = fs::metadata(path)
        .and_then(|m| m.modified())
        .map(DateTime::<Utc>::from)
        .unwrap_or_default();

    let album_id = AlbumId::from_parts(&artist, &album_title);

    let built = Track::builder()
        .path(path)
        .title(title)
        .artist(artist)
        .album_id(album_id)
        .album_title(album_title)
        .track_number(track_number)
        .duration_secs(duration_secs)
        .lyrics(lyrics)
        .date_added(date_added)
        .date_first_played(date_added)
        .source(TrackSource::Album(album_id))
        .build();

    match built {
        Ok(track) => Some(track),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "skipping file");
            None
        }
    }
}

/// Walk `dir` and read every audio file into a `Track`.
///
/// Unreadable tags are not an error: the file name stands in for the title.
pub fn scan(dir: &Path, settings: &LibrarySettings) -> Vec<Track> {
    let mut tracks: Vec<Track> = Vec::new();

    let mut walker = WalkDir::new(dir).follow_links(settings.follow_links);

    // Non-recursive = only the root directory.
    let depth_cap = if settings.recursive {
        settings.max_depth
    } else {
        Some(1)
    };
    if let Some(d) = depth_cap {
        walker = walker.max_depth(d);
    }

    for entry in walker
        .into_iter()
        .filter_entry(|e| settings.include_hidden || e.depth() == 0 || !is_hidden(e.path()))
        .filter_map(Result::ok)
    {
        let path = entry.path();
        if path.is_file()
            && (settings.include_hidden || !is_hidden(path))
            && is_audio_file(path, settings)
        {
            if let Some(track) = read_track(path) {
                tracks.push(track);
            }
        }
    }

    tracks.sort_by(|a, b| a.display().to_lowercase().cmp(&b.display().to_lowercase()));
    debug!(dir = %dir.display(), count = tracks.len(), "library scan finished");
    tracks
}
