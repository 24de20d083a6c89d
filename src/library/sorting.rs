use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::model::Track;

/// How tracks are ordered when a playlist is built or re-sorted.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrackSorting {
    /// Keep the order the tracks were given in.
    None,
    /// Case-insensitive title.
    Title,
    /// Album track number, ties broken by title.
    #[default]
    #[serde(alias = "track_number", alias = "tracknum")]
    TrackNumber,
    /// Most recently added first.
    #[serde(alias = "date_added", alias = "recently-added")]
    DateAdded,
}

pub type TrackComparator = fn(&Track, &Track) -> Ordering;

impl TrackSorting {
    /// The comparator for this sorting, or `None` when the order is kept as-is.
    pub fn comparator(self) -> Option<TrackComparator> {
        match self {
            TrackSorting::None => None,
            TrackSorting::Title => Some(by_title),
            TrackSorting::TrackNumber => Some(by_track_number),
            TrackSorting::DateAdded => Some(by_date_added),
        }
    }
}

fn by_title(a: &Track, b: &Track) -> Ordering {
    a.title().to_lowercase().cmp(&b.title().to_lowercase())
}

fn by_track_number(a: &Track, b: &Track) -> Ordering {
    a.track_number()
        .cmp(&b.track_number())
        .then_with(|| by_title(a, b))
}

fn by_date_added(a: &Track, b: &Track) -> Ordering {
    b.date_added().cmp(&a.date_added())
}

/// Stable sort in place. Equal elements keep their relative order.
pub fn sort_tracks(tracks: &mut [Track], sorting: TrackSorting) {
    if let Some(cmp) = sorting.comparator() {
        sort_tracks_by(tracks, cmp);
    }
}

pub fn sort_tracks_by<F>(tracks: &mut [Track], cmp: F)
where
    F: FnMut(&Track, &Track) -> Ordering,
{
    tracks.sort_by(cmp);
}
