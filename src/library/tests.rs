use super::*;
use crate::error::PlayerError;
use chrono::{TimeZone, Utc};
use std::sync::Arc;

fn t(n: u32, title: &str, album: &str) -> Track {
    Track::builder()
        .path(format!("/music/{album}/{n:02} {title}.mp3"))
        .title(title)
        .artist("Artist")
        .album_title(album)
        .track_number(n)
        .duration_secs(180.0)
        .date_added(Utc.with_ymd_and_hms(2020, 1, n, 0, 0, 0).unwrap())
        .build()
        .unwrap()
}

#[test]
fn builder_derives_stable_ids_from_path() {
    let a = t(1, "One", "X");
    let b = t(1, "One", "X");
    assert_eq!(a.id(), b.id());
    assert_eq!(a.id(), TrackId::from_path(a.path()));
    assert_eq!(a.source(), &TrackSource::Album(a.album_id()));

    let from_list = a.with_source(TrackSource::Playlist("Mine".into()));
    assert_eq!(from_list, a);
    assert_eq!(from_list.source(), &TrackSource::Playlist("Mine".into()));
    assert_eq!(from_list.title(), "One");
}

#[test]
fn builder_rejects_missing_identity_and_negative_durations() {
    let err = Track::builder().title("nowhere").build().unwrap_err();
    assert!(matches!(err, PlayerError::InvalidArgument(_)));

    let err = Track::builder()
        .path("/a.mp3")
        .duration_secs(-1.0)
        .build()
        .unwrap_err();
    assert!(matches!(err, PlayerError::InvalidArgument(_)));

    let err = Track::builder()
        .path("/a.mp3")
        .last_played_position(f64::NAN)
        .build()
        .unwrap_err();
    assert!(matches!(err, PlayerError::InvalidArgument(_)));
}

#[test]
fn tracks_compare_by_identity_only() {
    let a = t(1, "One", "X");
    let renamed = TrackBuilder::from_prototype(&a)
        .title("Renamed")
        .build()
        .unwrap();
    assert_eq!(a, renamed);
    assert_eq!(renamed.title(), "Renamed");

    let other = TrackBuilder::from_prototype(&a)
        .id(TrackId(42))
        .build()
        .unwrap();
    assert_ne!(a, other);
}

#[test]
fn sorting_strategies_order_tracks() {
    let mut tracks = vec![t(3, "charlie", "X"), t(1, "Bravo", "X"), t(2, "alpha", "X")];

    sort_tracks(&mut tracks, TrackSorting::Title);
    let titles: Vec<&str> = tracks.iter().map(Track::title).collect();
    assert_eq!(titles, vec!["alpha", "Bravo", "charlie"]);

    sort_tracks(&mut tracks, TrackSorting::TrackNumber);
    let nums: Vec<u32> = tracks.iter().map(Track::track_number).collect();
    assert_eq!(nums, vec![1, 2, 3]);

    sort_tracks(&mut tracks, TrackSorting::DateAdded);
    let nums: Vec<u32> = tracks.iter().map(Track::track_number).collect();
    assert_eq!(nums, vec![3, 2, 1]);

    let before: Vec<TrackId> = tracks.iter().map(Track::id).collect();
    sort_tracks(&mut tracks, TrackSorting::None);
    let after: Vec<TrackId> = tracks.iter().map(Track::id).collect();
    assert_eq!(before, after);
}

#[test]
fn favorites_mark_unmark_and_toggle() {
    let favs = Favorites::default();
    let a = t(1, "One", "X");
    let b = t(2, "Two", "X");

    assert!(favs.mark(&a));
    assert!(!favs.mark(&a));
    assert!(favs.mark(&b));
    assert_eq!(favs.ids(), vec![b.id(), a.id()]);

    assert!(!favs.toggle(&a));
    assert!(!favs.is_marked(&a));
    assert!(favs.toggle(&a));
    assert!(favs.is_marked(&a));
    assert!(favs.unmark(&b));
    assert!(!favs.unmark(&b));
}

#[test]
fn local_library_groups_albums_in_track_order() {
    let tracks = vec![t(2, "Two", "X"), t(1, "One", "Y"), t(1, "One", "X")];
    let lib = LocalLibrary::from_tracks(tracks, Arc::new(Favorites::default()));

    let albums = lib.albums();
    assert_eq!(albums.len(), 2);
    assert_eq!(albums[0].title, "X");

    let x_tracks = lib.album_tracks(&albums[0]);
    let nums: Vec<u32> = x_tracks.iter().map(Track::track_number).collect();
    assert_eq!(nums, vec![1, 2]);

    assert_eq!(lib.album(albums[1].id).unwrap().title, "Y");
    assert!(lib.album(AlbumId(0)).is_none());
}

#[test]
fn local_library_search_recent_and_favorites() {
    let a = t(1, "Moonlight", "Night");
    let b = t(2, "Sunrise", "Day");
    let favs = Arc::new(Favorites::default());
    favs.mark(&b);
    let lib = LocalLibrary::from_tracks(vec![a.clone(), b.clone()], favs);

    assert_eq!(lib.search_tracks("moon"), vec![a.clone()]);
    assert_eq!(lib.search_tracks("mnlt"), vec![a.clone()]);
    assert!(lib.search_tracks("   ").is_empty());

    assert_eq!(lib.recently_added_tracks(), vec![b.clone(), a.clone()]);
    assert_eq!(lib.favorite_tracks(), vec![b.clone()]);
    assert_eq!(lib.track(a.id()), Some(a));
}

#[test]
fn fuzzy_match_simple() {
    let title = "Hello World";
    assert!(fuzzy_match_positions(title, "hw").is_some());
    assert_eq!(fuzzy_match_positions(title, "hw"), Some(vec![0, 6]));
    assert!(fuzzy_match_positions(title, "xyz").is_none());
}
