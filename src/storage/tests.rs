use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};

use super::*;
use crate::audio::{
    PlayHistory, PlayOrder, PlayerStateSnapshot, Playlist, PlaylistKind, RECENTLY_PLAYED,
};
use crate::error::PlayerError;
use crate::library::{Favorites, Track, TrackBuilder, TrackId, TrackSorting, TrackSource};

fn t(n: u32, title: &str, album: &str) -> Track {
    Track::builder()
        .path(format!("/music/{album}/{n:02} {title}.flac"))
        .title(title)
        .artist("Artist")
        .album_title(album)
        .track_number(n)
        .duration_secs(200.5)
        .date_added(Utc.with_ymd_and_hms(2022, 6, n, 12, 0, 0).unwrap())
        .build()
        .unwrap()
}

fn rich_track() -> Track {
    TrackBuilder::from_prototype(&t(4, "Rich", "Z"))
        .cover(Some("covers/z.jpg".into()))
        .lyrics(Some("la la la".into()))
        .date_first_played(Utc.with_ymd_and_hms(2023, 1, 2, 3, 4, 5).unwrap())
        .date_last_played(Some(Utc.with_ymd_and_hms(2024, 2, 3, 4, 5, 6).unwrap()))
        .last_played_position(61.25)
        .source(TrackSource::Playlist("Road Trip".into()))
        .build()
        .unwrap()
}

fn album_playlist() -> Playlist {
    let tracks = vec![t(3, "C", "X"), t(1, "A", "X"), t(2, "B", "X")];
    let album_id = tracks[0].album_id();
    Playlist::builder("X")
        .tracks(tracks)
        .start_index(0)
        .sorting(TrackSorting::TrackNumber)
        .kind(PlaylistKind::Album(album_id))
        .build()
        .unwrap()
}

fn assert_same_metadata(a: &Track, b: &Track) {
    assert_eq!(a.id(), b.id());
    assert_eq!(a.title(), b.title());
    assert_eq!(a.artist(), b.artist());
    assert_eq!(a.album_id(), b.album_id());
    assert_eq!(a.album_title(), b.album_title());
    assert_eq!(a.duration_secs(), b.duration_secs());
    assert_eq!(a.track_number(), b.track_number());
    assert_eq!(a.path(), b.path());
    assert_eq!(a.cover(), b.cover());
    assert_eq!(a.lyrics(), b.lyrics());
    assert_eq!(a.date_added(), b.date_added());
    assert_eq!(a.date_first_played(), b.date_first_played());
    assert_eq!(a.date_last_played(), b.date_last_played());
    assert_eq!(a.last_played_position(), b.last_played_position());
    assert_eq!(a.source(), b.source());
}

#[test]
fn track_keeps_every_field() {
    let track = rich_track();
    let decoded = decode_track(&encode_track(&track).unwrap()).unwrap();
    assert_same_metadata(&track, &decoded);
}

#[test]
fn playlist_keeps_order_cursor_and_flags() {
    let p = album_playlist();
    let decoded = decode_playlist(&encode_playlist(&p).unwrap()).unwrap();
    assert_eq!(decoded, p);
    assert_eq!(decoded.playing_track().map(Track::title), Some("C"));
    assert_eq!(decoded.sorting(), TrackSorting::TrackNumber);
    assert_eq!(decoded.kind(), p.kind());
    assert!(decoded.is_album_playlist());
    assert!(!decoded.is_temporary());

    let empty = Playlist::builder("empty").temporary(true).build().unwrap();
    let decoded = decode_playlist(&encode_playlist(&empty).unwrap()).unwrap();
    assert_eq!(decoded, empty);
    assert!(decoded.is_temporary());
}

#[test]
fn stored_order_is_not_resorted() {
    // Title-sorted on save, then a title changes meaning nothing on load:
    // the stored order is authoritative.
    let p = Playlist::builder("mix")
        .tracks(vec![t(2, "b", "X"), t(1, "a", "X")])
        .sorting(TrackSorting::Title)
        .build()
        .unwrap();
    let text = encode_playlist(&p)
        .unwrap()
        .replace("\"title\": \"a\"", "\"title\": \"zz\"");
    let decoded = decode_playlist(&text).unwrap();
    assert_eq!(decoded.tracks()[0].title(), "zz");
    assert_eq!(decoded.sorting(), TrackSorting::Title);
}

#[test]
fn track_list_keeps_order() {
    let tracks = vec![t(2, "B", "X"), rich_track(), t(1, "A", "X")];
    let decoded = decode_track_list(&encode_track_list(&tracks).unwrap()).unwrap();
    assert_eq!(decoded, tracks);
}

#[test]
fn unknown_versions_and_kinds_fail_closed() {
    let text = encode_track(&t(1, "A", "X")).unwrap();

    let future = text.replace("\"version\": 1", "\"version\": 2");
    assert!(matches!(
        decode_track(&future),
        Err(PlayerError::Deserialization(_))
    ));

    assert!(matches!(
        decode_playlist(&text),
        Err(PlayerError::Deserialization(_))
    ));

    let extra = text.replace("\"title\"", "\"mood\": \"happy\", \"title\"");
    assert!(matches!(
        decode_track(&extra),
        Err(PlayerError::Deserialization(_))
    ));

    for garbage in ["", "{}", "[1,2]", "{\"kind\":\"track\"}", "not json"] {
        assert!(matches!(
            decode_track(garbage),
            Err(PlayerError::Deserialization(_))
        ));
    }
}

#[test]
fn invalid_documents_are_deserialization_errors() {
    let p = album_playlist();
    let text = encode_playlist(&p)
        .unwrap()
        .replace("\"playing_position\": 2", "\"playing_position\": 7");
    assert!(matches!(
        decode_playlist(&text),
        Err(PlayerError::Deserialization(_))
    ));

    let text = encode_track(&t(1, "A", "X"))
        .unwrap()
        .replace("\"duration_secs\": 200.5", "\"duration_secs\": -1.0");
    assert!(matches!(
        decode_track(&text),
        Err(PlayerError::Deserialization(_))
    ));
}

fn sample_state() -> AppState {
    let p = album_playlist();
    let history = vec![t(1, "A", "X"), rich_track()];
    let saved = Playlist::builder("Road Trip")
        .tracks(vec![rich_track(), t(2, "B", "X")])
        .build()
        .unwrap();
    AppState {
        player: PlayerStateSnapshot {
            playlist: Some(p),
            play_order: PlayOrder::RepeatAll,
            muted: true,
            volume: 0.4,
            position_secs: 73.5,
        },
        history,
        user_playlists: vec![saved],
        favorites: vec![TrackId(7), TrackId(3)],
    }
}

#[test]
fn app_state_round_trips_and_drops_temporary_playlists() {
    let mut state = sample_state();
    let decoded = decode_state(&encode_state(&state).unwrap()).unwrap();
    assert_eq!(decoded, state);

    state.user_playlists.push(
        Playlist::builder(RECENTLY_PLAYED)
            .tracks(vec![t(1, "A", "X")])
            .temporary(true)
            .build()
            .unwrap(),
    );
    let decoded = decode_state(&encode_state(&state).unwrap()).unwrap();
    assert_eq!(decoded.user_playlists.len(), 1);
    assert_eq!(decoded.user_playlists[0].name(), "Road Trip");
}

#[test]
fn store_saves_atomically_and_loads_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("state.json");
    let store = StateStore::new(&path);

    assert_eq!(store.load(), AppState::default());

    let state = sample_state();
    store.save(&state).unwrap();
    assert!(path.exists());
    assert!(!dir.path().join("nested").join("state.json.tmp").exists());
    assert_eq!(store.load(), state);
}

#[test]
fn corrupt_or_future_files_fall_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let store = StateStore::new(&path);

    std::fs::write(&path, "{ this is not json").unwrap();
    assert_eq!(store.load(), AppState::default());

    let future = encode_state(&sample_state())
        .unwrap()
        .replacen("\"version\": 1", "\"version\": 9", 1);
    std::fs::write(&path, future).unwrap();
    assert_eq!(store.load(), AppState::default());
}

#[test]
fn persister_combines_engine_and_ui_state() {
    let dir = tempfile::tempdir().unwrap();
    let store = StateStore::new(dir.path().join("state.json"));
    let favorites = Arc::new(Favorites::default());
    let a = t(1, "A", "X");
    favorites.mark(&a);
    let playlists = Arc::new(Mutex::new(UserPlaylists::new(vec![
        Playlist::builder("Keep").tracks(vec![a.clone()]).build().unwrap(),
    ])));

    let persister = AppStatePersister::new(store.clone(), favorites, playlists);
    let snapshot = PlayerStateSnapshot {
        playlist: Some(album_playlist()),
        ..PlayerStateSnapshot::default()
    };
    persister.persist(&snapshot, std::slice::from_ref(&a));

    let loaded = store.load();
    assert_eq!(loaded.player, snapshot);
    assert_eq!(loaded.history, vec![a.clone()]);
    assert_eq!(loaded.favorites, vec![a.id()]);
    assert_eq!(loaded.user_playlists[0].name(), "Keep");
}

#[test]
fn user_playlists_guard_reserved_and_temporary() {
    let a = t(1, "A", "X");
    let mut lists = UserPlaylists::default();

    let temp = Playlist::builder("tmp")
        .tracks(vec![a.clone()])
        .temporary(true)
        .build()
        .unwrap();
    assert!(matches!(
        lists.add(temp),
        Err(PlayerError::InvalidArgument(_))
    ));

    let reserved = Playlist::builder(RECENTLY_PLAYED)
        .tracks(vec![a.clone()])
        .build()
        .unwrap();
    assert!(lists.add(reserved).is_err());

    lists
        .add(Playlist::builder("Mine").tracks(vec![a.clone()]).build().unwrap())
        .unwrap();
    lists
        .add(Playlist::builder("Mine").build().unwrap())
        .unwrap();
    assert_eq!(lists.list().len(), 1);
    assert!(lists.get("Mine").unwrap().is_empty());

    assert!(matches!(
        lists.delete(RECENTLY_PLAYED),
        Err(PlayerError::InvalidArgument(_))
    ));
    assert!(matches!(
        lists.delete("Nope"),
        Err(PlayerError::NotFound(_))
    ));
    assert_eq!(lists.delete("Mine").unwrap().name(), "Mine");
    assert!(lists.list().is_empty());
}

#[test]
fn recently_played_is_listed_first() {
    let a = t(1, "A", "X");
    let history = PlayHistory::new(5);
    let lists = UserPlaylists::new(vec![
        Playlist::builder("Mine").tracks(vec![a.clone()]).build().unwrap(),
    ]);
    assert_eq!(lists.with_recently_played(&history).len(), 1);

    history.add(&a);
    let all = lists.with_recently_played(&history);
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].name(), RECENTLY_PLAYED);
    assert_eq!(all[1].name(), "Mine");
}
