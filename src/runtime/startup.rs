use std::path::Path;
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use encore::audio::{
    AudioPlayer, ChannelObserver, PlayHistory, PlayerCmd, PlayerEvent, PlayerStateSnapshot,
    Playlist, PlaylistLookup,
};
use encore::config::Settings;
use encore::library::{AudioInfo, Favorites, LocalLibrary, TrackSorting};
use encore::storage::{AppStatePersister, StatePersister, StateStore, UserPlaylists};

/// Name of the playlist loaded when there is no saved state.
const ALL_TRACKS: &str = "All Tracks";

/// Everything the event loop works with.
pub struct Session {
    pub player: AudioPlayer,
    pub library: Arc<LocalLibrary>,
    pub favorites: Arc<Favorites>,
    pub playlists: Arc<Mutex<UserPlaylists>>,
    pub events: Receiver<PlayerEvent>,
}

/// Scan `dir`, load saved state and start the engine, restored but paused.
pub fn start(dir: &Path, settings: &Settings) -> Result<Session, Box<dyn std::error::Error>> {
    let store = settings.storage.resolve_state_path().map(StateStore::new);
    let saved = store.as_ref().map(StateStore::load).unwrap_or_default();

    let favorites = Arc::new(Favorites::new(saved.favorites.clone()));
    let library = Arc::new(LocalLibrary::scan(dir, &settings.library, favorites.clone()));
    info!(dir = %dir.display(), tracks = library.tracks().len(), "library scanned");

    let history = Arc::new(PlayHistory::new(settings.playback.history_capacity));
    history.replace(
        saved
            .history
            .iter()
            .filter_map(|t| {
                library
                    .track(t.id())
                    .map(|fresh| fresh.with_source(t.source().clone()))
            })
            .collect(),
    );

    let playlists = Arc::new(Mutex::new(UserPlaylists::new(saved.user_playlists.clone())));
    let persister = store.map(|s| {
        Box::new(AppStatePersister::new(s, favorites.clone(), playlists.clone()))
            as Box<dyn StatePersister>
    });

    let lookup: Arc<dyn PlaylistLookup> = playlists.clone();
    let player = AudioPlayer::new(library.clone(), Some(lookup), history, persister, settings)?;
    let (observer, events) = ChannelObserver::new();
    player.subscribe(Arc::new(observer));

    apply_saved_state(&player, &library, settings.playback.track_sorting, saved.player);

    Ok(Session {
        player,
        library,
        favorites,
        playlists,
        events,
    })
}

/// Restore the saved player state, or load the whole library paused when
/// there is none. Either way nothing starts playing.
fn apply_saved_state(
    player: &AudioPlayer,
    library: &LocalLibrary,
    sorting: TrackSorting,
    snapshot: PlayerStateSnapshot,
) {
    if snapshot.playlist.is_some() {
        debug!("restoring saved player state");
        let _ = player.send(PlayerCmd::Restore(snapshot));
        return;
    }
    if library.tracks().is_empty() {
        return;
    }
    match library_playlist(library, sorting) {
        Ok(playlist) => {
            let _ = player.send(PlayerCmd::Load { playlist });
        }
        Err(e) => debug!(error = %e, "could not build the library playlist"),
    }
}

/// Every track in the library, in the configured order, starting at the top.
fn library_playlist(library: &LocalLibrary, sorting: TrackSorting) -> encore::Result<Playlist> {
    Playlist::builder(ALL_TRACKS)
        .tracks(library.tracks().to_vec())
        .sorting(sorting)
        .build()
}

#[cfg(test)]
mod tests {
    use encore::library::Track;

    use super::*;

    fn track(n: u32, title: &str) -> Track {
        Track::builder()
            .path(format!("/music/X/{n:02} {title}.mp3"))
            .title(title)
            .album_title("X")
            .track_number(n)
            .build()
            .unwrap()
    }

    #[test]
    fn library_playlist_follows_the_configured_sorting() {
        let library = LocalLibrary::from_tracks(
            vec![track(3, "Alpha"), track(1, "Charlie"), track(2, "Bravo")],
            Arc::new(Favorites::default()),
        );

        let by_number = library_playlist(&library, TrackSorting::TrackNumber).unwrap();
        let titles: Vec<&str> = by_number.tracks().iter().map(Track::title).collect();
        assert_eq!(titles, ["Charlie", "Bravo", "Alpha"]);
        assert_eq!(by_number.playing_position(), Some(0));
        assert_eq!(by_number.playing_track().map(Track::title), Some("Charlie"));

        let by_title = library_playlist(&library, TrackSorting::Title).unwrap();
        assert_eq!(by_title.playing_track().map(Track::title), Some("Alpha"));
        assert_eq!(by_title.name(), ALL_TRACKS);
    }
}
