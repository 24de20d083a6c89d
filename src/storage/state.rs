use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};

use crate::audio::{PlayHistory, PlayerStateSnapshot, Playlist, PlaylistLookup, RECENTLY_PLAYED};
use crate::error::{PlayerError, Result};
use crate::library::{Favorites, Track, TrackId};

use super::codec::{decode_state, encode_state};

/// Everything that survives a relaunch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    pub player: PlayerStateSnapshot,
    /// Newest first.
    pub history: Vec<Track>,
    pub user_playlists: Vec<Playlist>,
    pub favorites: Vec<TrackId>,
}

/// Reads and writes `AppState` at a fixed path.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the saved state. A missing, unreadable or undecodable file yields
    /// the default state; the failure is logged, never returned.
    pub fn load(&self) -> AppState {
        let text = match fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no saved state yet");
                return AppState::default();
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "cannot read saved state");
                return AppState::default();
            }
        };
        match decode_state(&text) {
            Ok(state) => {
                info!(
                    path = %self.path.display(),
                    history = state.history.len(),
                    playlists = state.user_playlists.len(),
                    "loaded saved state"
                );
                state
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "discarding unreadable saved state");
                AppState::default()
            }
        }
    }

    /// Write atomically: a sibling temp file is written, then renamed over
    /// the target.
    pub fn save(&self, state: &AppState) -> io::Result<()> {
        let text = encode_state(state).map_err(io::Error::other)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), "saved state");
        Ok(())
    }
}

/// Receives the player's state whenever the engine thread decides to save.
pub trait StatePersister: Send {
    fn persist(&self, player: &PlayerStateSnapshot, history: &[Track]);
}

impl<F> StatePersister for F
where
    F: Fn(&PlayerStateSnapshot, &[Track]) + Send,
{
    fn persist(&self, player: &PlayerStateSnapshot, history: &[Track]) {
        self(player, history)
    }
}

/// Saves the full `AppState`: the engine's part plus favorites and user
/// playlists shared with the UI.
pub struct AppStatePersister {
    store: StateStore,
    favorites: Arc<Favorites>,
    playlists: Arc<Mutex<UserPlaylists>>,
}

impl AppStatePersister {
    pub fn new(
        store: StateStore,
        favorites: Arc<Favorites>,
        playlists: Arc<Mutex<UserPlaylists>>,
    ) -> Self {
        Self {
            store,
            favorites,
            playlists,
        }
    }
}

impl StatePersister for AppStatePersister {
    fn persist(&self, player: &PlayerStateSnapshot, history: &[Track]) {
        let user_playlists = self
            .playlists
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .list()
            .to_vec();
        let state = AppState {
            player: player.clone(),
            history: history.to_vec(),
            user_playlists,
            favorites: self.favorites.ids(),
        };
        if let Err(e) = self.store.save(&state) {
            warn!(path = %self.store.path().display(), error = %e, "failed to save state");
        }
    }
}

/// The user's named playlists. Temporary playlists are never admitted and
/// "Recently Played" is reserved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserPlaylists {
    playlists: Vec<Playlist>,
}

impl UserPlaylists {
    pub fn new(playlists: Vec<Playlist>) -> Self {
        let playlists = playlists
            .into_iter()
            .filter(|p| !p.is_temporary() && p.name() != RECENTLY_PLAYED)
            .collect();
        Self { playlists }
    }

    pub fn list(&self) -> &[Playlist] {
        &self.playlists
    }

    pub fn get(&self, name: &str) -> Option<&Playlist> {
        self.playlists.iter().find(|p| p.name() == name)
    }

    /// Add a playlist, replacing any existing one with the same name.
    pub fn add(&mut self, playlist: Playlist) -> Result<()> {
        if playlist.is_temporary() {
            return Err(PlayerError::InvalidArgument(format!(
                "temporary playlist '{}' cannot be saved",
                playlist.name()
            )));
        }
        if playlist.name() == RECENTLY_PLAYED {
            return Err(PlayerError::InvalidArgument(format!(
                "'{RECENTLY_PLAYED}' is a reserved name"
            )));
        }
        match self.playlists.iter_mut().find(|p| p.name() == playlist.name()) {
            Some(existing) => *existing = playlist,
            None => self.playlists.push(playlist),
        }
        Ok(())
    }

    pub fn delete(&mut self, name: &str) -> Result<Playlist> {
        if name == RECENTLY_PLAYED {
            return Err(PlayerError::InvalidArgument(format!(
                "'{RECENTLY_PLAYED}' cannot be deleted"
            )));
        }
        let Some(i) = self.playlists.iter().position(|p| p.name() == name) else {
            return Err(PlayerError::NotFound(format!("playlist '{name}'")));
        };
        Ok(self.playlists.remove(i))
    }

    /// Every playlist the user can pick from: "Recently Played" first when
    /// there is any history, then the saved ones.
    pub fn with_recently_played(&self, history: &PlayHistory) -> Vec<Playlist> {
        history
            .recently_played_playlist()
            .into_iter()
            .chain(self.playlists.iter().cloned())
            .collect()
    }
}

impl PlaylistLookup for Mutex<UserPlaylists> {
    fn find_playlist(&self, name: &str) -> Option<Playlist> {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }
}
