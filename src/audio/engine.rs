//! The player state machine.
//!
//! `PlayerEngine` owns the active playlist and drives an `AudioOutput`. It is
//! single-threaded by construction: the engine thread owns it and applies
//! commands one at a time, so every operation here sees a consistent state.
//!
//! States: `Idle` (nothing open), `Paused` (track open, not advancing) and
//! `Playing`. Seeking never changes the outer state.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, error, info, warn};

use crate::error::{PlayerError, Result};
use crate::library::{AudioInfo, Track, TrackId, TrackSorting, TrackSource};

use super::history::{PlayHistory, RECENTLY_PLAYED};
use super::observer::{Observers, PlayerObserver, SubscriptionId};
use super::output::AudioOutput;
use super::playlist::{Playlist, PlaylistKind, PlaylistLookup};
use super::types::{
    PlayOrder, PlaybackHandle, PlaybackInfo, PlaybackState, PlayerEvent, PlayerStateSnapshot,
    Step,
};

/// Knobs the engine takes from settings.
#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    /// Sorting used for album playlists rebuilt from history.
    pub sorting: TrackSorting,
    pub play_order: PlayOrder,
    pub volume: f32,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            sorting: TrackSorting::TrackNumber,
            play_order: PlayOrder::Normal,
            volume: 1.0,
        }
    }
}

/// What a poll of the output found.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not playing; nothing to report.
    Quiet,
    /// Still playing; a time update was emitted.
    Progress,
    /// The track ended and the engine moved on (or stopped).
    Completed,
}

pub struct PlayerEngine<O: AudioOutput> {
    output: O,
    library: Arc<dyn AudioInfo>,
    playlists: Option<Arc<dyn PlaylistLookup>>,
    history: Arc<PlayHistory>,
    observers: Arc<Observers>,
    info: PlaybackHandle,
    sorting: TrackSorting,
    rng: StdRng,

    playlist: Option<Playlist>,
    state: PlaybackState,
    order: PlayOrder,
    volume: f32,
    muted: bool,
    /// Position to reopen at when the given track is played again.
    resume_at: Option<(TrackId, f64)>,
    /// The open track was loaded paused and has not been started yet.
    pending_start: bool,
}

impl<O: AudioOutput> PlayerEngine<O> {
    pub fn new(
        output: O,
        library: Arc<dyn AudioInfo>,
        history: Arc<PlayHistory>,
        observers: Arc<Observers>,
        options: EngineOptions,
    ) -> Self {
        let volume = sanitize_volume(options.volume).unwrap_or(1.0);
        let info = Arc::new(Mutex::new(PlaybackInfo {
            play_order: options.play_order,
            volume,
            ..PlaybackInfo::default()
        }));
        let mut output = output;
        output.set_volume(volume);
        Self {
            output,
            library,
            playlists: None,
            history,
            observers,
            info,
            sorting: options.sorting,
            rng: StdRng::from_entropy(),
            playlist: None,
            state: PlaybackState::Idle,
            order: options.play_order,
            volume,
            muted: false,
            resume_at: None,
            pending_start: false,
        }
    }

    /// Replace the random source used by shuffle.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    /// Saved playlists to resolve `TrackSource::Playlist` history entries against.
    pub fn with_playlists(mut self, playlists: Arc<dyn PlaylistLookup>) -> Self {
        self.playlists = Some(playlists);
        self
    }

    pub fn playback_handle(&self) -> PlaybackHandle {
        self.info.clone()
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn playlist(&self) -> Option<&Playlist> {
        self.playlist.as_ref()
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.playlist.as_ref().and_then(|p| p.playing_track())
    }

    pub fn play_order(&self) -> PlayOrder {
        self.order
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn history(&self) -> &Arc<PlayHistory> {
        &self.history
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn subscribe(&self, observer: Arc<dyn PlayerObserver>) -> SubscriptionId {
        self.observers.subscribe(observer)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// Current position in seconds. While idle this is where the current
    /// track would resume.
    pub fn position_secs(&self) -> f64 {
        if self.state != PlaybackState::Idle {
            return self.output.position().as_secs_f64();
        }
        match (self.resume_at, self.current_track()) {
            (Some((id, pos)), Some(t)) if t.id() == id => pos,
            _ => 0.0,
        }
    }

    pub fn duration_secs(&self) -> f64 {
        self.output
            .duration()
            .map(|d| d.as_secs_f64())
            .or_else(|| self.current_track().map(|t| t.duration_secs()))
            .unwrap_or(0.0)
    }

    /// Replace the active playlist and start its current track.
    ///
    /// When the track is the one the engine was told to resume, playback
    /// starts at the saved position. If the track cannot be opened the error
    /// is returned, the engine goes idle and the previous playlist stays.
    pub fn play(&mut self, playlist: Playlist) -> Result<()> {
        let Some(track) = playlist.playing_track().cloned() else {
            warn!(playlist = %playlist.name(), "refusing to play an empty playlist");
            return Err(PlayerError::InvalidArgument(format!(
                "playlist '{}' is empty",
                playlist.name()
            )));
        };

        let saved_resume = self.resume_at;
        let start_at = self.take_resume_position(&track);
        let previous = self.playlist.replace(playlist);

        match self.open_current(start_at, true) {
            Ok(()) => {
                info!(
                    playlist = %self.playlist.as_ref().map_or("", |p| p.name()),
                    track = %track.id(),
                    start_at,
                    "playing"
                );
                Ok(())
            }
            Err(e) => {
                self.playlist = previous;
                self.resume_at = saved_resume;
                Err(e)
            }
        }
    }

    /// Replace the active playlist and open its current track paused at 0.
    pub fn load(&mut self, playlist: Playlist) -> Result<()> {
        if playlist.is_empty() {
            return Err(PlayerError::InvalidArgument(format!(
                "playlist '{}' is empty",
                playlist.name()
            )));
        }
        self.output.stop();
        self.playlist = Some(playlist);
        self.resume_at = None;
        self.open_current(0.0, false)
    }

    pub fn pause(&mut self) {
        if self.state != PlaybackState::Playing {
            return;
        }
        self.output.pause();
        self.set_state(PlaybackState::Paused);
        self.emit_time();
    }

    /// Continue playback. From `Idle` this reopens the current track.
    pub fn resume(&mut self) -> Result<()> {
        match self.state {
            PlaybackState::Playing => Ok(()),
            PlaybackState::Paused => {
                self.output.play();
                if self.pending_start {
                    self.pending_start = false;
                    self.record_current();
                }
                self.set_state(PlaybackState::Playing);
                Ok(())
            }
            PlaybackState::Idle => {
                let Some(track) = self.current_track().cloned() else {
                    debug!("resume with no playlist; ignoring");
                    return Ok(());
                };
                let start_at = self.take_resume_position(&track);
                self.open_current(start_at, true)
            }
        }
    }

    pub fn toggle_play_pause(&mut self) -> Result<()> {
        if self.state == PlaybackState::Playing {
            self.pause();
            Ok(())
        } else {
            self.resume()
        }
    }

    /// Release the output. The playlist and its cursor are kept.
    pub fn stop(&mut self) {
        if self.state == PlaybackState::Idle {
            return;
        }
        self.output.stop();
        self.pending_start = false;
        self.set_state(PlaybackState::Idle);
        debug!("stopped");
    }

    /// Move to the next track under the current play order. Past the end the
    /// engine stops without error. A manual skip in `RepeatOne` moves on as
    /// `RepeatAll` would.
    pub fn skip_to_next(&mut self) -> Result<()> {
        let order = manual_order(self.order);
        let step = match self.playlist.as_mut() {
            Some(p) => p.advance_with(order, &mut self.rng),
            None => return Ok(()),
        };
        self.follow_step(step, "next")
    }

    pub fn skip_to_previous(&mut self) -> Result<()> {
        let order = manual_order(self.order);
        let step = match self.playlist.as_mut() {
            Some(p) => p.retreat_with(order, &mut self.rng),
            None => return Ok(()),
        };
        self.follow_step(step, "previous")
    }

    /// Natural end of the current track: record it and advance honouring
    /// the play order, `RepeatOne` included.
    pub fn on_track_completed(&mut self) -> Result<()> {
        if let Some(t) = self.current_track() {
            debug!(track = %t.id(), "track completed");
        }
        self.record_current();
        let order = self.order;
        let step = match self.playlist.as_mut() {
            Some(p) => p.advance_with(order, &mut self.rng),
            None => return Ok(()),
        };
        self.follow_step(step, "completion")
    }

    /// Seek to `secs`, clamped to the track's duration.
    pub fn seek_to(&mut self, secs: f64) -> Result<()> {
        if !secs.is_finite() {
            return Err(PlayerError::InvalidArgument(format!(
                "seek position must be finite, got {secs}"
            )));
        }
        if self.state == PlaybackState::Idle {
            debug!("seek while idle; ignoring");
            return Ok(());
        }
        let duration = self.duration_secs();
        let target = secs.clamp(0.0, duration.max(0.0));
        if let Err(e) = self.output.seek(secs_to_duration(target)) {
            self.fail(e.clone(), "seek");
            return Err(e);
        }
        self.emit_time();
        Ok(())
    }

    /// Seek relative to the current position.
    pub fn jump_by(&mut self, delta_secs: f64) -> Result<()> {
        let target = self.position_secs() + delta_secs;
        self.seek_to(target)
    }

    pub fn jump_forwards(&mut self, secs: f64) -> Result<()> {
        self.jump_by(secs.abs())
    }

    pub fn jump_backwards(&mut self, secs: f64) -> Result<()> {
        self.jump_by(-secs.abs())
    }

    /// Set the volume, clamped to `0.0..=1.0`. While muted the new value is
    /// kept and applied on unmute.
    pub fn set_volume(&mut self, volume: f32) {
        let Some(volume) = sanitize_volume(volume) else {
            warn!(volume, "ignoring non-finite volume");
            return;
        };
        self.volume = volume;
        if !self.muted {
            self.output.set_volume(volume);
        }
        self.emit_volume();
    }

    pub fn mute(&mut self) {
        if self.muted {
            return;
        }
        self.muted = true;
        self.output.set_volume(0.0);
        self.emit_volume();
    }

    pub fn unmute(&mut self) {
        if !self.muted {
            return;
        }
        self.muted = false;
        self.output.set_volume(self.volume);
        self.emit_volume();
    }

    pub fn toggle_mute(&mut self) {
        if self.muted {
            self.unmute();
        } else {
            self.mute();
        }
    }

    pub fn set_play_order(&mut self, order: PlayOrder) {
        if self.order == order {
            return;
        }
        info!(?order, "play order changed");
        self.order = order;
        self.emit(PlayerEvent::PlayOrderChanged(order));
    }

    pub fn cycle_play_order(&mut self) -> PlayOrder {
        let next = self.order.cycle();
        self.set_play_order(next);
        next
    }

    /// Drop the newest history entry and play the track before it, inside
    /// its album or saved playlist when that still holds it, else on its own
    /// in a temporary "Recently Played" playlist.
    ///
    /// Returns `Ok(false)` when the history holds nothing earlier.
    pub fn play_previous_in_history(&mut self) -> Result<bool> {
        let Some(track) = self.history.previous() else {
            debug!("no earlier history entry");
            return Ok(false);
        };
        self.stop();
        let playlist = self.source_playlist(&track)?;
        if let Err(e) = self.play(playlist) {
            error!(track = %track.id(), error = %e, "failed to play history entry");
            return Err(e);
        }
        Ok(true)
    }

    /// Poll the output: emit progress, or handle a natural completion.
    pub fn tick(&mut self) -> TickOutcome {
        if self.state != PlaybackState::Playing {
            return TickOutcome::Quiet;
        }
        if self.output.is_finished() {
            // Failures here are already logged and emitted.
            let _ = self.on_track_completed();
            return TickOutcome::Completed;
        }
        self.emit_time();
        TickOutcome::Progress
    }

    pub fn snapshot(&self) -> PlayerStateSnapshot {
        PlayerStateSnapshot {
            playlist: self.playlist.clone(),
            play_order: self.order,
            muted: self.muted,
            volume: self.volume,
            position_secs: self.position_secs(),
        }
    }

    /// Load a saved snapshot, paused at the saved position. Never starts playback.
    ///
    /// Tracks the library no longer knows are dropped. If the saved current
    /// track is gone the cursor falls back to the first remaining track at 0.
    pub fn restore(&mut self, snapshot: PlayerStateSnapshot) -> Result<()> {
        self.set_play_order(snapshot.play_order);
        self.volume = sanitize_volume(snapshot.volume).unwrap_or(1.0);
        self.muted = snapshot.muted;
        self.output
            .set_volume(if self.muted { 0.0 } else { self.volume });
        self.emit_volume();

        let Some(saved) = snapshot.playlist else {
            debug!("snapshot has no playlist");
            return Ok(());
        };
        let Some(playlist) = self.revalidate(&saved) else {
            warn!(playlist = %saved.name(), "no track of the saved playlist is still available");
            return Ok(());
        };

        let same_track = playlist.playing_track().map(Track::id) == saved.playing_track().map(Track::id);
        let position = if same_track {
            snapshot.position_secs.max(0.0)
        } else {
            0.0
        };

        self.output.stop();
        self.set_state(PlaybackState::Idle);
        self.playlist = Some(playlist);
        let Some(track) = self.current_track().cloned() else {
            return Ok(());
        };
        self.resume_at = Some((track.id(), position));
        self.open_current(position, false)?;
        self.resume_at = None;
        info!(track = %track.id(), position, "restored player state");
        Ok(())
    }

    /// Copy engine state into the shared info handle.
    pub fn publish_info(&self) {
        let mut info = self.info.lock().unwrap_or_else(PoisonError::into_inner);
        info.state = self.state;
        info.track = self.current_track().cloned();
        info.playlist_name = self.playlist.as_ref().map(|p| p.name().to_string());
        info.position_secs = self.position_secs();
        info.duration_secs = self.duration_secs();
        info.play_order = self.order;
        info.volume = self.volume;
        info.muted = self.muted;
    }

    /// Fade out and release the output.
    pub fn shutdown(&mut self, fade: Duration) {
        self.output.fade_out(fade);
        self.pending_start = false;
        self.set_state(PlaybackState::Idle);
    }

    fn follow_step(&mut self, step: Step, cause: &str) -> Result<()> {
        match step {
            Step::Moved(i) => {
                debug!(index = i, cause, "moving to track");
                self.open_current(0.0, true)
            }
            Step::End => {
                info!(cause, "reached the end of the playlist");
                self.stop();
                Ok(())
            }
        }
    }

    /// Open the current track at `start_at`. With `autoplay` it starts
    /// playing and counts as a track start for the history; otherwise it is
    /// left paused.
    fn open_current(&mut self, start_at: f64, autoplay: bool) -> Result<()> {
        let Some(track) = self.current_track().cloned() else {
            return Ok(());
        };
        if let Err(e) = self.output.open(&track, secs_to_duration(start_at)) {
            self.fail(e.clone(), "open");
            return Err(e);
        }
        self.output
            .set_volume(if self.muted { 0.0 } else { self.volume });
        self.emit(PlayerEvent::TrackChanged(Some(track.clone())));
        if autoplay {
            self.output.play();
            self.pending_start = false;
            self.record_current();
            self.set_state(PlaybackState::Playing);
        } else {
            self.pending_start = true;
            self.set_state(PlaybackState::Paused);
        }
        Ok(())
    }

    fn fail(&mut self, e: PlayerError, op: &str) {
        let track = self.current_track().map(|t| t.id().to_string());
        error!(op, track = track.as_deref().unwrap_or("-"), error = %e, "playback failed");
        self.output.stop();
        self.pending_start = false;
        self.set_state(PlaybackState::Idle);
        self.emit(PlayerEvent::PlaybackFailed(e));
    }

    fn take_resume_position(&mut self, track: &Track) -> f64 {
        match self.resume_at.take() {
            Some((id, pos)) if id == track.id() => pos,
            _ => 0.0,
        }
    }

    /// Add the current track to the history. A track playing from one of
    /// the saved playlists is attributed to that playlist.
    fn record_current(&self) {
        let Some(playlist) = self.playlist.as_ref() else {
            return;
        };
        let Some(track) = playlist.playing_track() else {
            return;
        };
        if self.is_saved_playlist(playlist) {
            self.history
                .add(&track.with_source(TrackSource::Playlist(playlist.name().to_string())));
        } else {
            self.history.add(track);
        }
    }

    fn is_saved_playlist(&self, playlist: &Playlist) -> bool {
        if playlist.is_temporary() || playlist.kind() != PlaylistKind::Custom {
            return false;
        }
        self.playlists
            .as_ref()
            .is_some_and(|p| p.find_playlist(playlist.name()).is_some())
    }

    /// The saved playlist a history entry came from, else its album.
    fn source_playlist(&self, track: &Track) -> Result<Playlist> {
        let album_id = match track.source() {
            TrackSource::Album(id) => *id,
            TrackSource::Playlist(name) => {
                let found = self.playlists.as_ref().and_then(|p| p.find_playlist(name));
                match found {
                    Some(mut playlist) => {
                        if playlist.go_to_track(track).is_ok() {
                            return Ok(playlist);
                        }
                        debug!(track = %track.id(), playlist = %name, "track left its playlist");
                    }
                    None => debug!(playlist = %name, "source playlist is gone"),
                }
                track.album_id()
            }
        };
        if let Some(album) = self.library.album(album_id) {
            let tracks = self.library.album_tracks(&album);
            if tracks.contains(track) {
                return Playlist::builder(album.title.clone())
                    .tracks(tracks)
                    .start_track(track.clone())
                    .sorting(self.sorting)
                    .kind(PlaylistKind::Album(album.id))
                    .build();
            }
        }
        debug!(track = %track.id(), "no source list found; playing on its own");
        Playlist::builder(RECENTLY_PLAYED)
            .tracks(vec![track.clone()])
            .temporary(true)
            .build()
    }

    fn revalidate(&self, saved: &Playlist) -> Option<Playlist> {
        let playing = saved.playing_position();
        let mut kept: Vec<Track> = Vec::with_capacity(saved.len());
        let mut start = None;
        for (i, t) in saved.tracks().iter().enumerate() {
            match self.library.track(t.id()) {
                Some(fresh) => {
                    if Some(i) == playing {
                        start = Some(kept.len());
                    }
                    kept.push(fresh);
                }
                None => warn!(track = %t.id(), title = %t.title(), "dropping track missing from library"),
            }
        }
        if kept.is_empty() {
            return None;
        }
        Playlist::builder(saved.name())
            .tracks(kept)
            .start_index(start.unwrap_or(0))
            .temporary(saved.is_temporary())
            .kind(saved.kind())
            .build()
            .ok()
            .map(|p| p.with_sorting_label(saved.sorting()))
    }

    fn set_state(&mut self, state: PlaybackState) {
        if self.state == state {
            return;
        }
        self.state = state;
        self.emit(PlayerEvent::StateChanged(state));
    }

    fn emit_time(&self) {
        self.emit(PlayerEvent::TimeUpdated {
            position_secs: self.position_secs(),
            duration_secs: self.duration_secs(),
        });
    }

    fn emit_volume(&self) {
        self.emit(PlayerEvent::VolumeChanged {
            volume: self.volume,
            muted: self.muted,
        });
    }

    fn emit(&self, event: PlayerEvent) {
        self.observers.emit(&event);
    }
}

fn manual_order(order: PlayOrder) -> PlayOrder {
    match order {
        PlayOrder::RepeatOne => PlayOrder::RepeatAll,
        other => other,
    }
}

fn sanitize_volume(volume: f32) -> Option<f32> {
    volume.is_finite().then(|| volume.clamp(0.0, 1.0))
}

fn secs_to_duration(secs: f64) -> Duration {
    if secs.is_finite() && secs > 0.0 {
        Duration::from_secs_f64(secs)
    } else {
        Duration::ZERO
    }
}
