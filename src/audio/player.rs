use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::config::Settings;
use crate::error::{PlayerError, Result};
use crate::library::AudioInfo;
use crate::storage::StatePersister;

use super::engine::EngineOptions;
use super::history::PlayHistory;
use super::observer::{Observers, PlayerObserver, SubscriptionId};
use super::output::{AudioOutput, RodioOutput};
use super::playlist::{Playlist, PlaylistLookup};
use super::thread::{EngineSetup, spawn_engine_thread};
use super::types::{PlaybackHandle, PlayerCmd};

/// Handle to the engine thread. Cheap to share behind a reference; every
/// method only sends a command or reads shared state.
pub struct AudioPlayer {
    tx: Sender<PlayerCmd>,
    playback: PlaybackHandle,
    history: Arc<PlayHistory>,
    observers: Arc<Observers>,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl AudioPlayer {
    /// Start the engine on the default audio device.
    pub fn new(
        library: Arc<dyn AudioInfo>,
        playlists: Option<Arc<dyn PlaylistLookup>>,
        history: Arc<PlayHistory>,
        persister: Option<Box<dyn StatePersister>>,
        settings: &Settings,
    ) -> Result<Self> {
        let options = EngineOptions {
            sorting: settings.playback.track_sorting,
            play_order: settings.playback.play_order.into(),
            ..EngineOptions::default()
        };
        Self::spawn(
            RodioOutput::open_default,
            library,
            playlists,
            history,
            persister,
            options,
            Duration::from_millis(settings.audio.tick_ms.max(1)),
        )
    }

    /// Start the engine with an arbitrary output, created on the engine thread.
    pub fn spawn<O, F>(
        make_output: F,
        library: Arc<dyn AudioInfo>,
        playlists: Option<Arc<dyn PlaylistLookup>>,
        history: Arc<PlayHistory>,
        persister: Option<Box<dyn StatePersister>>,
        options: EngineOptions,
        tick: Duration,
    ) -> Result<Self>
    where
        O: AudioOutput + 'static,
        F: FnOnce() -> Result<O> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<PlayerCmd>();
        let (ready_tx, ready_rx) = mpsc::channel();
        let observers = Arc::new(Observers::default());

        let setup = EngineSetup {
            library,
            playlists,
            history: history.clone(),
            observers: observers.clone(),
            persister,
            options,
            tick,
        };
        let handle = spawn_engine_thread(make_output, setup, rx, ready_tx);

        let playback = match ready_rx.recv() {
            Ok(Ok(playback)) => playback,
            Ok(Err(e)) => {
                let _ = handle.join();
                return Err(e);
            }
            Err(_) => {
                let _ = handle.join();
                return Err(PlayerError::Output(
                    "engine thread exited during startup".to_string(),
                ));
            }
        };

        Ok(Self {
            tx,
            playback,
            history,
            observers,
            join: Mutex::new(Some(handle)),
        })
    }

    pub fn playback_handle(&self) -> PlaybackHandle {
        self.playback.clone()
    }

    pub fn history(&self) -> Arc<PlayHistory> {
        self.history.clone()
    }

    pub fn send(&self, cmd: PlayerCmd) -> std::result::Result<(), mpsc::SendError<PlayerCmd>> {
        self.tx.send(cmd)
    }

    /// Queue a playlist for playback. The outcome arrives on the returned
    /// receiver exactly once; poll it with `try_recv` to avoid blocking.
    pub fn play(&self, playlist: Playlist) -> Receiver<Result<()>> {
        let (reply, rx) = mpsc::channel();
        let _ = self.send(PlayerCmd::Play {
            playlist,
            reply: Some(reply),
        });
        rx
    }

    /// `Ok(false)` on the receiver means there was nothing earlier in the history.
    pub fn play_previous_in_history(&self) -> Receiver<Result<bool>> {
        let (reply, rx) = mpsc::channel();
        let _ = self.send(PlayerCmd::PlayPreviousInHistory { reply: Some(reply) });
        rx
    }

    pub fn subscribe(&self, observer: Arc<dyn PlayerObserver>) -> SubscriptionId {
        self.observers.subscribe(observer)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// Persist, fade out and wait for the engine thread to finish.
    pub fn quit_softly(&self, fade_out: Duration) {
        let _ = self.send(PlayerCmd::Quit {
            fade_out_ms: fade_out.as_millis() as u64,
        });

        let handle = self
            .join
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(h) = handle {
            let _ = h.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::panic::{self, AssertUnwindSafe};

    use super::*;
    use crate::library::{Favorites, LocalLibrary, Track};

    /// Output that never produces sound.
    struct Silent;

    impl AudioOutput for Silent {
        fn open(&mut self, _track: &Track, _start_at: Duration) -> Result<()> {
            Ok(())
        }
        fn play(&mut self) {}
        fn pause(&mut self) {}
        fn stop(&mut self) {}
        fn seek(&mut self, _position: Duration) -> Result<()> {
            Ok(())
        }
        fn set_volume(&mut self, _volume: f32) {}
        fn position(&self) -> Duration {
            Duration::ZERO
        }
        fn duration(&self) -> Option<Duration> {
            None
        }
        fn is_finished(&self) -> bool {
            false
        }
    }

    #[test]
    fn quit_joins_even_after_the_handle_lock_was_poisoned() {
        let library = Arc::new(LocalLibrary::from_tracks(
            Vec::new(),
            Arc::new(Favorites::default()),
        ));
        let player = AudioPlayer::spawn(
            || Ok(Silent),
            library,
            None,
            Arc::new(PlayHistory::default()),
            None,
            EngineOptions::default(),
            Duration::from_millis(5),
        )
        .unwrap();

        let _ = panic::catch_unwind(AssertUnwindSafe(|| {
            let _guard = player.join.lock().unwrap();
            panic!("poison the join handle");
        }));
        assert!(player.join.is_poisoned());

        player.quit_softly(Duration::ZERO);
        let join = player.join.lock().unwrap_or_else(PoisonError::into_inner);
        assert!(join.is_none());
    }
}
