use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::error::Result;
use crate::library::AudioInfo;
use crate::storage::StatePersister;

use super::engine::{EngineOptions, PlayerEngine, TickOutcome};
use super::history::PlayHistory;
use super::observer::Observers;
use super::output::AudioOutput;
use super::playlist::PlaylistLookup;
use super::types::{PlaybackHandle, PlayerCmd};

/// Everything the engine thread takes ownership of.
pub(super) struct EngineSetup {
    pub library: Arc<dyn AudioInfo>,
    pub playlists: Option<Arc<dyn PlaylistLookup>>,
    pub history: Arc<PlayHistory>,
    pub observers: Arc<Observers>,
    pub persister: Option<Box<dyn StatePersister>>,
    pub options: EngineOptions,
    pub tick: Duration,
}

/// Start the engine thread.
///
/// The output is created on the engine thread itself (audio devices are not
/// always `Send`). `ready` receives the playback handle once the output is
/// open, or the error that prevented it.
pub(super) fn spawn_engine_thread<O, F>(
    make_output: F,
    setup: EngineSetup,
    rx: Receiver<PlayerCmd>,
    ready: Sender<Result<PlaybackHandle>>,
) -> JoinHandle<()>
where
    O: AudioOutput + 'static,
    F: FnOnce() -> Result<O> + Send + 'static,
{
    thread::spawn(move || {
        let output = match make_output() {
            Ok(o) => o,
            Err(e) => {
                error!(error = %e, "failed to open audio output");
                let _ = ready.send(Err(e));
                return;
            }
        };

        let EngineSetup {
            library,
            playlists,
            history,
            observers,
            persister,
            options,
            tick,
        } = setup;

        let mut engine = PlayerEngine::new(output, library, history, observers, options);
        if let Some(playlists) = playlists {
            engine = engine.with_playlists(playlists);
        }
        engine.publish_info();
        if ready.send(Ok(engine.playback_handle())).is_err() {
            return;
        }
        info!(tick_ms = tick.as_millis() as u64, "engine thread started");

        let persist = |engine: &PlayerEngine<O>| {
            if let Some(p) = &persister {
                p.persist(&engine.snapshot(), &engine.history().tracks());
            }
        };

        loop {
            match rx.recv_timeout(tick) {
                Ok(PlayerCmd::Quit { fade_out_ms }) => {
                    // Persist before the output is released so the position is kept.
                    persist(&engine);
                    engine.shutdown(Duration::from_millis(fade_out_ms));
                    engine.publish_info();
                    break;
                }
                Ok(cmd) => {
                    if apply(&mut engine, cmd) {
                        persist(&engine);
                    }
                }
                Err(RecvTimeoutError::Timeout) => {
                    if engine.tick() == TickOutcome::Completed {
                        persist(&engine);
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    debug!("command channel closed");
                    persist(&engine);
                    engine.shutdown(Duration::ZERO);
                    break;
                }
            }
            engine.publish_info();
        }
        info!("engine thread stopped");
    })
}

/// Apply one command. Returns true when the state should be persisted now.
fn apply<O: AudioOutput>(engine: &mut PlayerEngine<O>, cmd: PlayerCmd) -> bool {
    match cmd {
        PlayerCmd::Play { playlist, reply } => {
            let result = engine.play(playlist);
            match reply {
                Some(tx) => {
                    let _ = tx.send(result);
                }
                None => log_failure("play", result),
            }
        }
        PlayerCmd::Load { playlist } => log_failure("load", engine.load(playlist)),
        PlayerCmd::Restore(snapshot) => log_failure("restore", engine.restore(snapshot)),
        PlayerCmd::Pause => engine.pause(),
        PlayerCmd::Resume => log_failure("resume", engine.resume()),
        PlayerCmd::TogglePlayPause => log_failure("toggle", engine.toggle_play_pause()),
        PlayerCmd::Stop => engine.stop(),
        PlayerCmd::Next => log_failure("next", engine.skip_to_next()),
        PlayerCmd::Previous => log_failure("previous", engine.skip_to_previous()),
        PlayerCmd::SeekTo(secs) => log_failure("seek", engine.seek_to(secs)),
        PlayerCmd::JumpBy(secs) => log_failure("jump", engine.jump_by(secs)),
        PlayerCmd::SetVolume(v) => engine.set_volume(v),
        PlayerCmd::Mute => engine.mute(),
        PlayerCmd::Unmute => engine.unmute(),
        PlayerCmd::ToggleMute => engine.toggle_mute(),
        PlayerCmd::SetPlayOrder(order) => engine.set_play_order(order),
        PlayerCmd::CyclePlayOrder => {
            engine.cycle_play_order();
        }
        PlayerCmd::PlayPreviousInHistory { reply } => {
            let result = engine.play_previous_in_history();
            match reply {
                Some(tx) => {
                    let _ = tx.send(result);
                }
                None => log_failure("play previous in history", result.map(|_| ())),
            }
        }
        PlayerCmd::Persist => return true,
        // Handled by the loop.
        PlayerCmd::Quit { .. } => {}
    }
    false
}

fn log_failure(op: &str, result: Result<()>) {
    if let Err(e) = result {
        debug!(op, error = %e, "command failed");
    }
}
