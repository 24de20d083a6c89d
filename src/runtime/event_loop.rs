use std::io::{self, Write};
use std::sync::PoisonError;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::Duration;

use crossterm::cursor::MoveToColumn;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::Print;
use crossterm::terminal::{Clear, ClearType};
use crossterm::{execute, queue};
use tracing::{debug, info};

use encore::audio::{PlayOrder, PlaybackInfo, PlaybackState, PlayerCmd, PlayerEvent};
use encore::config;
use encore::error::Result as PlayerResult;
use encore::keybinds::{Action, Key, Keybinds};

use super::startup::Session;

/// State tracked by the runtime event loop across iterations.
#[derive(Default)]
pub struct EventLoopState {
    /// Transient message shown after the status, e.g. the last error.
    pub message: Option<String>,
    /// Outstanding "play previous in history" request.
    pending_recall: Option<Receiver<PlayerResult<bool>>>,
    last_line: String,
}

/// Main terminal loop: reads keys, forwards actions to the engine and keeps
/// a one-line status up to date. Returns `Ok(())` when quit is requested.
pub fn run(
    settings: &config::Settings,
    session: &Session,
    state: &mut EventLoopState,
) -> Result<(), Box<dyn std::error::Error>> {
    let keybinds = Keybinds::from_settings(&settings.controls);
    info!(bindings = keybinds.len(), "event loop started");
    let mut stdout = io::stdout();

    loop {
        for ev in session.events.try_iter() {
            note_event(state, &ev);
        }
        poll_recall(state);

        let info = session
            .player
            .playback_handle()
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let favorite = info
            .track
            .as_ref()
            .is_some_and(|t| session.favorites.is_marked(t));
        let line = status_line(&info, favorite, state.message.as_deref());
        if line != state.last_line {
            queue!(
                stdout,
                MoveToColumn(0),
                Clear(ClearType::CurrentLine),
                Print(&line)
            )?;
            stdout.flush()?;
            state.last_line = line;
        }

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if is_interrupt(&key) {
                    quit(settings, session);
                    break;
                }
                let Some(action) = key_from_event(&key).and_then(|k| keybinds.action_for(k))
                else {
                    continue;
                };
                if handle_action(action, settings, session, state, &info) {
                    break;
                }
            }
        }
    }

    execute!(stdout, Print("\r\n"))?;
    Ok(())
}

/// Returns true when the loop should exit.
fn handle_action(
    action: Action,
    settings: &config::Settings,
    session: &Session,
    state: &mut EventLoopState,
    info: &PlaybackInfo,
) -> bool {
    debug!(%action, "key action");
    match action {
        Action::Quit => {
            quit(settings, session);
            return true;
        }
        Action::ToggleFavorite => {
            if let Some(track) = &info.track {
                let marked = session.favorites.toggle(track);
                state.message = Some(if marked {
                    format!("added {} to favorites", track.title())
                } else {
                    format!("removed {} from favorites", track.title())
                });
                let _ = session.player.send(PlayerCmd::Persist);
            }
        }
        Action::RecallPrevious => {
            state.pending_recall = Some(session.player.play_previous_in_history());
        }
        other => {
            if let Some(cmd) = other.command(&settings.playback, info) {
                state.message = None;
                let _ = session.player.send(cmd);
            }
        }
    }
    false
}

fn quit(settings: &config::Settings, session: &Session) {
    info!("quitting");
    session
        .player
        .quit_softly(Duration::from_millis(settings.audio.quit_fade_out_ms));
}

fn poll_recall(state: &mut EventLoopState) {
    let Some(rx) = &state.pending_recall else {
        return;
    };
    match rx.try_recv() {
        Ok(Ok(true)) => state.message = None,
        Ok(Ok(false)) => state.message = Some("nothing earlier in history".to_string()),
        Ok(Err(e)) => state.message = Some(format!("error: {e}")),
        Err(TryRecvError::Empty) => return,
        Err(TryRecvError::Disconnected) => {}
    }
    state.pending_recall = None;
}

fn note_event(state: &mut EventLoopState, ev: &PlayerEvent) {
    match ev {
        PlayerEvent::PlaybackFailed(e) => state.message = Some(format!("error: {e}")),
        PlayerEvent::TrackChanged(Some(_)) => state.message = None,
        _ => {}
    }
}

fn is_interrupt(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c')
}

/// Map a terminal key to the names used in the config.
fn key_from_event(key: &KeyEvent) -> Option<Key> {
    let k = match key.code {
        KeyCode::Char(' ') => Key::Space,
        KeyCode::Char(c) => Key::Char(c),
        KeyCode::Enter => Key::Enter,
        KeyCode::Esc => Key::Esc,
        KeyCode::Tab => Key::Tab,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        _ => return None,
    };
    Some(k)
}

/// Format seconds as `MM:SS`.
fn format_mmss(secs: f64) -> String {
    let secs = secs.max(0.0) as u64;
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

fn order_label(order: PlayOrder) -> &'static str {
    match order {
        PlayOrder::Normal => "normal",
        PlayOrder::Shuffle => "shuffle",
        PlayOrder::RepeatOne => "repeat one",
        PlayOrder::RepeatAll => "repeat all",
    }
}

fn status_line(info: &PlaybackInfo, favorite: bool, message: Option<&str>) -> String {
    let icon = match info.state {
        PlaybackState::Playing => ">",
        PlaybackState::Paused => "=",
        PlaybackState::Idle => ".",
    };
    let track = info
        .track
        .as_ref()
        .map_or_else(|| "(nothing loaded)".to_string(), |t| t.display());
    let volume = if info.muted {
        "muted".to_string()
    } else {
        format!("vol {:>3.0}%", info.volume * 100.0)
    };
    let mut line = format!(
        "{icon} {track}{}  {} / {}  [{}]  {volume}",
        if favorite { " *" } else { "" },
        format_mmss(info.position_secs),
        format_mmss(info.duration_secs),
        order_label(info.play_order),
    );
    if let Some(m) = message {
        line.push_str("  | ");
        line.push_str(m);
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_mmss_truncates() {
        assert_eq!(format_mmss(0.0), "00:00");
        assert_eq!(format_mmss(61.9), "01:01");
        assert_eq!(format_mmss(-4.0), "00:00");
    }

    #[test]
    fn status_line_shows_state_order_and_volume() {
        let info = PlaybackInfo {
            state: PlaybackState::Paused,
            position_secs: 75.0,
            duration_secs: 180.0,
            play_order: PlayOrder::RepeatAll,
            volume: 0.5,
            ..PlaybackInfo::default()
        };
        assert_eq!(
            status_line(&info, false, Some("hi")),
            "= (nothing loaded)  01:15 / 03:00  [repeat all]  vol  50%  | hi"
        );

        let muted = PlaybackInfo {
            muted: true,
            ..info
        };
        assert!(status_line(&muted, false, None).ends_with("muted"));
    }

    #[test]
    fn terminal_keys_map_to_config_names() {
        let key = |code| KeyEvent::new(code, KeyModifiers::NONE);
        assert_eq!(key_from_event(&key(KeyCode::Char(' '))), Some(Key::Space));
        assert_eq!(key_from_event(&key(KeyCode::Char('q'))), Some(Key::Char('q')));
        assert_eq!(key_from_event(&key(KeyCode::Left)), Some(Key::Left));
        assert_eq!(key_from_event(&key(KeyCode::F(1))), None);
        assert!(is_interrupt(&KeyEvent::new(
            KeyCode::Char('c'),
            KeyModifiers::CONTROL
        )));
    }
}
