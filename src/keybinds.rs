//! Key bindings: named actions, the keys they are bound to, and the engine
//! command each action turns into.

use std::collections::HashMap;
use std::fmt;

use tracing::warn;

use crate::audio::{PlaybackInfo, PlayerCmd};
use crate::config::{ControlsSettings, PlaybackSettings};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    PlayPause,
    Play,
    Pause,
    Stop,
    Next,
    Previous,
    JumpForwards,
    JumpBackwards,
    ChangePlayOrder,
    /// Play the track before the newest one in the history.
    RecallPrevious,
    VolumeUp,
    VolumeDown,
    ToggleMute,
    ToggleFavorite,
    Quit,
}

impl Action {
    pub const ALL: [Action; 15] = [
        Action::PlayPause,
        Action::Play,
        Action::Pause,
        Action::Stop,
        Action::Next,
        Action::Previous,
        Action::JumpForwards,
        Action::JumpBackwards,
        Action::ChangePlayOrder,
        Action::RecallPrevious,
        Action::VolumeUp,
        Action::VolumeDown,
        Action::ToggleMute,
        Action::ToggleFavorite,
        Action::Quit,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Action::PlayPause => "play-pause",
            Action::Play => "play",
            Action::Pause => "pause",
            Action::Stop => "stop",
            Action::Next => "next",
            Action::Previous => "previous",
            Action::JumpForwards => "jump-forwards",
            Action::JumpBackwards => "jump-backwards",
            Action::ChangePlayOrder => "change-play-order",
            Action::RecallPrevious => "recall-previous",
            Action::VolumeUp => "volume-up",
            Action::VolumeDown => "volume-down",
            Action::ToggleMute => "toggle-mute",
            Action::ToggleFavorite => "toggle-favorite",
            Action::Quit => "quit",
        }
    }

    /// Accepts kebab-case or snake_case, any letter case.
    pub fn from_name(name: &str) -> Option<Action> {
        let wanted = name.trim().to_ascii_lowercase().replace('_', "-");
        Action::ALL.into_iter().find(|a| a.name() == wanted)
    }

    /// The engine command for this action, given the current playback info.
    ///
    /// `ToggleFavorite` and `Quit` are handled by the caller and map to `None`.
    pub fn command(self, playback: &PlaybackSettings, info: &PlaybackInfo) -> Option<PlayerCmd> {
        let jump = playback.jump_seconds as f64;
        let cmd = match self {
            Action::PlayPause => PlayerCmd::TogglePlayPause,
            Action::Play => PlayerCmd::Resume,
            Action::Pause => PlayerCmd::Pause,
            Action::Stop => PlayerCmd::Stop,
            Action::Next => PlayerCmd::Next,
            Action::Previous => PlayerCmd::Previous,
            Action::JumpForwards => PlayerCmd::JumpBy(jump),
            Action::JumpBackwards => PlayerCmd::JumpBy(-jump),
            Action::ChangePlayOrder => PlayerCmd::CyclePlayOrder,
            Action::RecallPrevious => PlayerCmd::PlayPreviousInHistory { reply: None },
            Action::VolumeUp => {
                PlayerCmd::SetVolume((info.volume + playback.volume_step).clamp(0.0, 1.0))
            }
            Action::VolumeDown => {
                PlayerCmd::SetVolume((info.volume - playback.volume_step).clamp(0.0, 1.0))
            }
            Action::ToggleMute => PlayerCmd::ToggleMute,
            Action::ToggleFavorite | Action::Quit => return None,
        };
        Some(cmd)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A key as named in the config file.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Space,
    Enter,
    Esc,
    Tab,
    Left,
    Right,
    Up,
    Down,
}

impl Key {
    /// `space`, `enter`, `esc`, `tab`, arrow names, or a single character.
    pub fn parse(s: &str) -> Option<Key> {
        let lower = s.trim().to_ascii_lowercase();
        let key = match lower.as_str() {
            "space" | " " => Key::Space,
            "enter" | "return" => Key::Enter,
            "esc" | "escape" => Key::Esc,
            "tab" => Key::Tab,
            "left" => Key::Left,
            "right" => Key::Right,
            "up" => Key::Up,
            "down" => Key::Down,
            _ => {
                let mut chars = s.trim().chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Key::Char(c),
                    _ => return None,
                }
            }
        };
        Some(key)
    }
}

/// Resolved key -> action map.
#[derive(Debug, Clone, Default)]
pub struct Keybinds {
    map: HashMap<Key, Action>,
}

impl Keybinds {
    /// Unknown keys or actions are skipped with a warning. A later binding
    /// for the same key wins.
    pub fn from_settings(controls: &ControlsSettings) -> Self {
        let mut map = HashMap::new();
        for b in &controls.bindings {
            let (Some(key), Some(action)) = (Key::parse(&b.key), Action::from_name(&b.action))
            else {
                warn!(key = %b.key, action = %b.action, "ignoring invalid key binding");
                continue;
            };
            map.insert(key, action);
        }
        Self { map }
    }

    pub fn action_for(&self, key: Key) -> Option<Action> {
        self.map.get(&key).copied()
    }

    /// Keys bound to `action`, for help text.
    pub fn keys_for(&self, action: Action) -> Vec<Key> {
        let mut keys: Vec<Key> = self
            .map
            .iter()
            .filter(|(_, a)| **a == action)
            .map(|(k, _)| *k)
            .collect();
        keys.sort_by_key(|k| format!("{k:?}"));
        keys
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_names_round_trip() {
        for a in Action::ALL {
            assert_eq!(Action::from_name(a.name()), Some(a));
        }
        assert_eq!(Action::from_name("Recall_Previous"), Some(Action::RecallPrevious));
        assert_eq!(Action::from_name("self-destruct"), None);
    }

    #[test]
    fn key_parsing() {
        assert_eq!(Key::parse("space"), Some(Key::Space));
        assert_eq!(Key::parse("Left"), Some(Key::Left));
        assert_eq!(Key::parse("q"), Some(Key::Char('q')));
        assert_eq!(Key::parse("Q"), Some(Key::Char('Q')));
        assert_eq!(Key::parse("qq"), None);
        assert_eq!(Key::parse(""), None);
    }

    #[test]
    fn default_bindings_resolve() {
        let kb = Keybinds::from_settings(&ControlsSettings::default());
        assert_eq!(kb.len(), ControlsSettings::default().bindings.len());
        assert_eq!(kb.action_for(Key::Space), Some(Action::PlayPause));
        assert_eq!(kb.action_for(Key::Char('l')), Some(Action::Next));
        assert_eq!(kb.action_for(Key::Char('b')), Some(Action::RecallPrevious));
        assert_eq!(kb.action_for(Key::Char('z')), None);
        assert_eq!(
            kb.keys_for(Action::PlayPause),
            vec![Key::Char('p'), Key::Space]
        );
    }

    #[test]
    fn invalid_bindings_are_skipped_and_later_ones_win() {
        let controls = ControlsSettings {
            bindings: vec![
                crate::config::KeyBinding::new("n", "next"),
                crate::config::KeyBinding::new("n", "previous"),
                crate::config::KeyBinding::new("x", "explode"),
                crate::config::KeyBinding::new("ctrl+x", "quit"),
            ],
        };
        let kb = Keybinds::from_settings(&controls);
        assert_eq!(kb.len(), 1);
        assert_eq!(kb.action_for(Key::Char('n')), Some(Action::Previous));
    }

    #[test]
    fn actions_map_to_commands() {
        let playback = PlaybackSettings::default();
        let info = PlaybackInfo {
            volume: 0.95,
            ..PlaybackInfo::default()
        };

        assert!(matches!(
            Action::PlayPause.command(&playback, &info),
            Some(PlayerCmd::TogglePlayPause)
        ));
        match Action::JumpBackwards.command(&playback, &info) {
            Some(PlayerCmd::JumpBy(s)) => assert_eq!(s, -8.0),
            other => panic!("unexpected {other:?}"),
        }
        match Action::VolumeUp.command(&playback, &info) {
            Some(PlayerCmd::SetVolume(v)) => assert_eq!(v, 1.0),
            other => panic!("unexpected {other:?}"),
        }
        match Action::VolumeDown.command(&playback, &info) {
            Some(PlayerCmd::SetVolume(v)) => assert!((v - 0.85).abs() < 1e-6),
            other => panic!("unexpected {other:?}"),
        }
        assert!(Action::ToggleFavorite.command(&playback, &info).is_none());
        assert!(Action::Quit.command(&playback, &info).is_none());
    }
}
