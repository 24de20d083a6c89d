use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::library::TrackSorting;

/// Top-level application settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/encore/config.toml` or `~/.config/encore/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `ENCORE__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub audio: AudioSettings,
    pub playback: PlaybackSettings,
    pub library: LibrarySettings,
    pub storage: StorageSettings,
    pub controls: ControlsSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// How often the engine thread polls the output for progress and
    /// completion (milliseconds).
    pub tick_ms: u64,
    /// Fade-out duration when quitting (milliseconds).
    /// Set to 0 to stop immediately.
    pub quit_fade_out_ms: u64,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            tick_ms: 200,
            quit_fade_out_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Play order used when no saved state exists.
    pub play_order: PlayOrderSetting,
    /// Maximum number of entries kept in the play history.
    pub history_capacity: usize,
    /// Sorting applied to album playlists.
    pub track_sorting: TrackSorting,
    /// Seconds skipped by the jump forwards/backwards actions.
    pub jump_seconds: u64,
    /// Volume change applied by the volume up/down actions.
    pub volume_step: f32,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            play_order: PlayOrderSetting::Normal,
            history_capacity: 30,
            track_sorting: TrackSorting::TrackNumber,
            jump_seconds: 8,
            volume_step: 0.1,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlayOrderSetting {
    #[serde(alias = "sequential", alias = "no-loop", alias = "no_loop")]
    Normal,
    #[serde(alias = "random")]
    Shuffle,
    #[serde(alias = "repeat_one", alias = "loop-one", alias = "loop_one")]
    RepeatOne,
    #[serde(
        alias = "repeat_all",
        alias = "loop-all",
        alias = "loop_all",
        alias = "loop-around"
    )]
    RepeatAll,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// Directory scanned when none is given on the command line.
    pub music_dir: Option<PathBuf>,
    /// File extensions to treat as audio (case-insensitive, without dot).
    pub extensions: Vec<String>,
    /// Whether to follow symlinks during scanning.
    pub follow_links: bool,
    /// Whether to include hidden files/directories (dotfiles).
    pub include_hidden: bool,
    /// Whether to recurse into subdirectories.
    pub recursive: bool,
    /// Optional cap on directory recursion depth.
    pub max_depth: Option<usize>,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            music_dir: None,
            extensions: vec!["mp3".into(), "flac".into(), "wav".into(), "ogg".into()],
            follow_links: true,
            include_hidden: true,
            recursive: true,
            max_depth: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Where the player state is saved. Defaults to
    /// `$XDG_DATA_HOME/encore/state.json` or `~/.local/share/encore/state.json`.
    pub state_path: Option<PathBuf>,
    /// Directory for rolling log files. Defaults to `logs/` next to the state file.
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBinding {
    /// A single character, or `space` / `enter` / `left` / `right` / `up` / `down`.
    pub key: String,
    /// Action name, e.g. `play-pause` or `next`.
    pub action: String,
}

impl KeyBinding {
    pub fn new(key: &str, action: &str) -> Self {
        Self {
            key: key.to_string(),
            action: action.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlsSettings {
    pub bindings: Vec<KeyBinding>,
}

impl Default for ControlsSettings {
    fn default() -> Self {
        Self {
            bindings: vec![
                KeyBinding::new("space", "play-pause"),
                KeyBinding::new("p", "play-pause"),
                KeyBinding::new("s", "stop"),
                KeyBinding::new("l", "next"),
                KeyBinding::new("h", "previous"),
                KeyBinding::new("right", "jump-forwards"),
                KeyBinding::new("left", "jump-backwards"),
                KeyBinding::new("r", "change-play-order"),
                KeyBinding::new("b", "recall-previous"),
                KeyBinding::new("up", "volume-up"),
                KeyBinding::new("down", "volume-down"),
                KeyBinding::new("m", "toggle-mute"),
                KeyBinding::new("f", "toggle-favorite"),
                KeyBinding::new("q", "quit"),
            ],
        }
    }
}
