use super::load::{default_data_dir, resolve_config_path};
use super::schema::*;
use crate::library::TrackSorting;
use std::sync::{Mutex, OnceLock};

static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|e| e.into_inner())
}

struct EnvGuard {
    key: &'static str,
    old: Option<std::ffi::OsString>,
}

impl EnvGuard {
    fn set(key: &'static str, val: &str) -> Self {
        let old = std::env::var_os(key);
        unsafe {
            std::env::set_var(key, val);
        }
        Self { key, old }
    }

    fn remove(key: &'static str) -> Self {
        let old = std::env::var_os(key);
        unsafe {
            std::env::remove_var(key);
        }
        Self { key, old }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        match self.old.take() {
            Some(v) => unsafe {
                std::env::set_var(self.key, v);
            },
            None => unsafe {
                std::env::remove_var(self.key);
            },
        }
    }
}

#[test]
fn config_state_and_log_paths_follow_xdg_homes() {
    let _lock = env_lock();
    let _g1 = EnvGuard::remove("ENCORE_CONFIG_PATH");
    let _g2 = EnvGuard::set("XDG_CONFIG_HOME", "/tmp/xdg-config");
    let _g3 = EnvGuard::set("XDG_DATA_HOME", "/tmp/xdg-data");
    let _g4 = EnvGuard::set("HOME", "/tmp/home-should-not-win");

    assert_eq!(
        resolve_config_path().unwrap(),
        std::path::PathBuf::from("/tmp/xdg-config/encore/config.toml")
    );

    let storage = StorageSettings::default();
    assert_eq!(
        storage.resolve_state_path().unwrap(),
        std::path::PathBuf::from("/tmp/xdg-data/encore/state.json")
    );
    assert_eq!(
        storage.resolve_log_dir().unwrap(),
        std::path::PathBuf::from("/tmp/xdg-data/encore/logs")
    );

    let logs_elsewhere = StorageSettings {
        state_path: None,
        log_dir: Some("/var/tmp/encore-logs".into()),
    };
    assert_eq!(
        logs_elsewhere.resolve_log_dir().unwrap(),
        std::path::PathBuf::from("/var/tmp/encore-logs")
    );

    let _g5 = EnvGuard::set("ENCORE_CONFIG_PATH", "/tmp/encore-test-config.toml");
    assert_eq!(
        resolve_config_path().unwrap(),
        std::path::PathBuf::from("/tmp/encore-test-config.toml")
    );
}

#[test]
fn default_data_dir_falls_back_to_home_local_share() {
    let _lock = env_lock();
    let _g1 = EnvGuard::remove("XDG_DATA_HOME");
    let _g2 = EnvGuard::set("HOME", "/tmp/home-dir");

    let p = default_data_dir().unwrap();
    assert_eq!(
        p,
        std::path::PathBuf::from("/tmp/home-dir")
            .join(".local")
            .join("share")
            .join("encore")
    );

    let storage = StorageSettings::default();
    assert_eq!(storage.resolve_state_path().unwrap(), p.join("state.json"));

    let explicit = StorageSettings {
        state_path: Some("/tmp/elsewhere.json".into()),
        log_dir: None,
    };
    assert_eq!(
        explicit.resolve_state_path().unwrap(),
        std::path::PathBuf::from("/tmp/elsewhere.json")
    );
}

#[test]
fn settings_load_from_config_file_and_parse_aliases() {
    let _lock = env_lock();

    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("config.toml");
    std::fs::write(
        &cfg_path,
        r#"
[playback]
play_order = "loop-all"
history_capacity = 3
track_sorting = "date_added"
jump_seconds = 15

[audio]
tick_ms = 50
quit_fade_out_ms = 0

[library]
extensions = ["mp3"]
recursive = false

[[controls.bindings]]
key = "n"
action = "next"
"#,
    )
    .unwrap();

    let _g1 = EnvGuard::set("ENCORE_CONFIG_PATH", cfg_path.to_str().unwrap());
    let _g2 = EnvGuard::remove("ENCORE__PLAYBACK__HISTORY_CAPACITY");

    let s = Settings::load().unwrap();
    assert_eq!(s.playback.play_order, PlayOrderSetting::RepeatAll);
    assert_eq!(s.playback.history_capacity, 3);
    assert_eq!(s.playback.track_sorting, TrackSorting::DateAdded);
    assert_eq!(s.playback.jump_seconds, 15);
    assert_eq!(s.audio.tick_ms, 50);
    assert_eq!(s.audio.quit_fade_out_ms, 0);
    assert_eq!(s.library.extensions, vec!["mp3".to_string()]);
    assert!(!s.library.recursive);
    assert_eq!(s.controls.bindings, vec![KeyBinding::new("n", "next")]);
    assert!(s.validate().is_ok());
}

#[test]
fn settings_env_overrides_config_file() {
    let _lock = env_lock();

    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("config.toml");
    std::fs::write(
        &cfg_path,
        r#"
[playback]
history_capacity = 10
"#,
    )
    .unwrap();

    let _g1 = EnvGuard::set("ENCORE_CONFIG_PATH", cfg_path.to_str().unwrap());
    let _g2 = EnvGuard::set("ENCORE__PLAYBACK__HISTORY_CAPACITY", "4");

    let s = Settings::load().unwrap();
    assert_eq!(s.playback.history_capacity, 4);
}

#[test]
fn validate_rejects_zero_capacity_and_unknown_actions() {
    let mut s = Settings::default();
    assert!(s.validate().is_ok());

    s.playback.history_capacity = 0;
    assert!(s.validate().is_err());

    let mut s = Settings::default();
    s.controls.bindings.push(KeyBinding::new("x", "self-destruct"));
    let err = s.validate().unwrap_err();
    assert!(err.contains("self-destruct"));
}

#[test]
fn saved_defaults_load_back() {
    let _lock = env_lock();

    let dir = tempfile::tempdir().unwrap();
    let cfg_path = dir.path().join("nested").join("config.toml");
    Settings::default().save_to(&cfg_path).unwrap();

    let _g1 = EnvGuard::set("ENCORE_CONFIG_PATH", cfg_path.to_str().unwrap());
    let s = Settings::load().unwrap();
    assert_eq!(s.playback.history_capacity, 30);
    assert_eq!(s.controls.bindings, ControlsSettings::default().bindings);
}
