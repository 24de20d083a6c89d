use tracing::{info, warn};

use encore::config;

/// Load settings, falling back to defaults on any problem. Config is optional;
/// failures should not prevent the app from starting.
///
/// Runs before logging is set up, so problems go to stderr.
pub fn load_settings() -> config::Settings {
    match config::Settings::load() {
        Ok(s) => {
            if let Err(msg) = s.validate() {
                eprintln!("encore: invalid config, using defaults: {msg}");
                config::Settings::default()
            } else {
                s
            }
        }
        Err(e) => {
            eprintln!("encore: failed to load config, using defaults: {e}");
            config::Settings::default()
        }
    }
}

/// Write the defaults to the config path on first run so users have a file to edit.
pub fn materialize_default_config(settings: &config::Settings) {
    let Some(path) = config::resolve_config_path() else {
        return;
    };
    if path.exists() {
        return;
    }
    match settings.save_to(&path) {
        Ok(()) => info!(path = %path.display(), "wrote default config"),
        Err(e) => warn!(path = %path.display(), error = %e, "could not write default config"),
    }
}
