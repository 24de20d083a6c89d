use std::env;
use std::path::PathBuf;

use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use tracing::{error, info};

mod event_loop;
mod logging;
mod settings;
mod startup;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = settings::load_settings();
    let _log_guard = logging::init(&settings.storage);
    settings::materialize_default_config(&settings);

    let dir: PathBuf = env::args()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| settings.library.music_dir.clone())
        .or_else(|| env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("Music"));
    info!(dir = %dir.display(), "starting");

    let session = match startup::start(&dir, &settings) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "startup failed");
            return Err(e);
        }
    };

    enable_raw_mode()?;
    let mut state = event_loop::EventLoopState::default();
    let run_result = event_loop::run(&settings, &session, &mut state);
    disable_raw_mode()?;

    run_result
}
