use std::fs;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use encore::config::StorageSettings;

/// Install the global subscriber, writing to a daily rolling file.
///
/// The terminal is in raw mode while the player runs, so nothing is logged to
/// stdout or stderr. Returns the guard that flushes the writer; keep it alive
/// until exit. `None` when no log directory can be determined or created.
pub fn init(storage: &StorageSettings) -> Option<WorkerGuard> {
    let log_dir = storage.resolve_log_dir()?;
    if let Err(e) = fs::create_dir_all(&log_dir) {
        eprintln!("encore: cannot create log directory {}: {e}", log_dir.display());
        return None;
    }

    let file_appender = tracing_appender::rolling::daily(&log_dir, "encore.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,encore=debug"));

    let subscriber = tracing_subscriber::fmt()
        .with_writer(file_writer)
        .with_target(true)
        .with_level(true)
        .with_ansi(false)
        .with_env_filter(filter)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("encore: logging disabled: {e}");
        return None;
    }
    Some(guard)
}
