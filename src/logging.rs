use std::path::Path;

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

/// Initializes the global `tracing` subscriber from the loaded config.
/// Stderr output is always on; a rolling file sink is added when
/// `file_output` is set. Returns the file appender's guard, which must be
/// kept alive for the process lifetime or buffered lines are lost.
pub fn init(config: &LoggingConfig, verbose: bool) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.console_level.to_lowercase()))
    };

    if !config.file_output {
        fmt().with_env_filter(filter).init();
        return None;
    }

    let path = Path::new(&config.file_path);
    let (dir, prefix) = match (path.parent(), path.file_name()) {
        (Some(dir), Some(name)) if !dir.as_os_str().is_empty() => (dir, name.to_string_lossy().into_owned()),
        _ => (Path::new("logs"), "integrity_watch.log".to_string()),
    };
    let _ = std::fs::create_dir_all(dir);
    let file_appender = tracing_appender::rolling::daily(dir, prefix);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .init();

    Some(guard)
}
