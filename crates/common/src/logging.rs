//! Logging and tracing initialization.

use std::sync::Arc;

use crate::config::LoggingConfig;

/// Initialize the tracing subscriber with the given configuration.
///
/// `RUST_LOG` wins over the configured level when set. When a log file is
/// configured but cannot be opened, logging falls back to stderr.
pub fn init_logging(config: &LoggingConfig) {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let log_file = config.file.as_ref().and_then(|path| {
        match std::fs::OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(Arc::new(file)),
            Err(e) => {
                eprintln!("cinecut: cannot open log file {}: {e}", path.display());
                None
            }
        }
    });

    let result = match (log_file, config.json) {
        (Some(file), true) => tracing::subscriber::set_global_default(
            fmt::Subscriber::builder()
                .with_env_filter(env_filter)
                .json()
                .with_writer(file)
                .finish(),
        ),
        (Some(file), false) => tracing::subscriber::set_global_default(
            fmt::Subscriber::builder()
                .with_env_filter(env_filter)
                .with_ansi(false)
                .with_writer(file)
                .finish(),
        ),
        (None, true) => tracing::subscriber::set_global_default(
            fmt::Subscriber::builder()
                .with_env_filter(env_filter)
                .json()
                .finish(),
        ),
        (None, false) => tracing::subscriber::set_global_default(
            fmt::Subscriber::builder()
                .with_env_filter(env_filter)
                .with_target(true)
                .finish(),
        ),
    };

    // A second init (tests, embedders) keeps the first subscriber.
    result.ok();
}

/// Initialize logging with defaults (useful for tests and quick scripts).
pub fn init_default_logging() {
    init_logging(&LoggingConfig::default());
}
