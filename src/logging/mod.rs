//! Console and log-file tracing setup.
//!
//! Both layers share the verbosity chosen on the command line. Events on
//! [`SECRET_TARGET`] carry plaintext credentials and are only ever written to
//! the console; the log file drops them.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing::level_filters::LevelFilter;
use tracing::Level;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::error::{AppError, Result};

/// Target for events whose fields include secrets.
pub const SECRET_TARGET: &str = "ionapi_probe::secrets";

/// Level used by both layers.
pub fn level_for(debug: bool) -> LevelFilter {
    if debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    }
}

/// Whether an event may be written to the persistent log.
pub fn persistable(target: &str, event_level: &Level, max: LevelFilter) -> bool {
    target != SECRET_TARGET && *event_level <= max
}

/// Install the global subscriber: console on stderr plus an append-mode log file.
pub fn init(log_file: &Path, debug: bool) -> Result<()> {
    let level = level_for(debug);

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .map_err(|e| AppError::Logging(format!("cannot open {}: {}", log_file.display(), e)))?;

    let console_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let console = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .with_filter(console_filter);

    let persistent = fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_writer(Mutex::new(file))
        .with_filter(filter_fn(move |metadata| {
            persistable(metadata.target(), metadata.level(), level)
        }));

    tracing_subscriber::registry()
        .with(console)
        .with(persistent)
        .try_init()
        .map_err(|e| AppError::Logging(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_target_never_persisted() {
        assert!(!persistable(SECRET_TARGET, &Level::DEBUG, LevelFilter::DEBUG));
        assert!(!persistable(SECRET_TARGET, &Level::ERROR, LevelFilter::TRACE));
    }

    #[test]
    fn test_level_gates_persistence() {
        let target = "ionapi_probe::runner";
        assert!(!persistable(target, &Level::DEBUG, level_for(false)));
        assert!(persistable(target, &Level::DEBUG, level_for(true)));
        assert!(persistable(target, &Level::INFO, level_for(false)));
        assert!(persistable(target, &Level::WARN, level_for(false)));
    }

    #[test]
    fn test_init_fails_for_unwritable_path() {
        let err = init(Path::new("/nonexistent-dir/ionapi-probe.log"), false).unwrap_err();
        assert!(matches!(err, AppError::Logging(_)));
    }
}
