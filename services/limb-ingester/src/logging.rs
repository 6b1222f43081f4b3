//! Tracing subscriber setup.

use anyhow::Result;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};

const LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Filter used when `RUST_LOG` is unset. Unknown levels fall back to `info`.
pub fn default_filter(config: &LoggingConfig) -> EnvFilter {
    let level = config.level.to_lowercase();
    if LEVELS.contains(&level.as_str()) {
        EnvFilter::new(level)
    } else {
        EnvFilter::new("info")
    }
}

/// Install the global subscriber. `RUST_LOG` takes precedence over the config level.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(config));

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr);

    match config.format {
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
        LogFormat::Text => tracing::subscriber::set_global_default(builder.finish())?,
    }
    Ok(())
}
