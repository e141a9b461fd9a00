//! Tracing subscriber setup.

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Install the global subscriber.
///
/// An explicit `level` wins, then `RUST_LOG`, then the configured level.
pub fn init_tracing(config: &LoggingConfig, level: Option<&str>) -> Result<()> {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level)
            .with_context(|| format!("Invalid log level '{}'", level))?,
        None => EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&config.level))
            .with_context(|| format!("Invalid log level '{}'", config.level))?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    match config.format.to_lowercase().as_str() {
        "pretty" => tracing::subscriber::set_global_default(builder.pretty().finish())?,
        _ => tracing::subscriber::set_global_default(
            builder.json().with_thread_ids(true).finish(),
        )?,
    }

    Ok(())
}
