//! Tracing subscriber setup

use tracing_subscriber::EnvFilter;

use crate::config::{Config, LoggingConfig};
use crate::error::{Error, Result};

/// Initialize tracing from the logging configuration
///
/// An unparseable level falls back to `info`. Installing a second global
/// subscriber fails with [`Error::Tracing`] instead of panicking.
pub fn init_tracing(config: &Config) -> Result<()> {
    let logging = &config.logging;
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter(logging));

    let installed = if logging.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| Error::Tracing(e.to_string()))?;

    tracing::debug!(level = %logging.level, json = logging.json, "Tracing initialized");

    Ok(())
}

fn env_filter(logging: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_new(&logging.level).unwrap_or_else(|_| EnvFilter::new("info"))
}
