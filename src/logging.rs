//! Tracing subscriber setup

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;

/// Filter for the given settings: `debug` wins, then `RUST_LOG`, then the
/// configured level.
pub fn build_filter(config: &LoggingConfig) -> EnvFilter {
    if config.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
    }
}

/// Install the global subscriber. Returns false if one was already set.
pub fn init_logging(config: &LoggingConfig) -> bool {
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(config.with_target))
        .with(build_filter(config))
        .try_init()
        .is_ok()
}
