//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once per process
//! - Pick the output format (pretty for development, JSON for production)
//!
//! # Design Decisions
//! - `RUST_LOG` wins over the configured level
//! - A second initialization is reported, not fatal

use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::ObservabilityConfig;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("unknown log format '{0}' (expected \"pretty\" or \"json\")")]
    UnknownFormat(String),

    #[error("failed to install tracing subscriber: {0}")]
    Install(String),
}

/// Default filter when `RUST_LOG` is unset.
pub fn default_filter(level: &str) -> String {
    format!("waypoint={level},tower_http={level},warn")
}

pub fn init_tracing(config: &ObservabilityConfig) -> Result<(), LoggingError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(&config.log_level)));

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match config.log_format.as_str() {
        "pretty" => registry.with(fmt::layer().with_target(false)).try_init(),
        "json" => registry
            .with(fmt::layer().json().flatten_event(true).with_current_span(true))
            .try_init(),
        other => return Err(LoggingError::UnknownFormat(other.to_string())),
    };
    installed.map_err(|e| LoggingError::Install(e.to_string()))
}
