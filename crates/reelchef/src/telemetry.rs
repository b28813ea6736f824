//! Logging bootstrap.
//!
//! One subscriber for the whole process: `RUST_LOG` wins, then the
//! configured level, then `info`. `log` records are bridged into tracing
//! so both facades end up in the same output.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};
use crate::error::ReelchefError;

pub fn init_logging(config: &LoggingConfig) -> Result<(), ReelchefError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.level.as_deref().unwrap_or("info")))
        .map_err(|e| ReelchefError::Telemetry(e.to_string()))?;

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match config.format {
        LogFormat::Text => tracing::subscriber::set_global_default(
            registry.with(tracing_subscriber::fmt::layer()),
        ),
        LogFormat::Json => tracing::subscriber::set_global_default(
            registry.with(tracing_subscriber::fmt::layer().json().with_current_span(true)),
        ),
    };
    installed.map_err(|e| ReelchefError::Telemetry(e.to_string()))?;

    tracing_log::LogTracer::init().map_err(|e| ReelchefError::Telemetry(e.to_string()))
}
