//! # Observability
//!
//! Logging, metrics and optional trace export.

pub mod metrics;
pub mod otel;

use crate::config::{ControllerConfig, LogFormat};
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber
///
/// `RUST_LOG` takes precedence; otherwise the configured `LOG_LEVEL` applies
/// to this crate and `warn` to everything else. Returns an error if a
/// subscriber is already installed.
pub fn init_tracing(config: &ControllerConfig) -> Result<(), anyhow::Error> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,secret_policy_controller={}",
            config.log_level.to_lowercase()
        ))
    });

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match config.log_format {
        LogFormat::Json => builder
            .json()
            .with_current_span(true)
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?,
        LogFormat::Text => builder
            .try_init()
            .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?,
    }
    Ok(())
}
