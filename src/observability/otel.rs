//! # OpenTelemetry Support
//!
//! Optional Datadog trace export via `datadog-opentelemetry`.
//!
//! Tracing is only exported when `DD_API_KEY` is present in the environment.
//! Other `DD_*` variables (`DD_SERVICE`, `DD_VERSION`, `DD_ENV`, `DD_SITE`,
//! `DD_TRACE_AGENT_URL`) are given defaults here and then read by the
//! Datadog crate during initialization.

use anyhow::Result;
use std::time::Duration;
use tracing::{info, warn};

/// Tracer provider handle for graceful shutdown
#[derive(Debug)]
pub enum TracerProviderHandle {
    Datadog(opentelemetry_sdk::trace::SdkTracerProvider),
}

/// Initialize Datadog tracing if `DD_API_KEY` is set
///
/// Returns `Ok(None)` when tracing export is not configured.
pub fn init_otel() -> Result<Option<TracerProviderHandle>> {
    if std::env::var("DD_API_KEY").is_err() {
        if std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").is_ok() {
            warn!("OTEL_EXPORTER_OTLP_ENDPOINT is set but only Datadog export is supported");
        }
        return Ok(None);
    }

    set_default_env("DD_SERVICE", || crate::constants::CONTROLLER_NAME.to_string());
    set_default_env("DD_VERSION", || {
        format!("{}-{}", env!("CARGO_PKG_VERSION"), env!("BUILD_GIT_HASH"))
    });
    set_default_env("DD_SITE", || "datadoghq.com".to_string());
    set_default_env("DD_TRACE_AGENT_URL", || "http://localhost:8126".to_string());

    let tracer_provider = datadog_opentelemetry::tracing().init();

    info!(
        "Datadog tracing initialized: service={}, version={}, agent={}",
        std::env::var("DD_SERVICE").unwrap_or_default(),
        std::env::var("DD_VERSION").unwrap_or_default(),
        std::env::var("DD_TRACE_AGENT_URL").unwrap_or_default()
    );

    Ok(Some(TracerProviderHandle::Datadog(tracer_provider)))
}

/// Set `key` only when the environment does not already provide it
///
/// Must run before any other thread reads the environment.
fn set_default_env(key: &str, default: impl FnOnce() -> String) {
    if std::env::var(key).is_err() {
        std::env::set_var(key, default());
    }
}

/// Flush pending spans and shut the tracer provider down
pub fn shutdown_otel(tracer_provider: Option<TracerProviderHandle>) {
    if let Some(TracerProviderHandle::Datadog(provider)) = tracer_provider {
        info!("Shutting down Datadog tracer provider...");
        if let Err(e) = provider.shutdown_with_timeout(Duration::from_secs(5)) {
            warn!("Error shutting down Datadog tracer provider: {}", e);
        }
    }
}
