//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.

use crate::constants::{
    DEFAULT_ADMISSION_SKIP_NAMESPACES, DEFAULT_BACKOFF_MAX_MINUTES, DEFAULT_BACKOFF_MIN_MINUTES,
    DEFAULT_CONTROLLER_NAMESPACE, DEFAULT_MAX_CONCURRENT_RECONCILIATIONS, DEFAULT_METRICS_PORT,
    DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS, DEFAULT_WATCH_RESTART_DELAY_SECS,
    DEFAULT_WEBHOOK_PORT,
};
use std::path::PathBuf;
use std::time::Duration;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Text,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("text") {
            LogFormat::Text
        } else {
            LogFormat::Json
        }
    }
}

/// PEM certificate chain and private key the admission webhook serves TLS with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsFiles {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

/// Controller-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
/// Environment variables are populated from a ConfigMap using `envFrom` in the deployment.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Port for `/metrics`, `/healthz` and `/readyz`
    pub metrics_port: u16,
    /// Port the admission webhook listens on
    pub webhook_port: u16,
    /// Serve the admission webhook from this process
    pub enable_webhook: bool,
    /// Webhook certificate chain (PEM), usually a mounted `kubernetes.io/tls` Secret
    pub webhook_tls_cert_file: Option<PathBuf>,
    /// Webhook private key (PEM)
    pub webhook_tls_key_file: Option<PathBuf>,
    /// Namespace where the controller is deployed
    /// Always skipped by the Secret admission webhook
    pub controller_namespace: String,
    /// Additional namespaces the Secret admission webhook skips
    pub admission_skip_namespaces: Vec<String>,
    /// Global log level (ERROR, WARN, INFO, DEBUG, TRACE), used when `RUST_LOG` is unset
    pub log_level: String,
    /// Log format (json, text)
    pub log_format: LogFormat,
    /// Maximum concurrent reconciliations per controller
    pub max_concurrent_reconciliations: u16,
    /// Requeue interval used when backoff state cannot be read (seconds)
    pub reconciliation_error_requeue_secs: u64,
    /// Fibonacci backoff bounds for failed reconciliations (minutes)
    pub backoff_min_minutes: u64,
    pub backoff_max_minutes: u64,
    /// Delay before restarting the watch loop after the stream ends (seconds)
    pub watch_restart_delay_secs: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::from_source(|_| None)
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_source<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let source = Source(lookup);
        Self {
            metrics_port: source.parsed("METRICS_PORT", DEFAULT_METRICS_PORT),
            webhook_port: source.parsed("WEBHOOK_PORT", DEFAULT_WEBHOOK_PORT),
            enable_webhook: source.boolean("ENABLE_WEBHOOK", true),
            webhook_tls_cert_file: source.path("WEBHOOK_TLS_CERT_FILE"),
            webhook_tls_key_file: source.path("WEBHOOK_TLS_KEY_FILE"),
            controller_namespace: source.string("POD_NAMESPACE", DEFAULT_CONTROLLER_NAMESPACE),
            admission_skip_namespaces: source
                .string("ADMISSION_SKIP_NAMESPACES", DEFAULT_ADMISSION_SKIP_NAMESPACES)
                .split(',')
                .map(str::trim)
                .filter(|ns| !ns.is_empty())
                .map(str::to_string)
                .collect(),
            log_level: source.string("LOG_LEVEL", "INFO"),
            log_format: LogFormat::parse(&source.string("LOG_FORMAT", "json")),
            max_concurrent_reconciliations: source.parsed(
                "MAX_CONCURRENT_RECONCILIATIONS",
                DEFAULT_MAX_CONCURRENT_RECONCILIATIONS,
            ),
            reconciliation_error_requeue_secs: source.parsed(
                "RECONCILIATION_ERROR_REQUEUE_SECS",
                DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS,
            ),
            backoff_min_minutes: source.parsed("BACKOFF_MIN_MINUTES", DEFAULT_BACKOFF_MIN_MINUTES),
            backoff_max_minutes: source.parsed("BACKOFF_MAX_MINUTES", DEFAULT_BACKOFF_MAX_MINUTES),
            watch_restart_delay_secs: source
                .parsed("WATCH_RESTART_DELAY_SECS", DEFAULT_WATCH_RESTART_DELAY_SECS),
        }
    }

    /// Namespaces the Secret admission webhook never evaluates
    ///
    /// Secrets without a namespace are skipped as well.
    #[must_use]
    pub fn skipped_namespaces(&self) -> Vec<String> {
        let mut namespaces = self.admission_skip_namespaces.clone();
        if !namespaces.contains(&self.controller_namespace) {
            namespaces.push(self.controller_namespace.clone());
        }
        namespaces
    }

    /// TLS files for the webhook server, `None` to serve plain HTTP
    ///
    /// # Errors
    ///
    /// Returns an error if only one of the certificate and key is configured.
    pub fn webhook_tls(&self) -> Result<Option<TlsFiles>, anyhow::Error> {
        match (&self.webhook_tls_cert_file, &self.webhook_tls_key_file) {
            (Some(cert_path), Some(key_path)) => Ok(Some(TlsFiles {
                cert_path: cert_path.clone(),
                key_path: key_path.clone(),
            })),
            (None, None) => Ok(None),
            _ => anyhow::bail!(
                "WEBHOOK_TLS_CERT_FILE and WEBHOOK_TLS_KEY_FILE must be set together"
            ),
        }
    }

    /// Get watch restart delay duration
    #[must_use]
    pub fn watch_restart_delay_duration(&self) -> Duration {
        Duration::from_secs(self.watch_restart_delay_secs)
    }
}

struct Source<F>(F);

impl<F> Source<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Read a value or return default value
    fn parsed<T: std::str::FromStr>(&self, key: &str, default: T) -> T {
        (self.0)(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    /// Read a value as boolean or return default
    fn boolean(&self, key: &str, default: bool) -> bool {
        (self.0)(key)
            .map(|v| {
                let v_lower = v.trim().to_lowercase();
                v_lower == "true" || v_lower == "1" || v_lower == "yes" || v_lower == "on"
            })
            .unwrap_or(default)
    }

    /// Read a non-empty path
    fn path(&self, key: &str) -> Option<PathBuf> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    }

    /// Read a value as string or return default
    fn string(&self, key: &str, default: &str) -> String {
        (self.0)(key).unwrap_or_else(|| default.to_string())
    }
}
