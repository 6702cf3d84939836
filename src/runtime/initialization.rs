//! # Initialization
//!
//! Controller initialization: rustls setup, tracing, metrics, HTTP servers,
//! Kubernetes client and reconciler.

use crate::admission::webhook::{start_webhook_server, WebhookState};
use crate::admission::SecretAdmission;
use crate::config::ControllerConfig;
use crate::controller::events::KubeEventSink;
use crate::controller::reconciler::Reconciler;
use crate::controller::server::{start_server, ServerState};
use crate::controller::store::{ClusterStore, KubeStore};
use crate::crd::SecretPolicy;
use crate::observability;
use anyhow::{Context, Result};
use kube::api::{Api, ListParams};
use kube::Client;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Everything the watch loop needs
pub struct InitializationResult {
    /// Kubernetes client
    pub client: Client,
    /// Reconciler context shared by both controllers
    pub reconciler: Arc<Reconciler>,
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
    /// OpenTelemetry tracer provider (if initialized)
    pub otel_tracer_provider: Option<observability::otel::TracerProviderHandle>,
    pub config: ControllerConfig,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("server_ready", &self.server_state.ready())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Initialize the controller runtime
///
/// - rustls crypto provider
/// - OpenTelemetry and the tracing subscriber
/// - metrics registration
/// - probe/metrics server and, if enabled, the admission webhook server
/// - Kubernetes client and reconciler
/// - a check that the SecretPolicy CRD is installed
pub async fn initialize() -> Result<InitializationResult> {
    // Must run before anything opens a TLS connection.
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        warn!("rustls crypto provider was already installed");
    }

    let config = ControllerConfig::from_env();

    let otel_tracer_provider =
        observability::otel::init_otel().context("Failed to initialize OpenTelemetry")?;
    if let Err(e) = observability::init_tracing(&config) {
        // datadog-opentelemetry may have installed its own subscriber
        if otel_tracer_provider.is_none() {
            return Err(e);
        }
        warn!("Tracing subscriber already initialized: {}", e);
    }

    info!("Starting Secret Policy Controller");
    info!(
        "Build info: timestamp={}, datetime={}, git_hash={}",
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );
    info!(?config, "Loaded controller configuration");

    observability::metrics::register_metrics()?;

    let server_state = Arc::new(ServerState::default());
    let server_state_clone = server_state.clone();
    let metrics_port = config.metrics_port;
    tokio::spawn(async move {
        if let Err(e) = start_server(metrics_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let store: Arc<dyn ClusterStore> = Arc::new(KubeStore::new(client.clone()));
    let events = Arc::new(KubeEventSink::new(client.clone()));
    let reconciler = Arc::new(Reconciler::new(store.clone(), events).with_config(&config));

    if config.enable_webhook {
        let tls = config.webhook_tls()?;
        let state = Arc::new(WebhookState {
            secrets: SecretAdmission::new(store, config.skipped_namespaces()),
        });
        let webhook_port = config.webhook_port;
        tokio::spawn(async move {
            if let Err(e) = start_webhook_server(webhook_port, tls, state).await {
                error!("Admission webhook server error: {}", e);
            }
        });
    } else {
        info!("Admission webhook disabled (ENABLE_WEBHOOK=false)");
    }

    // Fail early with a clear message if the CRD is not installed.
    let policies: Api<SecretPolicy> = Api::all(client.clone());
    policies
        .list(&ListParams::default().limit(1))
        .await
        .context("SecretPolicy CRD is not queryable, is it installed? Run `crdgen | kubectl apply -f -`")?;

    server_state.set_ready(true);
    info!("Controller initialized, starting watch loop...");

    Ok(InitializationResult {
        client,
        reconciler,
        server_state,
        otel_tracer_provider,
        config,
    })
}
