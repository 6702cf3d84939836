//! # Watch Loop
//!
//! Runs the two kube-runtime controllers that feed the reconciler:
//!
//! - SecretPolicy changes trigger policy-scoped passes
//! - Secret changes trigger secret-scoped passes
//!
//! kube-runtime queues triggers and never runs two reconciliations for the
//! same object at once. SecretPolicy events only pass through when
//! `metadata.generation` changes, so the controller's own status and
//! finalizer writes do not trigger another pass. The number of concurrent reconciliations per
//! controller is bounded by `MAX_CONCURRENT_RECONCILIATIONS`.

use crate::config::ControllerConfig;
use crate::controller::reconciler::{Reconciler, ReconcilerError, Trigger};
use crate::controller::server::ServerState;
use crate::crd::SecretPolicy;
use crate::observability;
use crate::runtime::error_policy::{
    handle_watch_stream_error, policy_error_policy, secret_error_policy,
};
use futures::StreamExt;
use k8s_openapi::api::core::v1::Secret;
use kube::api::Api;
use kube::{Client, ResourceExt};
use kube_runtime::controller::{self, Action};
use kube_runtime::{predicates, reflector, watcher, Controller, WatchStreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Run both controllers until shutdown
///
/// If the controller streams end without a shutdown request they are
/// restarted after `WATCH_RESTART_DELAY_SECS`.
pub async fn run_watch_loop(
    client: Client,
    reconciler: Arc<Reconciler>,
    server_state: Arc<ServerState>,
    config: &ControllerConfig,
) -> Result<(), anyhow::Error> {
    let shutdown_state = server_state.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Received shutdown signal, initiating graceful shutdown...");
        shutdown_state.set_ready(false);
    });

    let restart_delay = config.watch_restart_delay_duration();
    let controller_config =
        controller::Config::default().concurrency(config.max_concurrent_reconciliations);

    loop {
        if !server_state.ready() {
            info!("Shutdown requested, exiting watch loop");
            break;
        }

        info!("Starting SecretPolicy and Secret controllers...");
        let policies: Api<SecretPolicy> = Api::all(client.clone());
        let secrets: Api<Secret> = Api::all(client.clone());

        let (policy_reader, policy_writer) = reflector::store();
        let policy_events = reflector::reflector(
            policy_writer,
            watcher(policies, watcher::Config::default().any_semantic()),
        )
        .default_backoff()
        .applied_objects()
        .predicate_filter(predicates::generation);

        let policy_controller =
            Controller::for_stream(policy_events, policy_reader)
                .with_config(controller_config.clone())
                .shutdown_on_signal()
                .run(reconcile_policy, policy_error_policy, reconciler.clone())
                .for_each(move |result| {
                    observe_result(result.map(|(object, _)| object.to_string()), restart_delay)
                });

        let secret_controller = Controller::new(secrets, watcher::Config::default().any_semantic())
            .with_config(controller_config.clone())
            .shutdown_on_signal()
            .run(reconcile_secret, secret_error_policy, reconciler.clone())
            .for_each(move |result| {
                observe_result(result.map(|(object, _)| object.to_string()), restart_delay)
            });

        futures::future::join(policy_controller, secret_controller).await;

        if !server_state.ready() {
            info!("Shutdown requested, exiting watch loop");
            break;
        }

        warn!(
            "Controller watch streams ended, restarting in {} seconds...",
            restart_delay.as_secs()
        );
        tokio::time::sleep(restart_delay).await;
    }

    info!("Controller stopped gracefully");
    Ok(())
}

/// Resolves on SIGINT, or SIGTERM on unix
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

async fn reconcile_policy(
    obj: Arc<SecretPolicy>,
    ctx: Arc<Reconciler>,
) -> Result<Action, ReconcilerError> {
    let trigger = Trigger::policy(obj.namespace().unwrap_or_default(), obj.name_any());
    ctx.reconcile(&trigger).await.map(into_action)
}

async fn reconcile_secret(obj: Arc<Secret>, ctx: Arc<Reconciler>) -> Result<Action, ReconcilerError> {
    let trigger = Trigger::secret(obj.namespace().unwrap_or_default(), obj.name_any());
    ctx.reconcile(&trigger).await.map(into_action)
}

/// Map the reconciler's optional wake-up delay onto a controller action
#[must_use]
pub fn into_action(requeue: Option<Duration>) -> Action {
    match requeue {
        Some(delay) => {
            observability::metrics::increment_requeues_total("rotation");
            Action::requeue(delay)
        }
        None => Action::await_change(),
    }
}

async fn observe_result(
    result: Result<String, controller::Error<ReconcilerError, watcher::Error>>,
    restart_delay: Duration,
) {
    match result {
        Ok(object) => debug!("Reconciled {}", object),
        // Already handled by the error policy.
        Err(controller::Error::ReconcilerFailed(_, object)) => {
            debug!("Reconciliation of {} failed", object);
        }
        Err(e) => handle_watch_stream_error(&format!("{e:?}"), restart_delay).await,
    }
}
