//! # Error Policy
//!
//! Error handling and backoff logic for the controller watch loops.
//! Handles reconciliation errors and classifies watch stream errors.

use crate::controller::reconciler::{Reconciler, ReconcilerError, Trigger};
use crate::crd::SecretPolicy;
use crate::observability;
use k8s_openapi::api::core::v1::Secret;
use kube::ResourceExt;
use kube_runtime::controller::Action;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Error policy for the SecretPolicy controller
pub fn policy_error_policy(
    obj: Arc<SecretPolicy>,
    error: &ReconcilerError,
    ctx: Arc<Reconciler>,
) -> Action {
    let trigger = Trigger::policy(obj.namespace().unwrap_or_default(), obj.name_any());
    handle_reconciliation_error(&trigger, error, &ctx)
}

/// Error policy for the Secret controller
pub fn secret_error_policy(obj: Arc<Secret>, error: &ReconcilerError, ctx: Arc<Reconciler>) -> Action {
    let trigger = Trigger::secret(obj.namespace().unwrap_or_default(), obj.name_any());
    handle_reconciliation_error(&trigger, error, &ctx)
}

/// Handle reconciliation errors with Fibonacci backoff
///
/// Backoff state is tracked per trigger key so that one failing object does
/// not slow down retries of others. Errors that cannot succeed on retry wait
/// for the next change to the object instead.
pub fn handle_reconciliation_error(
    trigger: &Trigger,
    error: &ReconcilerError,
    ctx: &Reconciler,
) -> Action {
    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.watch.reconciliation_error",
        trigger.kind = trigger.kind.as_str(),
        resource.namespace = trigger.namespace.as_str(),
        resource.name = trigger.name.as_str(),
        error = %error
    );
    let _error_guard = error_span.enter();

    observability::metrics::increment_reconciliation_errors();

    if !error.is_retryable() {
        error!("Reconciliation of {} failed permanently: {}", trigger, error);
        return Action::await_change();
    }

    let (backoff_seconds, error_count) = ctx.next_backoff(&trigger.key());
    info!(
        "Retrying {} with Fibonacci backoff: {}s (error count: {})",
        trigger, backoff_seconds, error_count
    );

    observability::metrics::increment_requeues_total("error-backoff");
    Action::requeue(Duration::from_secs(backoff_seconds))
}

/// Classification of an error surfaced by a controller stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamErrorKind {
    /// RBAC revoked or token expired (401)
    Unauthorized,
    /// Resource version too old (410), the watch restarts by itself
    Expired,
    /// API server storage reinitializing (429)
    Throttled,
    /// Object or CRD missing (404)
    NotFound,
    Other,
}

/// Classify a watch stream error from its debug representation
#[must_use]
pub fn classify_stream_error(error_string: &str) -> StreamErrorKind {
    // 404 first: a plain-text 404 body surfaces as a WatchFailed serde error.
    let is_not_found = error_string.contains("ObjectNotFound")
        || error_string.contains("404")
        || error_string.contains("not found");
    if is_not_found {
        StreamErrorKind::NotFound
    } else if error_string.contains("401") || error_string.contains("Unauthorized") {
        StreamErrorKind::Unauthorized
    } else if error_string.contains("410")
        || error_string.contains("too old resource version")
        || error_string.contains("Expired")
        || error_string.contains("Gone")
    {
        StreamErrorKind::Expired
    } else if error_string.contains("429")
        || error_string.contains("storage is (re)initializing")
        || error_string.contains("TooManyRequests")
    {
        StreamErrorKind::Throttled
    } else {
        StreamErrorKind::Other
    }
}

/// Log a watch stream error and wait before the stream is polled again
pub async fn handle_watch_stream_error(error_string: &str, restart_delay: Duration) {
    let error_span = tracing::span!(
        tracing::Level::WARN,
        "controller.watch.error",
        error = %error_string
    );
    let _error_guard = error_span.enter();

    match classify_stream_error(error_string) {
        StreamErrorKind::Unauthorized => {
            error!("Watch authentication failed (401 Unauthorized), RBAC may have been revoked or the token expired");
            error!("Check the ClusterRole and ClusterRoleBinding of the controller ServiceAccount");
            tokio::time::sleep(restart_delay).await;
        }
        StreamErrorKind::Expired => {
            warn!("Watch resource version expired (410), watch will restart");
        }
        StreamErrorKind::Throttled => {
            warn!(
                "API server storage reinitializing (429), backing off for {}s",
                restart_delay.as_secs()
            );
            tokio::time::sleep(restart_delay).await;
        }
        StreamErrorKind::NotFound => {
            warn!(
                "Resource not found (404), the object may have been deleted or the CRD is missing: {}",
                error_string
            );
        }
        StreamErrorKind::Other => {
            error!("Controller stream error: {}", error_string);
            tokio::time::sleep(restart_delay).await;
        }
    }
}
