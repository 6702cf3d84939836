//! # Reconciler
//!
//! Reconciliation engine for SecretPolicy compliance.
//!
//! Each trigger names either a SecretPolicy or a Secret:
//!
//! - **Policy-scoped**: finalizer lifecycle, then a scan of every Secret
//!   against the policy, events per violation and a status write. Requeues
//!   after `rotation.intervalDays` when rotation is enabled.
//! - **Secret-scoped**: the Secret against every policy, events only.
//!
//! A trigger naming an object that no longer exists is a no-op. Store write
//! conflicts are returned to the caller rather than retried here.

mod lifecycle;
mod policy;
mod secret;
mod status;
mod types;

pub use lifecycle::{cleaned_status, has_finalizer, LifecycleState, LifecycleStep};
pub use status::{aggregate, ScanResult};
pub use types::{BackoffState, Reconciler, ReconcilerError, Trigger, TriggerKind};

use crate::crd::SecretPolicy;
use crate::observability;
use crate::policy::Violation;
use k8s_openapi::api::core::v1::Secret;
use std::time::{Duration, Instant};
use tracing::{error, Instrument};

impl Reconciler {
    /// Run one reconciliation pass for `trigger`
    ///
    /// Returns the delay after which the same trigger should run again, if any.
    pub async fn reconcile(&self, trigger: &Trigger) -> Result<Option<Duration>, ReconcilerError> {
        let span = tracing::info_span!(
            "reconcile",
            trigger.kind = trigger.kind.as_str(),
            resource.namespace = trigger.namespace.as_str(),
            resource.name = trigger.name.as_str(),
        );

        async {
            observability::metrics::increment_reconciliations(trigger.kind.as_str());
            let start = Instant::now();

            let result = match trigger.kind {
                TriggerKind::Policy => {
                    self.reconcile_policy(&trigger.namespace, &trigger.name)
                        .await
                }
                TriggerKind::Secret => {
                    self.reconcile_secret(&trigger.namespace, &trigger.name)
                        .await
                }
            };

            observability::metrics::observe_reconciliation_duration(
                start.elapsed().as_secs_f64(),
            );
            match &result {
                Ok(_) => self.reset_backoff(&trigger.key()),
                Err(e) => error!("Reconciliation of {} failed: {}", trigger, e),
            }
            result
        }
        .instrument(span)
        .await
    }
}

/// Event message for one violation found on one Secret
#[must_use]
pub fn violation_message(namespace: &str, name: &str, violation: &Violation) -> String {
    format!("Secret {namespace}/{name}: {violation}")
}

/// `(namespace, name)` of a Secret, empty strings when unset
fn secret_ref(secret: &Secret) -> (String, String) {
    (
        secret.metadata.namespace.clone().unwrap_or_default(),
        secret.metadata.name.clone().unwrap_or_default(),
    )
}

fn policy_sort_key(policy: &SecretPolicy) -> (String, String) {
    (
        policy.metadata.namespace.clone().unwrap_or_default(),
        policy.metadata.name.clone().unwrap_or_default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_message_format() {
        assert_eq!(
            violation_message(
                "dev",
                "db-creds",
                &Violation::NamespaceNotAllowed {
                    namespace: "dev".to_string()
                }
            ),
            "Secret dev/db-creds: namespace dev is not allowed"
        );
    }
}
