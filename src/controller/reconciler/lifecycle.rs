//! # Lifecycle
//!
//! Finalizer protocol for SecretPolicy objects.
//!
//! A policy is `Active` until a deletion timestamp appears, then `Terminating`.
//! The finalizer is attached on the first pass of an active policy, and on
//! termination the cleanup runs before the finalizer is removed, so cleanup
//! happens exactly once before the object disappears.
//!
//! | State                            | Step            |
//! |----------------------------------|-----------------|
//! | `Active { finalized: false }`    | AttachFinalizer |
//! | `Active { finalized: true }`     | Scan            |
//! | `Terminating { finalized: true }`| Cleanup         |
//! | `Terminating { finalized: false }`| AwaitRemoval   |

use super::types::{Reconciler, ReconcilerError};
use crate::constants::{
    EVENT_REASON_FINALIZER_COMPLETE, LAST_ROTATED_ANNOTATION, POLICY_FINALIZER, READY_CONDITION,
    REASON_CLEANED,
};
use crate::controller::events::EventSeverity;
use crate::crd::{ConditionStatus, SecretPolicy, SecretPolicyStatus};
use crate::observability;
use chrono::Utc;
use kube::ResourceExt;
use tracing::{debug, info, warn};

/// Lifecycle state of a SecretPolicy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Active { finalized: bool },
    Terminating { finalized: bool },
}

/// What a policy-scoped pass has to do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStep {
    /// Persist the finalizer, then scan
    AttachFinalizer,
    Scan,
    /// Run cleanup, then remove the finalizer
    Cleanup,
    /// Nothing left to do; the store removes the object
    AwaitRemoval,
}

impl LifecycleState {
    #[must_use]
    pub fn of(policy: &SecretPolicy) -> Self {
        let finalized = has_finalizer(policy);
        if policy.metadata.deletion_timestamp.is_some() {
            LifecycleState::Terminating { finalized }
        } else {
            LifecycleState::Active { finalized }
        }
    }

    #[must_use]
    pub fn next_step(self) -> LifecycleStep {
        match self {
            LifecycleState::Active { finalized: false } => LifecycleStep::AttachFinalizer,
            LifecycleState::Active { finalized: true } => LifecycleStep::Scan,
            LifecycleState::Terminating { finalized: true } => LifecycleStep::Cleanup,
            LifecycleState::Terminating { finalized: false } => LifecycleStep::AwaitRemoval,
        }
    }
}

#[must_use]
pub fn has_finalizer(policy: &SecretPolicy) -> bool {
    policy.finalizers().iter().any(|f| f == POLICY_FINALIZER)
}

/// Status written once cleanup has run
#[must_use]
pub fn cleaned_status(
    previous: Option<&SecretPolicyStatus>,
    generation: Option<i64>,
) -> SecretPolicyStatus {
    let now = Utc::now().to_rfc3339();
    let mut conditions = previous.map(|s| s.conditions.clone()).unwrap_or_default();
    conditions.upsert(
        READY_CONDITION,
        ConditionStatus::True,
        REASON_CLEANED,
        "Policy cleanup completed",
        &now,
    );
    SecretPolicyStatus {
        enforced_secrets: 0,
        violations: 0,
        secret_violations: Vec::new(),
        last_scan_time: Some(now),
        conditions,
        observed_generation: generation,
    }
}

impl Reconciler {
    /// Add the finalizer and persist it, returning the stored object
    pub(super) async fn attach_finalizer(
        &self,
        mut policy: SecretPolicy,
    ) -> Result<SecretPolicy, ReconcilerError> {
        let key = policy_key(&policy);
        policy.finalizers_mut().push(POLICY_FINALIZER.to_string());
        let stored = self
            .store
            .update_policy(&policy)
            .await
            .map_err(|source| ReconcilerError::Finalizer {
                key: key.clone(),
                source,
            })?;
        debug!(policy = key.as_str(), "Attached finalizer");
        Ok(stored)
    }

    /// Undo the controller's effects, then release the finalizer
    ///
    /// A failure to update a Secret aborts before the finalizer is removed, so
    /// the whole cleanup runs again on the next attempt.
    pub(super) async fn cleanup(&self, mut policy: SecretPolicy) -> Result<(), ReconcilerError> {
        let key = policy_key(&policy);
        info!(policy = key.as_str(), "SecretPolicy is being deleted, running cleanup");

        let secrets = self
            .store
            .list_secrets()
            .await
            .map_err(|source| ReconcilerError::List {
                kind: "Secret",
                source,
            })?;

        let mut stripped = 0usize;
        for mut secret in secrets {
            let Some(annotations) = secret.metadata.annotations.as_mut() else {
                continue;
            };
            if annotations.remove(LAST_ROTATED_ANNOTATION).is_none() {
                continue;
            }
            let secret_key = format!(
                "{}/{}",
                secret.metadata.namespace.as_deref().unwrap_or_default(),
                secret.metadata.name.as_deref().unwrap_or_default()
            );
            self.store
                .update_secret(&secret)
                .await
                .map_err(|source| ReconcilerError::Cleanup {
                    key: key.clone(),
                    secret: secret_key,
                    source,
                })?;
            stripped += 1;
        }
        debug!(
            policy = key.as_str(),
            secrets.stripped = stripped,
            "Removed rotation annotations"
        );

        policy.status = Some(cleaned_status(
            policy.status.as_ref(),
            policy.metadata.generation,
        ));
        match self.store.update_policy_status(&policy).await {
            Ok(stored) => {
                // Keep the local status if the store echoes back without one.
                let status = policy.status.take();
                policy = stored;
                if policy.status.is_none() {
                    policy.status = status;
                }
            }
            Err(e) => {
                warn!(policy = key.as_str(), "Failed to reset status during cleanup: {}", e);
                observability::metrics::increment_status_update_failures();
            }
        }

        self.events
            .publish(
                &policy,
                EventSeverity::Normal,
                EVENT_REASON_FINALIZER_COMPLETE,
                format!("Finalizer cleanup completed for SecretPolicy {key}"),
            )
            .await;

        policy.finalizers_mut().retain(|f| f != POLICY_FINALIZER);
        self.store
            .update_policy(&policy)
            .await
            .map_err(|source| ReconcilerError::Finalizer {
                key: key.clone(),
                source,
            })?;
        observability::metrics::remove_policy_violations(&key);

        info!(policy = key.as_str(), "Finalizer removed");
        Ok(())
    }
}

pub(super) fn policy_key(policy: &SecretPolicy) -> String {
    format!(
        "{}/{}",
        policy.namespace().unwrap_or_default(),
        policy.name_any()
    )
}
