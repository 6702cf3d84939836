//! # Policy-Scoped Pass
//!
//! Triggered by a SecretPolicy change. Drives the finalizer lifecycle, then
//! scans every Secret in the cluster against the policy, publishes one
//! Warning event per violation and writes the aggregated status.

use super::lifecycle::{policy_key, LifecycleState, LifecycleStep};
use super::status::{aggregate, ScanResult};
use super::types::{Reconciler, ReconcilerError};
use super::{secret_ref, violation_message};
use crate::constants::EVENT_REASON_VIOLATION;
use crate::controller::events::EventSeverity;
use crate::crd::SecretPolicy;
use crate::observability;
use crate::policy::evaluate;
use chrono::Utc;
use std::time::Duration;
use tracing::{debug, info};

impl Reconciler {
    pub(super) async fn reconcile_policy(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Duration>, ReconcilerError> {
        let policy = self
            .store
            .get_policy(namespace, name)
            .await
            .map_err(|source| ReconcilerError::Get {
                kind: "SecretPolicy",
                key: format!("{namespace}/{name}"),
                source,
            })?;
        let Some(policy) = policy else {
            debug!("SecretPolicy {}/{} no longer exists", namespace, name);
            return Ok(None);
        };

        let policy = match LifecycleState::of(&policy).next_step() {
            LifecycleStep::AwaitRemoval => {
                debug!("SecretPolicy {}/{} is terminating without finalizer", namespace, name);
                return Ok(None);
            }
            LifecycleStep::Cleanup => {
                self.cleanup(policy).await?;
                return Ok(None);
            }
            LifecycleStep::AttachFinalizer => self.attach_finalizer(policy).await?,
            LifecycleStep::Scan => policy,
        };

        self.scan_policy(&policy).await
    }

    /// Evaluate every Secret against `policy` and persist the outcome
    ///
    /// Returns the rotation re-check delay when rotation is enabled.
    async fn scan_policy(
        &self,
        policy: &SecretPolicy,
    ) -> Result<Option<Duration>, ReconcilerError> {
        let key = policy_key(policy);
        let mut secrets =
            self.store
                .list_secrets()
                .await
                .map_err(|source| ReconcilerError::List {
                    kind: "Secret",
                    source,
                })?;
        secrets.sort_by_cached_key(secret_ref);

        let now = Utc::now();
        let mut results = Vec::with_capacity(secrets.len());
        for secret in &secrets {
            let (secret_namespace, secret_name) = secret_ref(secret);
            let violations = evaluate(secret, &policy.spec, now);
            for violation in &violations {
                self.events
                    .publish(
                        policy,
                        EventSeverity::Warning,
                        EVENT_REASON_VIOLATION,
                        violation_message(&secret_namespace, &secret_name, violation),
                    )
                    .await;
            }
            results.push(ScanResult {
                namespace: secret_namespace,
                name: secret_name,
                violations,
            });
        }

        let status = aggregate(
            policy.status.as_ref(),
            &results,
            now,
            policy.metadata.generation,
        );
        let detected: usize = results.iter().map(|r| r.violations.len()).sum();
        observability::metrics::increment_violations_detected(
            u64::try_from(detected).unwrap_or(u64::MAX),
        );
        observability::metrics::set_policy_violations(&key, status.violations);
        info!(
            policy = key.as_str(),
            secrets.scanned = status.enforced_secrets,
            violations = status.violations,
            "Scan complete"
        );

        self.persist_status(policy, status).await;

        let requeue = policy.spec.rotation_requeue();
        if let Some(delay) = requeue {
            debug!(
                policy = key.as_str(),
                "Next rotation check in {}s",
                delay.as_secs()
            );
        }
        Ok(requeue)
    }
}
