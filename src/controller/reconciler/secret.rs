//! # Secret-Scoped Pass
//!
//! Triggered by a Secret change. Evaluates the Secret against every policy
//! and publishes one Warning event per violation on the policy concerned.
//! Status belongs to the policy-scoped pass and is never written here.

use super::types::{Reconciler, ReconcilerError};
use super::{policy_sort_key, violation_message};
use crate::constants::EVENT_REASON_VIOLATION;
use crate::controller::events::EventSeverity;
use crate::observability;
use crate::policy::evaluate;
use chrono::Utc;
use std::time::Duration;
use tracing::debug;

impl Reconciler {
    pub(super) async fn reconcile_secret(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<Duration>, ReconcilerError> {
        let secret = self
            .store
            .get_secret(namespace, name)
            .await
            .map_err(|source| ReconcilerError::Get {
                kind: "Secret",
                key: format!("{namespace}/{name}"),
                source,
            })?;
        let Some(secret) = secret else {
            debug!("Secret {}/{} no longer exists", namespace, name);
            return Ok(None);
        };

        let mut policies =
            self.store
                .list_policies()
                .await
                .map_err(|source| ReconcilerError::List {
                    kind: "SecretPolicy",
                    source,
                })?;
        policies.sort_by_cached_key(policy_sort_key);

        let now = Utc::now();
        let mut total = 0usize;
        for policy in &policies {
            let violations = evaluate(&secret, &policy.spec, now);
            total += violations.len();
            for violation in &violations {
                self.events
                    .publish(
                        policy,
                        EventSeverity::Warning,
                        EVENT_REASON_VIOLATION,
                        violation_message(namespace, name, violation),
                    )
                    .await;
            }
        }

        observability::metrics::increment_violations_detected(
            u64::try_from(total).unwrap_or(u64::MAX),
        );
        debug!(
            "Secret {}/{} checked against {} policies: {} violations",
            namespace,
            name,
            policies.len(),
            total
        );
        Ok(None)
    }
}
