//! # Status
//!
//! Folds the results of one policy-scoped scan into a `SecretPolicyStatus`
//! and persists it.
//!
//! The fold is pure and authoritative: the previous status only contributes
//! condition transition times, everything else is recomputed.

use super::lifecycle::policy_key;
use super::types::Reconciler;
use crate::constants::{READY_CONDITION, REASON_COMPLIANT, REASON_VIOLATIONS_FOUND};
use crate::crd::{ConditionStatus, SecretPolicy, SecretPolicyStatus, SecretViolation};
use crate::observability;
use crate::policy::Violation;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

/// Violations found for one scanned Secret
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResult {
    pub namespace: String,
    pub name: String,
    pub violations: Vec<Violation>,
}

/// Compute the status for a completed scan
///
/// Only Secrets with at least one violation are listed in `secretViolations`;
/// `enforcedSecrets` counts every scanned Secret.
#[must_use]
pub fn aggregate(
    previous: Option<&SecretPolicyStatus>,
    results: &[ScanResult],
    now: DateTime<Utc>,
    generation: Option<i64>,
) -> SecretPolicyStatus {
    let secret_violations: Vec<SecretViolation> = results
        .iter()
        .filter(|r| !r.violations.is_empty())
        .map(|r| SecretViolation {
            name: r.name.clone(),
            namespace: r.namespace.clone(),
            violations: r.violations.iter().map(ToString::to_string).collect(),
        })
        .collect();

    let total: usize = secret_violations.iter().map(|s| s.violations.len()).sum();
    let now = now.to_rfc3339();

    let mut conditions = previous.map(|s| s.conditions.clone()).unwrap_or_default();
    if total == 0 {
        conditions.upsert(
            READY_CONDITION,
            ConditionStatus::True,
            REASON_COMPLIANT,
            format!("All {} secrets comply with the policy", results.len()),
            &now,
        );
    } else {
        conditions.upsert(
            READY_CONDITION,
            ConditionStatus::False,
            REASON_VIOLATIONS_FOUND,
            format!(
                "{total} violations found in {} secrets",
                secret_violations.len()
            ),
            &now,
        );
    }

    SecretPolicyStatus {
        enforced_secrets: saturating_i32(results.len()),
        violations: saturating_i32(total),
        secret_violations,
        last_scan_time: Some(now),
        conditions,
        observed_generation: generation,
    }
}

fn saturating_i32(value: usize) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

impl Reconciler {
    /// Replace the stored status with the snapshot of this scan
    ///
    /// Failures are logged and counted, never returned.
    pub(super) async fn persist_status(&self, policy: &SecretPolicy, status: SecretPolicyStatus) {
        let key = policy_key(policy);
        let mut updated = policy.clone();
        updated.status = Some(status);
        match self.store.update_policy_status(&updated).await {
            Ok(_) => debug!(policy = key.as_str(), "Status updated"),
            Err(e) => {
                warn!(policy = key.as_str(), "Failed to update status: {}", e);
                observability::metrics::increment_status_update_failures();
            }
        }
    }
}
