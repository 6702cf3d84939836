//! # SecretPolicy Status
//!
//! Status types written by the policy-scoped reconciliation pass.

use crate::crd::{Condition, Conditions};
use serde::{Deserialize, Serialize};

/// Status of the SecretPolicy resource
///
/// Every policy-scoped scan replaces the whole status.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretPolicyStatus {
    /// Number of Secrets scanned in the last pass
    #[serde(default)]
    pub enforced_secrets: i32,
    /// Total number of violations found in the last pass
    /// Always equals the sum of `secretViolations[*].violations` lengths
    #[serde(default)]
    pub violations: i32,
    /// Non-compliant Secrets and their violation messages, ordered by namespace then name
    #[serde(default)]
    pub secret_violations: Vec<SecretViolation>,
    /// Time of the last scan (RFC3339)
    #[serde(default)]
    pub last_scan_time: Option<String>,
    /// Conditions represent the latest available observations
    #[serde(default)]
    #[schemars(with = "Vec<Condition>")]
    pub conditions: Conditions,
    /// Observed generation
    #[serde(default)]
    pub observed_generation: Option<i64>,
}

/// Violations found for one Secret
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretViolation {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub violations: Vec<String>,
}
