//! # SecretPolicy Spec
//!
//! Main CRD specification types.

use serde::{Deserialize, Serialize};

/// SecretPolicy Custom Resource Definition
///
/// Declares the compliance rules every Secret in the cluster is checked against.
///
/// # Example
///
/// ```yaml
/// apiVersion: compliance.security.local/v1alpha1
/// kind: SecretPolicy
/// metadata:
///   name: production-secrets
///   namespace: security
/// spec:
///   allowedTypes: ["Opaque", "kubernetes.io/tls"]
///   disallowedKeys: ["password"]
///   encryption:
///     enforceBase64: true
///     base64Mode: strict
///     externalKMS: true
///   accessRules:
///     allowedNamespaces: ["prod"]
///   rotation:
///     enabled: true
///     intervalDays: 30
/// ```
#[derive(
    kube::CustomResource, Debug, Clone, Default, Deserialize, Serialize, PartialEq, schemars::JsonSchema,
)]
#[kube(
    kind = "SecretPolicy",
    group = "compliance.security.local",
    version = "v1alpha1",
    namespaced,
    status = "crate::crd::SecretPolicyStatus",
    shortname = "sp",
    printcolumn = r#"{"name":"Violations", "type":"integer", "jsonPath":".status.violations"}"#,
    printcolumn = r#"{"name":"Ready", "type":"string", "jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct SecretPolicySpec {
    /// Secret types a compliant Secret may have (e.g. "Opaque", "kubernetes.io/tls")
    /// An empty list allows no type at all
    #[serde(default)]
    pub allowed_types: Vec<String>,
    /// Data keys that must not appear in any Secret
    #[serde(default)]
    pub disallowed_keys: Vec<String>,
    /// Encoding and encryption requirements
    #[serde(default)]
    pub encryption: EncryptionRules,
    /// Namespace restrictions
    #[serde(default)]
    pub access_rules: AccessRules,
    /// Rotation requirements
    #[serde(default)]
    pub rotation: RotationRules,
}

/// Encoding and encryption requirements
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EncryptionRules {
    /// Check every data value with the configured base64 mode
    #[serde(default)]
    pub enforce_base64: bool,
    /// "relaxed" (default) or "strict"
    /// Unknown values behave as "relaxed"
    #[serde(default)]
    pub base64_mode: Option<String>,
    /// Require the `kms-encrypted: "true"` annotation
    #[serde(default, rename = "externalKMS")]
    pub external_kms: bool,
}

/// Namespace restrictions
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccessRules {
    /// Namespaces a compliant Secret may live in
    #[serde(default)]
    pub allowed_namespaces: Vec<String>,
}

/// Rotation requirements
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct RotationRules {
    /// Require a fresh `lastRotated` annotation
    #[serde(default)]
    pub enabled: bool,
    /// Maximum age of `lastRotated`, in days
    #[serde(default)]
    pub interval_days: i32,
}

impl SecretPolicySpec {
    /// Interval after which the policy should be re-scanned for rotation staleness
    ///
    /// `None` when rotation is disabled or the interval is not positive.
    #[must_use]
    pub fn rotation_requeue(&self) -> Option<std::time::Duration> {
        if !self.rotation.enabled || self.rotation.interval_days <= 0 {
            return None;
        }
        let days = u64::from(self.rotation.interval_days.unsigned_abs());
        Some(std::time::Duration::from_secs(days * 24 * 60 * 60))
    }
}
