//! # Policy Evaluation
//!
//! Pure decision function mapping a Secret and a `SecretPolicy` spec to the list
//! of rule violations. Shared by the reconciler and the admission webhook.
//!
//! Rules run in a fixed order, and rules that look at data keys iterate in key
//! order (`BTreeMap`), so the output is deterministic for identical inputs:
//!
//! 1. allowed types
//! 2. disallowed keys (one per offending key)
//! 3. base64 enforcement (one per offending key)
//! 4. external KMS annotation
//! 5. allowed namespaces
//! 6. rotation staleness

mod encoding;
mod rotation;

pub use encoding::Base64Mode;
pub use rotation::rotation_expired;

use crate::constants::{DEFAULT_SECRET_TYPE, KMS_ENCRYPTED_ANNOTATION};
use crate::crd::SecretPolicySpec;
use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::Secret;
use std::fmt;

/// A single rule failure for one Secret against one policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    TypeNotAllowed { secret_type: String },
    DisallowedKey { key: String },
    InvalidBase64 { key: String },
    MissingKmsEncryption,
    NamespaceNotAllowed { namespace: String },
    RotationExpired,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::TypeNotAllowed { secret_type } => {
                write!(f, "secret type {secret_type} not allowed")
            }
            Violation::DisallowedKey { key } => write!(f, "key {key} is disallowed"),
            Violation::InvalidBase64 { key } => write!(f, "key {key} is not valid base64"),
            Violation::MissingKmsEncryption => {
                f.write_str("secret is not encrypted via external KMS")
            }
            Violation::NamespaceNotAllowed { namespace } => {
                write!(f, "namespace {namespace} is not allowed")
            }
            Violation::RotationExpired => f.write_str("secret rotation interval exceeded"),
        }
    }
}

/// Evaluate a Secret against a policy spec
#[must_use]
pub fn evaluate(secret: &Secret, spec: &SecretPolicySpec, now: DateTime<Utc>) -> Vec<Violation> {
    let mut violations = Vec::new();
    let annotations = secret.metadata.annotations.as_ref();

    let secret_type = secret.type_.as_deref().unwrap_or(DEFAULT_SECRET_TYPE);
    if !spec.allowed_types.iter().any(|t| t == secret_type) {
        violations.push(Violation::TypeNotAllowed {
            secret_type: secret_type.to_string(),
        });
    }

    if let Some(data) = &secret.data {
        for key in data.keys() {
            if spec.disallowed_keys.contains(key) {
                violations.push(Violation::DisallowedKey { key: key.clone() });
            }
        }

        if spec.encryption.enforce_base64 {
            let mode = Base64Mode::from_spec(spec.encryption.base64_mode.as_deref());
            for (key, value) in data {
                if !mode.is_valid(&value.0) {
                    violations.push(Violation::InvalidBase64 { key: key.clone() });
                }
            }
        }
    }

    if spec.encryption.external_kms
        && annotations
            .and_then(|a| a.get(KMS_ENCRYPTED_ANNOTATION))
            .map(String::as_str)
            != Some("true")
    {
        violations.push(Violation::MissingKmsEncryption);
    }

    let namespace = secret.metadata.namespace.as_deref().unwrap_or_default();
    if !spec.access_rules.allowed_namespaces.iter().any(|n| n == namespace) {
        violations.push(Violation::NamespaceNotAllowed {
            namespace: namespace.to_string(),
        });
    }

    if spec.rotation.enabled && rotation_expired(annotations, spec.rotation.interval_days, now) {
        violations.push(Violation::RotationExpired);
    }

    violations
}
