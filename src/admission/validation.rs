//! # SecretPolicy Validation
//!
//! Checks applied to SecretPolicy objects on create and update.

use crate::crd::SecretPolicySpec;
use crate::policy::Base64Mode;

/// Result of validating a SecretPolicy spec
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyValidation {
    /// Reasons the write must be rejected
    pub errors: Vec<String>,
    /// Accepted, but probably not what the author meant
    pub warnings: Vec<String>,
}

impl PolicyValidation {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

#[must_use]
pub fn validate_policy(spec: &SecretPolicySpec) -> PolicyValidation {
    let mut result = PolicyValidation::default();

    if spec.rotation.enabled && spec.rotation.interval_days <= 0 {
        result.errors.push(format!(
            "spec.rotation.intervalDays must be positive when rotation is enabled, got {}",
            spec.rotation.interval_days
        ));
    }

    let mode = spec.encryption.base64_mode.as_deref();
    if !Base64Mode::is_recognised(mode) {
        result.warnings.push(format!(
            "spec.encryption.base64Mode {:?} is not recognised, relaxed mode will be used",
            mode.unwrap_or_default()
        ));
    }

    if spec.allowed_types.is_empty() {
        result
            .warnings
            .push("spec.allowedTypes is empty, every Secret will violate this policy".to_string());
    }
    if spec.access_rules.allowed_namespaces.is_empty() {
        result.warnings.push(
            "spec.accessRules.allowedNamespaces is empty, every Secret will violate this policy"
                .to_string(),
        );
    }

    result
}
