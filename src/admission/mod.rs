//! # Admission
//!
//! Synchronous pre-write check for Secrets.
//!
//! A Secret write is denied when it violates any SecretPolicy in the cluster.
//! Secrets in skipped namespaces (system and operator namespaces, or no
//! namespace at all) are always allowed. Each review performs at most one
//! list call; a failed list is an error for the writer, never a silent allow.

mod validation;
pub mod webhook;

pub use validation::{validate_policy, PolicyValidation};

use crate::controller::store::{ClusterStore, StoreError};
use crate::crd::SecretPolicy;
use crate::observability;
use crate::policy::{evaluate, Violation};
use chrono::{DateTime, Utc};
use k8s_openapi::api::core::v1::Secret;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Allow message for a compliant Secret
pub const ALLOW_VALID: &str = "valid secret";

/// Allow message for a Secret in a skipped namespace
pub const ALLOW_SKIPPED: &str = "skipping validation for system namespace";

/// Outcome of an admission review
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionDecision {
    Allow { message: String },
    Deny { reason: String },
}

impl AdmissionDecision {
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, AdmissionDecision::Allow { .. })
    }

    fn label(&self) -> &'static str {
        match self {
            AdmissionDecision::Allow { .. } => "allowed",
            AdmissionDecision::Deny { .. } => "denied",
        }
    }
}

#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("failed to list SecretPolicies: {0}")]
    ListPolicies(#[source] StoreError),
}

/// Decide on a Secret given every policy in the cluster
///
/// Violations are reported in policy order, then rule order.
#[must_use]
pub fn decide(secret: &Secret, policies: &[SecretPolicy], now: DateTime<Utc>) -> AdmissionDecision {
    let violations: Vec<Violation> = policies
        .iter()
        .flat_map(|policy| evaluate(secret, &policy.spec, now))
        .collect();

    if violations.is_empty() {
        AdmissionDecision::Allow {
            message: ALLOW_VALID.to_string(),
        }
    } else {
        AdmissionDecision::Deny {
            reason: deny_reason(&violations),
        }
    }
}

/// Multi-line denial text listing every violation
#[must_use]
pub fn deny_reason(violations: &[Violation]) -> String {
    let lines: Vec<String> = violations.iter().map(ToString::to_string).collect();
    format!("Secret violates policy:\n - {}", lines.join("\n - "))
}

/// Secret admission backed by a [`ClusterStore`]
#[derive(Clone)]
pub struct SecretAdmission {
    store: Arc<dyn ClusterStore>,
    skip_namespaces: Vec<String>,
}

impl std::fmt::Debug for SecretAdmission {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretAdmission")
            .field("skip_namespaces", &self.skip_namespaces)
            .finish_non_exhaustive()
    }
}

impl SecretAdmission {
    #[must_use]
    pub fn new(store: Arc<dyn ClusterStore>, skip_namespaces: Vec<String>) -> Self {
        Self {
            store,
            skip_namespaces,
        }
    }

    /// Whether Secrets in `namespace` bypass policy evaluation
    #[must_use]
    pub fn is_skipped(&self, namespace: &str) -> bool {
        namespace.is_empty() || self.skip_namespaces.iter().any(|ns| ns == namespace)
    }

    /// Review a candidate Secret
    pub async fn review(&self, secret: &Secret) -> Result<AdmissionDecision, AdmissionError> {
        let namespace = secret.metadata.namespace.as_deref().unwrap_or_default();
        if self.is_skipped(namespace) {
            debug!(namespace, "Skipping admission for system namespace");
            observability::metrics::increment_admission_decisions("skipped");
            return Ok(AdmissionDecision::Allow {
                message: ALLOW_SKIPPED.to_string(),
            });
        }

        let policies = self.store.list_policies().await.map_err(|e| {
            observability::metrics::increment_admission_decisions("errored");
            AdmissionError::ListPolicies(e)
        })?;

        let decision = decide(secret, &policies, Utc::now());
        observability::metrics::increment_admission_decisions(decision.label());
        Ok(decision)
    }
}
