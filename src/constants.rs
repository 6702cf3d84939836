//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Annotation that must equal `"true"` when a policy requires external KMS
pub const KMS_ENCRYPTED_ANNOTATION: &str = "kms-encrypted";

/// Annotation holding the RFC3339 time of the last rotation
pub const LAST_ROTATED_ANNOTATION: &str = "lastRotated";

/// Type the API server assigns to a Secret created without one
pub const DEFAULT_SECRET_TYPE: &str = "Opaque";

/// Finalizer that blocks SecretPolicy deletion until cleanup has run
pub const POLICY_FINALIZER: &str = "compliance.security.local/finalizer";

/// Field manager and event reporter name
pub const CONTROLLER_NAME: &str = "secretpolicy-controller";

/// Condition type reported on every SecretPolicy
pub const READY_CONDITION: &str = "Ready";

/// Ready=True reason after a scan without violations
pub const REASON_COMPLIANT: &str = "Compliant";

/// Ready=False reason after a scan with violations
pub const REASON_VIOLATIONS_FOUND: &str = "ViolationsFound";

/// Ready=True reason after finalizer cleanup
pub const REASON_CLEANED: &str = "Cleaned";

/// Event reason for each violation found
pub const EVENT_REASON_VIOLATION: &str = "SecretPolicyViolation";

/// Event reason emitted when finalizer cleanup completes
pub const EVENT_REASON_FINALIZER_COMPLETE: &str = "PolicyFinalizerComplete";

/// Admission path for Secret writes
pub const SECRET_WEBHOOK_PATH: &str = "/validate-v1-secret";

/// Admission path for SecretPolicy writes
pub const POLICY_WEBHOOK_PATH: &str = "/validate-compliance-security-local-v1alpha1-secretpolicy";

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 8080;

/// Default HTTPS port the admission webhook service targets
pub const DEFAULT_WEBHOOK_PORT: u16 = 9443;

/// Default namespace the operator runs in
pub const DEFAULT_CONTROLLER_NAMESPACE: &str = "secret-policy-operator-system";

/// Namespaces the admission webhook never evaluates (besides the controller namespace)
pub const DEFAULT_ADMISSION_SKIP_NAMESPACES: &str = "kube-system,cert-manager";

/// Default requeue interval for reconciliation errors (seconds)
pub const DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS: u64 = 60;

/// Default Fibonacci backoff bounds for reconciliation errors (minutes)
pub const DEFAULT_BACKOFF_MIN_MINUTES: u64 = 1;
pub const DEFAULT_BACKOFF_MAX_MINUTES: u64 = 10;

/// Default delay before restarting a watch stream after it ends (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_SECS: u64 = 5;

/// Default maximum number of concurrent reconciliations per controller
pub const DEFAULT_MAX_CONCURRENT_RECONCILIATIONS: u16 = 10;
