//! # Prelude
//!
//! Re-exports commonly used types and traits for convenience.
//!
//! ## Usage
//!
//! ```rust
//! use secret_policy_controller::prelude::*;
//! ```
//!
//! This brings into scope:
//! - All CRD types (SecretPolicy, SecretPolicyStatus, etc.)
//! - The rule evaluator and its `Violation` type
//! - Reconciler types and the store/event seams it runs against
//! - Admission types
//! - Config types

// CRD types - most commonly used
pub use crate::crd::*;

// Rule evaluation
pub use crate::policy::{evaluate, Base64Mode, Violation};

// Reconciler types - core controller functionality
pub use crate::controller::events::{EventSeverity, EventSink, KubeEventSink};
pub use crate::controller::reconciler::{
    BackoffState, Reconciler, ReconcilerError, Trigger, TriggerKind,
};
pub use crate::controller::store::{ClusterStore, KubeStore, StoreError};

// Admission
pub use crate::admission::{
    validate_policy, AdmissionDecision, AdmissionError, PolicyValidation, SecretAdmission,
};

// Config types
pub use crate::config::{ControllerConfig, LogFormat};
