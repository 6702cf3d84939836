//! # Custom Resource Definitions
//!
//! CRD types for the Secret Policy Controller.
//!
//! ## Module Structure
//!
//! - `spec.rs` - `SecretPolicy` specification and its rule groups
//! - `status.rs` - Status types written by the reconciler
//! - `conditions.rs` - Condition map with upsert semantics

mod conditions;
mod spec;
mod status;

pub use conditions::{Condition, ConditionState, ConditionStatus, Conditions};
pub use spec::{
    AccessRules, EncryptionRules, RotationRules, SecretPolicy, SecretPolicySpec,
};
pub use status::{SecretPolicyStatus, SecretViolation};
