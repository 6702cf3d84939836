//! Secret Policy Controller Library
//!
//! Core functionality for the Secret Policy Controller: the `SecretPolicy`
//! CRD, the rule evaluator, the reconciler and the admission webhook.
//! Unit tests live next to the code they exercise, integration tests under `tests/`.
//!
//! ## Quick Start
//!
//! ```rust
//! use secret_policy_controller::prelude::*;
//! ```
//!
//! This brings commonly used types and traits into scope. For more specific imports,
//! use the individual modules.

pub mod admission;
pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod policy;
pub mod prelude;
pub mod runtime;
