//! # Types
//!
//! Core types for the reconciler.

use crate::config::ControllerConfig;
use crate::controller::backoff::FibonacciBackoff;
use crate::controller::events::EventSink;
use crate::controller::store::{ClusterStore, StoreError};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("failed to list {kind}: {source}")]
    List {
        kind: &'static str,
        #[source]
        source: StoreError,
    },
    #[error("failed to read {kind} {key}: {source}")]
    Get {
        kind: &'static str,
        key: String,
        #[source]
        source: StoreError,
    },
    #[error("failed to update finalizers on SecretPolicy {key}: {source}")]
    Finalizer {
        key: String,
        #[source]
        source: StoreError,
    },
    #[error("cleanup of SecretPolicy {key} failed on Secret {secret}: {source}")]
    Cleanup {
        key: String,
        secret: String,
        #[source]
        source: StoreError,
    },
}

impl ReconcilerError {
    /// Store error behind this failure
    #[must_use]
    pub fn store_error(&self) -> &StoreError {
        match self {
            ReconcilerError::List { source, .. }
            | ReconcilerError::Get { source, .. }
            | ReconcilerError::Finalizer { source, .. }
            | ReconcilerError::Cleanup { source, .. } => source,
        }
    }

    /// Whether the trigger should be retried
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.store_error().is_retryable()
    }
}

/// Kind of object a trigger names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerKind {
    /// Policy-scoped pass: scan every Secret against one policy
    Policy,
    /// Secret-scoped pass: scan one Secret against every policy
    Secret,
}

impl TriggerKind {
    /// Get human-readable string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerKind::Policy => "secretpolicy",
            TriggerKind::Secret => "secret",
        }
    }
}

/// A notification that an object changed, identified by kind and key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Trigger {
    pub kind: TriggerKind,
    pub namespace: String,
    pub name: String,
}

impl Trigger {
    #[must_use]
    pub fn policy(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: TriggerKind::Policy,
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    #[must_use]
    pub fn secret(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: TriggerKind::Secret,
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Backoff key, unique across both kinds
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}:{}/{}", self.kind.as_str(), self.namespace, self.name)
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.kind.as_str(), self.namespace, self.name)
    }
}

/// Backoff state for a specific trigger key
/// Tracks error count and backoff calculator for progressive retries
#[derive(Debug, Clone)]
pub struct BackoffState {
    pub backoff: FibonacciBackoff,
    pub error_count: u32,
}

impl BackoffState {
    #[must_use]
    pub fn new(min_minutes: u64, max_minutes: u64) -> Self {
        Self {
            backoff: FibonacciBackoff::new(min_minutes, max_minutes),
            error_count: 0,
        }
    }

    pub fn increment_error(&mut self) {
        self.error_count = self.error_count.saturating_add(1);
    }

    pub fn reset(&mut self) {
        self.error_count = 0;
        self.backoff.reset();
    }
}

/// Reconciliation context shared by both controllers
#[derive(Clone)]
pub struct Reconciler {
    pub(crate) store: Arc<dyn ClusterStore>,
    pub(crate) events: Arc<dyn EventSink>,
    /// Backoff state per trigger key, driven from the error policy
    pub backoff_states: Arc<Mutex<HashMap<String, BackoffState>>>,
    pub(crate) backoff_min_minutes: u64,
    pub(crate) backoff_max_minutes: u64,
    /// Retry delay used when the backoff map cannot be read (seconds)
    pub(crate) error_requeue_secs: u64,
}

impl fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("backoff_min_minutes", &self.backoff_min_minutes)
            .field("backoff_max_minutes", &self.backoff_max_minutes)
            .field("error_requeue_secs", &self.error_requeue_secs)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    /// Create a reconciler with the default 1m..10m error backoff
    #[must_use]
    pub fn new(store: Arc<dyn ClusterStore>, events: Arc<dyn EventSink>) -> Self {
        Self {
            store,
            events,
            backoff_states: Arc::new(Mutex::new(HashMap::new())),
            backoff_min_minutes: crate::constants::DEFAULT_BACKOFF_MIN_MINUTES,
            backoff_max_minutes: crate::constants::DEFAULT_BACKOFF_MAX_MINUTES,
            error_requeue_secs: crate::constants::DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS,
        }
    }

    /// Apply backoff settings from the controller configuration
    #[must_use]
    pub fn with_config(mut self, config: &ControllerConfig) -> Self {
        self.backoff_min_minutes = config.backoff_min_minutes;
        self.backoff_max_minutes = config.backoff_max_minutes;
        self.error_requeue_secs = config.reconciliation_error_requeue_secs;
        self
    }

    /// Record a failure for `key` and return the next retry delay in seconds
    /// along with the consecutive error count
    ///
    /// Falls back to the configured error requeue interval if the backoff map
    /// is poisoned.
    pub fn next_backoff(&self, key: &str) -> (u64, u32) {
        match self.backoff_states.lock() {
            Ok(mut states) => {
                let state = states.entry(key.to_string()).or_insert_with(|| {
                    BackoffState::new(self.backoff_min_minutes, self.backoff_max_minutes)
                });
                state.increment_error();
                (state.backoff.next_backoff_seconds(), state.error_count)
            }
            Err(e) => {
                warn!("Failed to lock backoff_states: {}, using default backoff", e);
                (self.error_requeue_secs, 0)
            }
        }
    }

    /// Forget the backoff state for `key` after a successful pass
    pub fn reset_backoff(&self, key: &str) {
        if let Ok(mut states) = self.backoff_states.lock() {
            states.remove(key);
        }
    }
}
