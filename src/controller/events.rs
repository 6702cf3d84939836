//! # Events
//!
//! Kubernetes events attached to SecretPolicy objects.
//!
//! One Warning event is published per violation found, and one Normal event
//! when finalizer cleanup completes. A failure to publish is logged and never
//! fails the reconciliation.

use crate::constants::CONTROLLER_NAME;
use crate::crd::SecretPolicy;
use async_trait::async_trait;
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::{Client, Resource};
use tracing::warn;

/// Event class as shown by `kubectl get events`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSeverity {
    Normal,
    Warning,
}

impl EventSeverity {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EventSeverity::Normal => "Normal",
            EventSeverity::Warning => "Warning",
        }
    }
}

impl From<EventSeverity> for EventType {
    fn from(severity: EventSeverity) -> Self {
        match severity {
            EventSeverity::Normal => EventType::Normal,
            EventSeverity::Warning => EventType::Warning,
        }
    }
}

/// Destination for policy events
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Publish one event against `policy`; errors are handled by the sink
    async fn publish(
        &self,
        policy: &SecretPolicy,
        severity: EventSeverity,
        reason: &str,
        message: String,
    );
}

/// [`EventSink`] backed by the `events.k8s.io` API
#[derive(Clone)]
pub struct KubeEventSink {
    recorder: Recorder,
}

impl std::fmt::Debug for KubeEventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeEventSink").finish_non_exhaustive()
    }
}

impl KubeEventSink {
    /// Create a sink reporting as `secretpolicy-controller`
    ///
    /// The pod name (`POD_NAME`) is used as the reporting instance when set.
    #[must_use]
    pub fn new(client: Client) -> Self {
        let reporter = Reporter {
            controller: CONTROLLER_NAME.to_string(),
            instance: std::env::var("POD_NAME").ok(),
        };
        Self {
            recorder: Recorder::new(client, reporter),
        }
    }
}

/// Action recorded on the event for a given reason
fn action_for(reason: &str) -> String {
    match reason {
        crate::constants::EVENT_REASON_FINALIZER_COMPLETE => "Cleanup".to_string(),
        _ => "Scan".to_string(),
    }
}

#[async_trait]
impl EventSink for KubeEventSink {
    async fn publish(
        &self,
        policy: &SecretPolicy,
        severity: EventSeverity,
        reason: &str,
        message: String,
    ) {
        let reference = policy.object_ref(&());
        let event = Event {
            type_: severity.into(),
            reason: reason.to_string(),
            note: Some(message),
            action: action_for(reason),
            secondary: None,
        };
        if let Err(e) = self.recorder.publish(&event, &reference).await {
            warn!(
                policy.name = reference.name.as_deref().unwrap_or_default(),
                policy.namespace = reference.namespace.as_deref().unwrap_or_default(),
                event.reason = reason,
                "Failed to publish event: {}",
                e
            );
        }
    }
}
