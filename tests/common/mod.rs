//! Common test utilities for the integration tests
//!
//! Provides an in-memory [`ClusterStore`] with failure injection, an
//! [`EventSink`] that records what was published, and object fixtures.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use k8s_openapi::ByteString;
use kube::api::ObjectMeta;
use secret_policy_controller::controller::events::{EventSeverity, EventSink};
use secret_policy_controller::controller::reconciler::Reconciler;
use secret_policy_controller::controller::store::{ClusterStore, StoreError};
use secret_policy_controller::crd::{SecretPolicy, SecretPolicySpec};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

type Key = (String, String);

fn key_of(meta: &ObjectMeta) -> Key {
    (
        meta.namespace.clone().unwrap_or_default(),
        meta.name.clone().unwrap_or_default(),
    )
}

fn display((namespace, name): &Key) -> String {
    format!("{namespace}/{name}")
}

/// Operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Op {
    GetPolicy,
    GetSecret,
    ListPolicies,
    ListSecrets,
    UpdatePolicy,
    UpdatePolicyStatus,
    UpdateSecret,
}

#[derive(Default)]
struct State {
    policies: BTreeMap<Key, SecretPolicy>,
    secrets: BTreeMap<Key, Secret>,
    failing: Vec<Op>,
    calls: BTreeMap<Op, usize>,
    writes: Vec<String>,
    next_version: u64,
}

impl State {
    /// Count the call, then fail it if injected
    fn enter(&mut self, op: Op) -> Result<(), StoreError> {
        *self.calls.entry(op).or_default() += 1;
        if self.failing.contains(&op) {
            Err(StoreError::Unavailable(format!("injected failure for {op:?}")))
        } else {
            Ok(())
        }
    }

    fn bump(&mut self, meta: &mut ObjectMeta) {
        self.next_version += 1;
        meta.resource_version = Some(self.next_version.to_string());
    }

    fn check_version(&self, stored: &ObjectMeta, incoming: &ObjectMeta, kind: &'static str) -> Result<(), StoreError> {
        match &incoming.resource_version {
            Some(version) if Some(version) != stored.resource_version.as_ref() => {
                Err(StoreError::Conflict {
                    kind,
                    key: display(&key_of(incoming)),
                })
            }
            _ => Ok(()),
        }
    }
}

/// In-memory cluster with API-server-like write semantics
///
/// - writes bump `resourceVersion` and reject stale versions with a conflict
/// - `update_policy` keeps the stored status, `update_policy_status` keeps the
///   stored metadata and spec
/// - a terminating policy whose last finalizer is removed is deleted
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_policy(&self, mut policy: SecretPolicy) {
        let mut state = self.state.lock().unwrap();
        state.bump(&mut policy.metadata);
        state.policies.insert(key_of(&policy.metadata), policy);
    }

    pub fn insert_secret(&self, mut secret: Secret) {
        let mut state = self.state.lock().unwrap();
        state.bump(&mut secret.metadata);
        state.secrets.insert(key_of(&secret.metadata), secret);
    }

    pub fn policy(&self, namespace: &str, name: &str) -> Option<SecretPolicy> {
        let state = self.state.lock().unwrap();
        state
            .policies
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    pub fn secret(&self, namespace: &str, name: &str) -> Option<Secret> {
        let state = self.state.lock().unwrap();
        state
            .secrets
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }

    /// Mark a policy for deletion the way the API server does when it has finalizers
    pub fn mark_deleted(&self, namespace: &str, name: &str) {
        let mut state = self.state.lock().unwrap();
        let key = (namespace.to_string(), name.to_string());
        let Some(mut policy) = state.policies.remove(&key) else {
            return;
        };
        if policy.metadata.finalizers.as_ref().is_some_and(|f| !f.is_empty()) {
            policy.metadata.deletion_timestamp = Some(Time(chrono::Utc::now()));
            state.bump(&mut policy.metadata);
            state.policies.insert(key, policy);
        }
    }

    pub fn fail(&self, op: Op) {
        self.state.lock().unwrap().failing.push(op);
    }

    pub fn heal(&self) {
        self.state.lock().unwrap().failing.clear();
    }

    /// Number of times `op` was called, failed calls included
    pub fn calls(&self, op: Op) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .get(&op)
            .copied()
            .unwrap_or_default()
    }

    /// Successful writes in order, as `"<op> <namespace>/<name>"`
    pub fn writes(&self) -> Vec<String> {
        self.state.lock().unwrap().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.state.lock().unwrap().writes.clear();
    }
}

#[async_trait]
impl ClusterStore for MemoryStore {
    async fn get_policy(&self, namespace: &str, name: &str) -> Result<Option<SecretPolicy>, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.enter(Op::GetPolicy)?;
        Ok(state
            .policies
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.enter(Op::GetSecret)?;
        Ok(state
            .secrets
            .get(&(namespace.to_string(), name.to_string()))
            .cloned())
    }

    async fn list_policies(&self) -> Result<Vec<SecretPolicy>, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.enter(Op::ListPolicies)?;
        Ok(state.policies.values().cloned().collect())
    }

    async fn list_secrets(&self) -> Result<Vec<Secret>, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.enter(Op::ListSecrets)?;
        Ok(state.secrets.values().cloned().collect())
    }

    async fn update_policy(&self, policy: &SecretPolicy) -> Result<SecretPolicy, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.enter(Op::UpdatePolicy)?;
        let key = key_of(&policy.metadata);
        let Some(stored) = state.policies.get(&key).cloned() else {
            return Err(StoreError::Unavailable(format!("{} not found", display(&key))));
        };
        state.check_version(&stored.metadata, &policy.metadata, "SecretPolicy")?;

        let mut updated = policy.clone();
        updated.status = stored.status;
        state.bump(&mut updated.metadata);
        state.writes.push(format!("update_policy {}", display(&key)));

        let released = updated.metadata.deletion_timestamp.is_some()
            && updated.metadata.finalizers.as_ref().is_none_or(Vec::is_empty);
        if released {
            state.policies.remove(&key);
        } else {
            state.policies.insert(key, updated.clone());
        }
        Ok(updated)
    }

    async fn update_policy_status(&self, policy: &SecretPolicy) -> Result<SecretPolicy, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.enter(Op::UpdatePolicyStatus)?;
        let key = key_of(&policy.metadata);
        let Some(mut stored) = state.policies.get(&key).cloned() else {
            return Err(StoreError::Unavailable(format!("{} not found", display(&key))));
        };
        state.check_version(&stored.metadata, &policy.metadata, "SecretPolicy")?;

        stored.status.clone_from(&policy.status);
        state.bump(&mut stored.metadata);
        state.writes.push(format!("update_policy_status {}", display(&key)));
        state.policies.insert(key, stored.clone());
        Ok(stored)
    }

    async fn update_secret(&self, secret: &Secret) -> Result<Secret, StoreError> {
        let mut state = self.state.lock().unwrap();
        state.enter(Op::UpdateSecret)?;
        let key = key_of(&secret.metadata);
        let Some(stored) = state.secrets.get(&key).cloned() else {
            return Err(StoreError::Unavailable(format!("{} not found", display(&key))));
        };
        state.check_version(&stored.metadata, &secret.metadata, "Secret")?;

        let mut updated = secret.clone();
        state.bump(&mut updated.metadata);
        state.writes.push(format!("update_secret {}", display(&key)));
        state.secrets.insert(key, updated.clone());
        Ok(updated)
    }
}

/// One published event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedEvent {
    pub policy: String,
    pub severity: EventSeverity,
    pub reason: String,
    pub message: String,
}

/// [`EventSink`] that keeps every event in memory
#[derive(Clone, Default)]
pub struct RecordingEvents {
    events: Arc<Mutex<Vec<RecordedEvent>>>,
}

impl RecordingEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.message).collect()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

#[async_trait]
impl EventSink for RecordingEvents {
    async fn publish(&self, policy: &SecretPolicy, severity: EventSeverity, reason: &str, message: String) {
        self.events.lock().unwrap().push(RecordedEvent {
            policy: display(&key_of(&policy.metadata)),
            severity,
            reason: reason.to_string(),
            message,
        });
    }
}

/// Reconciler wired to fresh in-memory fakes
pub fn harness() -> (Reconciler, MemoryStore, RecordingEvents) {
    let store = MemoryStore::new();
    let events = RecordingEvents::new();
    let reconciler = Reconciler::new(Arc::new(store.clone()), Arc::new(events.clone()));
    (reconciler, store, events)
}

pub fn policy(namespace: &str, name: &str, spec: SecretPolicySpec) -> SecretPolicy {
    let mut policy = SecretPolicy::new(name, spec);
    policy.metadata.namespace = Some(namespace.to_string());
    policy.metadata.generation = Some(1);
    policy
}

/// Spec allowing Opaque Secrets in the given namespaces and nothing else
pub fn opaque_in(namespaces: &[&str]) -> SecretPolicySpec {
    let mut spec = SecretPolicySpec::default();
    spec.allowed_types = vec!["Opaque".to_string()];
    spec.access_rules.allowed_namespaces = namespaces.iter().map(ToString::to_string).collect();
    spec
}

pub fn secret(namespace: &str, name: &str, data: &[(&str, &str)]) -> Secret {
    Secret {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..ObjectMeta::default()
        },
        type_: Some("Opaque".to_string()),
        data: Some(
            data.iter()
                .map(|(k, v)| ((*k).to_string(), ByteString(v.as_bytes().to_vec())))
                .collect(),
        ),
        ..Secret::default()
    }
}

pub fn with_annotation(mut secret: Secret, key: &str, value: &str) -> Secret {
    secret
        .metadata
        .annotations
        .get_or_insert_with(BTreeMap::new)
        .insert(key.to_string(), value.to_string());
    secret
}
