//! # Cluster Store
//!
//! Read/write access to SecretPolicy and Secret objects.
//!
//! The reconciler and the admission webhook only talk to the cluster through
//! [`ClusterStore`], which keeps both testable without an API server.
//! [`KubeStore`] is the production implementation on top of `kube::Api`.
//!
//! Writes carry the `resourceVersion` read earlier, so a concurrent change is
//! reported as [`StoreError::Conflict`] instead of being overwritten. Conflicts
//! are not retried here; the controller requeues the trigger.

use crate::constants::CONTROLLER_NAME;
use crate::crd::SecretPolicy;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, ListParams, Patch, PatchParams, PostParams};
use kube::{Client, Resource, ResourceExt};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Optimistic concurrency failure (HTTP 409)
    #[error("conflict writing {kind} {key}: object was modified")]
    Conflict { kind: &'static str, key: String },
    #[error("{kind} {key} has no name")]
    MissingName { kind: &'static str, key: String },
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),
    #[error("failed to encode status patch: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Store is unreachable or refused the request
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Whether a later attempt may succeed without any change to the inputs
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Conflict { .. } | StoreError::Unavailable(_) => true,
            StoreError::Kube(kube::Error::Api(status)) => {
                status.code == 409 || status.code == 429 || status.code >= 500
            }
            StoreError::Kube(_) => true,
            StoreError::MissingName { .. } | StoreError::Serialization(_) => false,
        }
    }
}

/// Access to the objects the controller reads and writes
#[async_trait]
pub trait ClusterStore: Send + Sync {
    /// Get a SecretPolicy, `None` if it does not exist
    async fn get_policy(&self, namespace: &str, name: &str)
        -> Result<Option<SecretPolicy>, StoreError>;

    /// Get a Secret, `None` if it does not exist
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, StoreError>;

    /// List SecretPolicies in all namespaces
    async fn list_policies(&self) -> Result<Vec<SecretPolicy>, StoreError>;

    /// List Secrets in all namespaces
    async fn list_secrets(&self) -> Result<Vec<Secret>, StoreError>;

    /// Persist SecretPolicy metadata (finalizers); spec and status are not written
    async fn update_policy(&self, policy: &SecretPolicy) -> Result<SecretPolicy, StoreError>;

    /// Persist the SecretPolicy status subresource
    async fn update_policy_status(&self, policy: &SecretPolicy)
        -> Result<SecretPolicy, StoreError>;

    /// Persist a Secret (metadata changes only; the controller never edits data or type)
    async fn update_secret(&self, secret: &Secret) -> Result<Secret, StoreError>;
}

/// [`ClusterStore`] backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl std::fmt::Debug for KubeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore").finish_non_exhaustive()
    }
}

impl KubeStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn policies(&self, namespace: &str) -> Api<SecretPolicy> {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn secrets(&self, namespace: &str) -> Api<Secret> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn object_key<K: ResourceExt>(obj: &K) -> String {
    format!(
        "{}/{}",
        obj.namespace().unwrap_or_default(),
        obj.meta().name.as_deref().unwrap_or("<unnamed>")
    )
}

/// Map an API error, classifying 409 as a conflict
fn classify(err: kube::Error, kind: &'static str, key: String) -> StoreError {
    match err {
        kube::Error::Api(status) if status.code == 409 => StoreError::Conflict { kind, key },
        other => StoreError::Kube(other),
    }
}

#[async_trait]
impl ClusterStore for KubeStore {
    async fn get_policy(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Option<SecretPolicy>, StoreError> {
        Ok(self.policies(namespace).get_opt(name).await?)
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Option<Secret>, StoreError> {
        Ok(self.secrets(namespace).get_opt(name).await?)
    }

    async fn list_policies(&self) -> Result<Vec<SecretPolicy>, StoreError> {
        let api: Api<SecretPolicy> = Api::all(self.client.clone());
        Ok(api.list(&ListParams::default()).await?.items)
    }

    async fn list_secrets(&self) -> Result<Vec<Secret>, StoreError> {
        let api: Api<Secret> = Api::all(self.client.clone());
        Ok(api.list(&ListParams::default()).await?.items)
    }

    async fn update_policy(&self, policy: &SecretPolicy) -> Result<SecretPolicy, StoreError> {
        let key = object_key(policy);
        let name = policy.meta().name.as_deref().ok_or_else(|| StoreError::MissingName {
            kind: "SecretPolicy",
            key: key.clone(),
        })?;
        let api = self.policies(&policy.namespace().unwrap_or_default());
        api.replace(name, &PostParams::default(), policy)
            .await
            .map_err(|e| classify(e, "SecretPolicy", key))
    }

    async fn update_policy_status(
        &self,
        policy: &SecretPolicy,
    ) -> Result<SecretPolicy, StoreError> {
        let key = object_key(policy);
        let name = policy.meta().name.as_deref().ok_or_else(|| StoreError::MissingName {
            kind: "SecretPolicy",
            key: key.clone(),
        })?;
        let api = self.policies(&policy.namespace().unwrap_or_default());

        // Merge patch replaces lists wholesale, so the status is fully overwritten.
        let patch = serde_json::json!({
            "metadata": { "resourceVersion": policy.resource_version() },
            "status": serde_json::to_value(&policy.status)?,
        });
        api.patch_status(name, &PatchParams::apply(CONTROLLER_NAME), &Patch::Merge(patch))
            .await
            .map_err(|e| classify(e, "SecretPolicy", key))
    }

    async fn update_secret(&self, secret: &Secret) -> Result<Secret, StoreError> {
        let key = object_key(secret);
        let name = secret.metadata.name.as_deref().ok_or_else(|| StoreError::MissingName {
            kind: "Secret",
            key: key.clone(),
        })?;
        let api = self.secrets(&secret.namespace().unwrap_or_default());
        api.replace(name, &PostParams::default(), secret)
            .await
            .map_err(|e| classify(e, "Secret", key))
    }
}
