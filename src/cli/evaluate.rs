//! # Evaluate Command
//!
//! Checks a Secret manifest against the SecretPolicies in the cluster without
//! creating it. Uses the same evaluator and message format as the admission
//! webhook, so a passing run means the webhook would admit the Secret.

use anyhow::{Context, Result};
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use kube::{api::Api, Client, ResourceExt};
use secret_policy_controller::admission::deny_reason;
use secret_policy_controller::crd::SecretPolicy;
use secret_policy_controller::policy::evaluate;
use std::path::PathBuf;

/// Evaluate a Secret manifest against every SecretPolicy
pub async fn evaluate_command(
    client: Client,
    file: PathBuf,
    namespace: Option<String>,
) -> Result<()> {
    let raw = std::fs::read_to_string(&file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let mut secret: Secret = serde_yaml::from_str(&raw)
        .with_context(|| format!("Failed to parse {} as a Secret manifest", file.display()))?;

    if secret.metadata.namespace.is_none() {
        secret.metadata.namespace = Some(namespace.unwrap_or_else(|| "default".to_string()));
    }
    merge_string_data(&mut secret);

    let api: Api<SecretPolicy> = Api::all(client);
    let mut policies = api
        .list(&kube::api::ListParams::default())
        .await
        .context("Failed to list SecretPolicy resources")?
        .items;
    policies.sort_by_key(|p| (p.namespace().unwrap_or_default(), p.name_any()));

    let target = format!(
        "{}/{}",
        secret.namespace().unwrap_or_default(),
        secret.name_any()
    );
    println!("Evaluating Secret '{target}' against {} policies", policies.len());
    println!();

    let now = chrono::Utc::now();
    let mut all = Vec::new();
    for policy in &policies {
        let violations = evaluate(&secret, &policy.spec, now);
        let policy_ref = format!("{}/{}", policy.namespace().unwrap_or_default(), policy.name_any());
        if violations.is_empty() {
            println!("  PASS  {policy_ref}");
        } else {
            println!("  FAIL  {policy_ref}");
            for violation in &violations {
                println!("          - {violation}");
            }
        }
        all.extend(violations);
    }

    println!();
    if all.is_empty() {
        println!("Secret '{target}' complies with all policies");
        return Ok(());
    }

    println!("{}", deny_reason(&all));
    anyhow::bail!("{} violations found for Secret '{target}'", all.len())
}

/// Fold `stringData` into `data` the way the API server does on write
fn merge_string_data(secret: &mut Secret) {
    if let Some(string_data) = secret.string_data.take() {
        let data = secret.data.get_or_insert_with(Default::default);
        for (key, value) in string_data {
            data.insert(key, ByteString(value.into_bytes()));
        }
    }
}
