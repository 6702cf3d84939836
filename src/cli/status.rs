//! # Status Command
//!
//! Command to show detailed status of a SecretPolicy resource.

use anyhow::{Context, Result};
use kube::{api::Api, Client};
use secret_policy_controller::crd::SecretPolicy;

/// Show detailed status of a SecretPolicy resource
pub async fn status_command(client: Client, name: String, namespace: Option<String>) -> Result<()> {
    let ns = namespace.as_deref().unwrap_or("default");

    println!("Status for SecretPolicy '{ns}/{name}'");
    println!();

    let api: Api<SecretPolicy> = Api::namespaced(client, ns);
    let policy = api
        .get(&name)
        .await
        .with_context(|| format!("Failed to get SecretPolicy '{ns}/{name}'"))?;

    println!("Resource Information:");
    println!(
        "  Name: {}",
        policy.metadata.name.as_deref().unwrap_or("<unknown>")
    );
    println!(
        "  Namespace: {}",
        policy.metadata.namespace.as_deref().unwrap_or("<unknown>")
    );
    if let Some(generation) = policy.metadata.generation {
        println!("  Generation: {generation}");
    }
    if policy.metadata.deletion_timestamp.is_some() {
        println!("  Terminating: true");
    }

    let spec = &policy.spec;
    println!();
    println!("Rules:");
    println!("  Allowed Types: {}", list_or_none(&spec.allowed_types));
    println!("  Disallowed Keys: {}", list_or_none(&spec.disallowed_keys));
    println!(
        "  Allowed Namespaces: {}",
        list_or_none(&spec.access_rules.allowed_namespaces)
    );
    println!(
        "  Enforce Base64: {} (mode: {})",
        spec.encryption.enforce_base64,
        spec.encryption.base64_mode.as_deref().unwrap_or("relaxed")
    );
    println!("  External KMS: {}", spec.encryption.external_kms);
    if spec.rotation.enabled {
        println!("  Rotation: every {} days", spec.rotation.interval_days);
    } else {
        println!("  Rotation: disabled");
    }

    let Some(status) = &policy.status else {
        println!();
        println!("Status: not yet reconciled");
        return Ok(());
    };

    println!();
    println!("Status:");
    println!("  Enforced Secrets: {}", status.enforced_secrets);
    println!("  Violations: {}", status.violations);
    if let Some(last_scan) = &status.last_scan_time {
        println!("  Last Scan: {last_scan}");
    }
    if let Some(observed) = status.observed_generation {
        println!("  Observed Generation: {observed}");
    }

    if !status.conditions.is_empty() {
        println!();
        println!("Conditions:");
        for (condition_type, state) in status.conditions.iter() {
            println!("  {condition_type}: {}", state.status);
            println!("    Reason: {}", state.reason);
            println!("    Message: {}", state.message);
            if let Some(time) = &state.last_transition_time {
                println!("    Last Transition: {time}");
            }
        }
    }

    if !status.secret_violations.is_empty() {
        println!();
        println!("Non-compliant Secrets:");
        for entry in &status.secret_violations {
            println!("  {}/{}", entry.namespace, entry.name);
            for violation in &entry.violations {
                println!("    - {violation}");
            }
        }
    }

    Ok(())
}

fn list_or_none(values: &[String]) -> String {
    if values.is_empty() {
        "<none>".to_string()
    } else {
        values.join(", ")
    }
}
