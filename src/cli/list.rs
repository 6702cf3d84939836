//! # List Command
//!
//! Command to list SecretPolicy resources.

use anyhow::{Context, Result};
use kube::{api::Api, Client};
use secret_policy_controller::constants::READY_CONDITION;
use secret_policy_controller::crd::SecretPolicy;

/// List SecretPolicy resources in one namespace or across the cluster
pub async fn list_command(client: Client, namespace: Option<String>) -> Result<()> {
    let api: Api<SecretPolicy> = if let Some(ns) = &namespace {
        println!("Listing SecretPolicy resources in namespace '{ns}'...");
        Api::namespaced(client, ns)
    } else {
        println!("Listing SecretPolicy resources in all namespaces...");
        Api::all(client)
    };

    let policies = api
        .list(&kube::api::ListParams::default())
        .await
        .context("Failed to list SecretPolicy resources")?;

    if policies.items.is_empty() {
        println!("No SecretPolicy resources found.");
        return Ok(());
    }

    println!(
        "\n{:<30} {:<20} {:<10} {:<12} {:<12}",
        "NAME", "NAMESPACE", "READY", "SECRETS", "VIOLATIONS"
    );
    println!("{}", "-".repeat(86));

    for policy in policies.items {
        let name = policy.metadata.name.as_deref().unwrap_or("<unknown>");
        let ns = policy.metadata.namespace.as_deref().unwrap_or("<unknown>");

        let (ready, secrets, violations) = match &policy.status {
            Some(status) => (
                status.conditions.status_of(READY_CONDITION).to_string(),
                status.enforced_secrets.to_string(),
                status.violations.to_string(),
            ),
            None => ("Unknown".to_string(), "-".to_string(), "-".to_string()),
        };

        println!("{name:<30} {ns:<20} {ready:<10} {secrets:<12} {violations:<12}");
    }

    Ok(())
}
