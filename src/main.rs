//! # Secret Policy Controller
//!
//! A Kubernetes operator that enforces `SecretPolicy` compliance rules over
//! every Secret in the cluster.
//!
//! ## Overview
//!
//! 1. **Reconciliation** - Scans Secrets against policies whenever either changes
//!    and records the results in `SecretPolicy.status`
//! 2. **Events** - Emits a Warning event per violation on the owning policy
//! 3. **Admission** - Rejects non-compliant Secrets at admission time (optional)
//! 4. **Cleanup** - A finalizer strips controller-managed annotations on policy deletion
//!
//! ## Usage
//!
//! See the [README.md](../README.md) for deployment and configuration.

use anyhow::Result;
use secret_policy_controller::observability;
use secret_policy_controller::runtime::{initialize, run_watch_loop, InitializationResult};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let InitializationResult {
        client,
        reconciler,
        server_state,
        otel_tracer_provider,
        config,
    } = initialize().await?;

    run_watch_loop(client, reconciler, server_state, &config).await?;

    observability::otel::shutdown_otel(otel_tracer_provider);

    info!("Secret Policy Controller exited");
    Ok(())
}
