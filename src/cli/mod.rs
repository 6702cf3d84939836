//! # SPCTL CLI
//!
//! Command-line interface for the Secret Policy Controller.
//!
//! ## Usage
//!
//! ```bash
//! # List all SecretPolicy resources
//! spctl list secretpolicy
//!
//! # Show status of a SecretPolicy
//! spctl status secretpolicy strict --namespace security
//!
//! # Check a Secret manifest against the policies in the cluster before applying it
//! spctl evaluate ./secret.yaml
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use kube::Client;
use std::path::PathBuf;

mod evaluate;
mod list;
mod status;

/// Secret Policy Controller CLI
#[derive(Parser)]
#[command(name = "spctl")]
#[command(
    about = "Secret Policy Controller CLI",
    long_about = None,
    after_help = "\
Available resource types:
  secretpolicy (or 'sp') - SecretPolicy resource

Examples:
  spctl list secretpolicy
  spctl status sp strict --namespace security
  spctl evaluate ./secret.yaml
"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Kubernetes namespace (defaults to all namespaces for list, "default" otherwise)
    #[arg(short, long, global = true)]
    namespace: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List SecretPolicy resources
    List {
        /// Resource type
        #[arg(value_enum, value_name = "RESOURCE_TYPE")]
        resource_type: ResourceType,
    },
    /// Show status of a SecretPolicy resource
    Status {
        /// Resource type
        #[arg(value_enum, value_name = "RESOURCE_TYPE")]
        resource_type: ResourceType,

        /// Name of the SecretPolicy resource
        #[arg(value_name = "NAME")]
        name: String,
    },
    /// Evaluate a Secret manifest against every SecretPolicy in the cluster
    /// Exits non-zero when the Secret would be rejected by the admission webhook
    Evaluate {
        /// Path to a Secret manifest (YAML or JSON)
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

/// Resource types supported by spctl
#[derive(Clone, ValueEnum)]
enum ResourceType {
    /// SecretPolicy resource (full name)
    /// Short form: 'sp'
    #[value(name = "secretpolicy", alias = "sp")]
    SecretPolicy,
}

#[tokio::main]
async fn main() -> Result<()> {
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        anyhow::bail!("Failed to install rustls crypto provider");
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "spctl=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client. Ensure kubeconfig is configured.")?;

    match cli.command {
        Commands::List { resource_type } => {
            let ResourceType::SecretPolicy = resource_type;
            list::list_command(client, cli.namespace).await
        }
        Commands::Status {
            resource_type,
            name,
        } => {
            let ResourceType::SecretPolicy = resource_type;
            status::status_command(client, name, cli.namespace).await
        }
        Commands::Evaluate { file } => evaluate::evaluate_command(client, file, cli.namespace).await,
    }
}
