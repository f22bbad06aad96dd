//! Kubelet Stats CLI
//!
//! A command-line tool for fetching a kubelet `/stats/summary` snapshot and
//! inspecting the grouped entities, their derived identities, and the
//! diagnostics produced while grouping.

mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{entities, errors, snapshot, GroupArg, Target};
use kubelet_lib::kubelet::KubeletClientConfig;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const DEFAULT_KUBELET_URL: &str = "https://localhost:10250";
const DEFAULT_CLUSTER_NAME: &str = "cluster";

/// Kubelet Stats CLI
#[derive(Parser)]
#[command(name = "kstats")]
#[command(author, version, about = "CLI for inspecting kubelet stats snapshots", long_about = None)]
pub struct Cli {
    /// Kubelet base URL (can also be set via KSTATS_KUBELET_URL env var)
    #[arg(long, env = "KSTATS_KUBELET_URL")]
    pub kubelet_url: Option<String>,

    /// Cluster name used in entity types
    #[arg(long, env = "KSTATS_CLUSTER_NAME")]
    pub cluster_name: Option<String>,

    /// File holding a bearer token for the kubelet API
    #[arg(long, env = "KSTATS_TOKEN_PATH")]
    pub token_path: Option<PathBuf>,

    /// Skip verification of the kubelet serving certificate
    #[arg(long, short = 'k')]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, default_value_t = 10)]
    pub timeout_secs: u64,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the grouped raw metrics of a fresh snapshot
    Snapshot {
        /// Only show one group
        #[arg(long, short)]
        group: Option<GroupArg>,
    },

    /// Show the raw metrics of a single entity
    Entity {
        /// Group of the entity
        group: GroupArg,

        /// Raw entity key, e.g. `kube-system_coredns-5d78c9869d-abcde`
        raw_entity_id: String,
    },

    /// Show identified entities and their types
    Entities {
        /// Only show one group
        #[arg(long, short)]
        group: Option<GroupArg>,
    },

    /// Show entities that were skipped or only partially identified
    Errors,

    /// Save kubelet URL, cluster name and token path as defaults
    Config {
        #[arg(long)]
        kubelet_url: Option<String>,

        #[arg(long)]
        cluster_name: Option<String>,

        #[arg(long)]
        token_path: Option<PathBuf>,
    },
}

impl Cli {
    /// Command line over config file over built-in defaults
    fn target(&self, file: config::Config) -> Target {
        let resolved = file.merge(config::Config {
            kubelet_url: self.kubelet_url.clone(),
            cluster_name: self.cluster_name.clone(),
            token_path: self.token_path.clone(),
        });

        Target {
            client: KubeletClientConfig {
                endpoint: resolved
                    .kubelet_url
                    .unwrap_or_else(|| DEFAULT_KUBELET_URL.to_string()),
                token_path: resolved.token_path,
                timeout: Duration::from_secs(self.timeout_secs),
                insecure_tls: self.insecure,
            },
            cluster_name: resolved
                .cluster_name
                .unwrap_or_else(|| DEFAULT_CLUSTER_NAME.to_string()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .compact()
            .with_env_filter(EnvFilter::new("debug"))
            .with_writer(std::io::stderr)
            .init();
    }

    let file_config = config::Config::load()?;

    match &cli.command {
        Commands::Snapshot { group } => {
            snapshot::show_snapshot(&cli.target(file_config), *group, cli.format).await?;
        }
        Commands::Entity {
            group,
            raw_entity_id,
        } => {
            snapshot::show_entity(&cli.target(file_config), *group, raw_entity_id, cli.format)
                .await?;
        }
        Commands::Entities { group } => {
            entities::show_entities(&cli.target(file_config), *group, cli.format).await?;
        }
        Commands::Errors => {
            errors::show_errors(&cli.target(file_config), cli.format).await?;
        }
        Commands::Config {
            kubelet_url,
            cluster_name,
            token_path,
        } => {
            let updated = file_config.merge(config::Config {
                kubelet_url: kubelet_url.clone(),
                cluster_name: cluster_name.clone(),
                token_path: token_path.clone(),
            });
            let path = updated.save()?;
            output::print_success(&format!("Saved defaults to {}", path.display()));
            output::print_info(&serde_json::to_string_pretty(&updated)?);
        }
    }

    Ok(())
}
