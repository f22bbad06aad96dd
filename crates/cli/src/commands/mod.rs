//! Subcommand implementations

pub mod entities;
pub mod errors;
pub mod snapshot;

use anyhow::{Context, Result};
use clap::ValueEnum;
use kubelet_lib::{
    collect_snapshot,
    definition::{CONTAINER, NODE, POD},
    kubelet::{KubeletClient, KubeletClientConfig},
    kubelet_specs, Snapshot,
};
use tracing::debug;

/// Entity group selectable on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GroupArg {
    Node,
    Pod,
    Container,
}

impl GroupArg {
    pub fn label(self) -> &'static str {
        match self {
            GroupArg::Node => NODE,
            GroupArg::Pod => POD,
            GroupArg::Container => CONTAINER,
        }
    }
}

/// Where to fetch from and how to name the cluster
#[derive(Debug, Clone)]
pub struct Target {
    pub client: KubeletClientConfig,
    pub cluster_name: String,
}

/// Fetch one snapshot from the target kubelet
pub async fn take_snapshot(target: &Target) -> Result<Snapshot> {
    let client = KubeletClient::new(&target.client).context("Failed to create kubelet client")?;
    debug!(endpoint = %client.base_url(), "Fetching stats summary");

    collect_snapshot(&client, &kubelet_specs(), &target.cluster_name)
        .await
        .with_context(|| format!("Failed to fetch snapshot from {}", target.client.endpoint))
}
