//! Kubelet Agent - periodic `/stats/summary` snapshots
//!
//! This binary runs as a DaemonSet on each Kubernetes node, grouping the
//! node-local kubelet stats into node, pod and container entities.

use anyhow::{Context, Result};
use kubelet_lib::{
    collector::CollectionLoopBuilder,
    health::HealthRegistry,
    kubelet::KubeletClient,
    observability::{AgentMetrics, StructuredLogger},
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting kubelet-agent");

    let config = config::AgentConfig::load()?;
    info!(
        node_name = %config.node_name,
        cluster_name = %config.cluster_name,
        "Agent configured"
    );

    let client = KubeletClient::new(&config.kubelet_client_config())
        .context("Failed to create kubelet client")?;

    let health_registry = HealthRegistry::new();
    // Registers the metrics before the first scrape
    AgentMetrics::new();

    let logger = StructuredLogger::new(&config.node_name, &config.cluster_name);
    logger.log_startup(AGENT_VERSION, &config.kubelet_url);

    let (collection_loop, mut snapshot_rx) = CollectionLoopBuilder::new()
        .client(Arc::new(client))
        .health(health_registry.clone())
        .node_name(&config.node_name)
        .cluster_name(&config.cluster_name)
        .interval(config.collection_interval())
        .build()?;

    let app_state = Arc::new(api::AppState::new(health_registry));

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let loop_handle = tokio::spawn(collection_loop.run(shutdown_rx));

    let publisher_state = app_state.clone();
    tokio::spawn(async move {
        while let Some(snapshot) = snapshot_rx.recv().await {
            debug!(samples = snapshot.samples.len(), "Publishing snapshot");
            publisher_state.publish(snapshot).await;
        }
    });

    let api_port = config.api_port;
    tokio::spawn(async move {
        if let Err(e) = api::serve(api_port, app_state).await {
            error!(error = %e, "API server failed");
        }
    });

    tokio::signal::ctrl_c().await?;
    logger.log_shutdown("SIGINT received");

    let _ = shutdown_tx.send(());
    loop_handle.await?;
    info!("Shutdown complete");

    Ok(())
}
