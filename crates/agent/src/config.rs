//! Agent configuration

use anyhow::{Context, Result};
use kubelet_lib::kubelet::{KubeletClientConfig, IN_CLUSTER_TOKEN_PATH};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Agent configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Node name from Kubernetes downward API
    #[serde(default = "default_node_name")]
    pub node_name: String,

    /// Cluster name used in entity types
    #[serde(default = "default_cluster_name")]
    pub cluster_name: String,

    /// Base URL of the node-local kubelet
    #[serde(default = "default_kubelet_url")]
    pub kubelet_url: String,

    /// Bearer token file for the kubelet API
    #[serde(default = "default_token_path")]
    pub token_path: Option<PathBuf>,

    /// Skip verification of the kubelet serving certificate
    #[serde(default)]
    pub insecure_tls: bool,

    /// API server port for health/metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Snapshot interval in seconds
    #[serde(default = "default_collection_interval")]
    pub collection_interval_secs: u64,

    /// Kubelet request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_node_name() -> String {
    std::env::var("NODE_NAME").unwrap_or_else(|_| "unknown".to_string())
}

fn default_cluster_name() -> String {
    "cluster".to_string()
}

fn default_kubelet_url() -> String {
    "https://localhost:10250".to_string()
}

fn default_token_path() -> Option<PathBuf> {
    let path = Path::new(IN_CLUSTER_TOKEN_PATH);
    path.exists().then(|| path.to_path_buf())
}

fn default_api_port() -> u16 {
    8080
}

fn default_collection_interval() -> u64 {
    15
}

fn default_request_timeout() -> u64 {
    10
}

impl AgentConfig {
    /// Load configuration from `AGENT_*` environment variables
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("AGENT").try_parsing(true))
            .build()?;

        Self::from_config(config)
    }

    fn from_config(config: config::Config) -> Result<Self> {
        config
            .try_deserialize()
            .context("Invalid agent configuration")
    }

    pub fn collection_interval(&self) -> Duration {
        Duration::from_secs(self.collection_interval_secs)
    }

    /// Client settings for the configured kubelet
    pub fn kubelet_client_config(&self) -> KubeletClientConfig {
        KubeletClientConfig {
            endpoint: self.kubelet_url.clone(),
            token_path: self.token_path.clone(),
            timeout: Duration::from_secs(self.request_timeout_secs),
            insecure_tls: self.insecure_tls,
        }
    }
}
