//! Decoded `/stats/summary` response
//!
//! Mirrors the subset of the kubelet stats API (v1alpha1) that the grouper
//! consumes. Every numeric leaf is optional: the kubelet omits values it
//! could not collect, and an omitted value must stay distinguishable from 0.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Top-level summary returned by the kubelet
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    #[serde(default)]
    pub node: NodeStats,
    /// `None` when the kubelet sent no pod list at all
    #[serde(default)]
    pub pods: Option<Vec<PodStats>>,
}

/// Node-level usage plus the node name that keys the node entity
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStats {
    #[serde(default)]
    pub node_name: String,
    pub start_time: Option<DateTime<Utc>>,
    pub cpu: Option<CpuStats>,
    pub memory: Option<MemoryStats>,
    pub network: Option<NetworkStats>,
    pub fs: Option<FsStats>,
    pub runtime: Option<RuntimeStats>,
}

/// One pod and the containers running in it
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodStats {
    #[serde(default)]
    pub pod_ref: PodReference,
    pub start_time: Option<DateTime<Utc>>,
    /// `None` when the kubelet sent no container list for this pod
    #[serde(default)]
    pub containers: Option<Vec<ContainerStats>>,
    pub network: Option<NetworkStats>,
}

/// Identity of a pod within the cluster
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodReference {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub uid: String,
}

/// Usage of a single container inside a pod
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerStats {
    #[serde(default)]
    pub name: String,
    pub start_time: Option<DateTime<Utc>>,
    pub cpu: Option<CpuStats>,
    pub memory: Option<MemoryStats>,
}

/// CPU usage sampled at `time`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuStats {
    pub time: Option<DateTime<Utc>>,
    pub usage_nano_cores: Option<u64>,
    pub usage_core_nano_seconds: Option<u64>,
}

/// Memory usage sampled at `time`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStats {
    pub time: Option<DateTime<Utc>>,
    pub available_bytes: Option<u64>,
    pub usage_bytes: Option<u64>,
    pub working_set_bytes: Option<u64>,
    pub rss_bytes: Option<u64>,
    pub page_faults: Option<u64>,
    pub major_page_faults: Option<u64>,
}

/// Network statistics; the top-level counters describe the default interface
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStats {
    pub time: Option<DateTime<Utc>>,
    pub name: Option<String>,
    pub rx_bytes: Option<u64>,
    pub rx_errors: Option<u64>,
    pub tx_bytes: Option<u64>,
    pub tx_errors: Option<u64>,
    #[serde(default)]
    pub interfaces: Vec<InterfaceStats>,
}

/// Counters of one network interface
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceStats {
    #[serde(default)]
    pub name: String,
    pub rx_bytes: Option<u64>,
    pub rx_errors: Option<u64>,
    pub tx_bytes: Option<u64>,
    pub tx_errors: Option<u64>,
}

/// Filesystem capacity and usage, in bytes and inodes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FsStats {
    pub time: Option<DateTime<Utc>>,
    pub available_bytes: Option<u64>,
    pub capacity_bytes: Option<u64>,
    pub used_bytes: Option<u64>,
    pub inodes_free: Option<u64>,
    pub inodes: Option<u64>,
    pub inodes_used: Option<u64>,
}

/// Container runtime storage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeStats {
    pub image_fs: Option<FsStats>,
}
