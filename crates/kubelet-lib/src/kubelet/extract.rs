//! Per-entity projection of the stats summary into raw metrics
//!
//! Each extractor is pure: it reads one decoded record and produces the
//! flattened attributes for that entity, or an error when the record lacks
//! its identifying fields.

use super::summary::{ContainerStats, FsStats, NetworkStats, NodeStats, PodStats};
use crate::definition::{add_uint64_metric, RawMetrics, RawValue};
use crate::error::ExtractError;

/// Extract node metrics. Returns the metrics and the node name as raw key.
pub fn fetch_node_stats(node: &NodeStats) -> Result<(RawMetrics, String), ExtractError> {
    if node.node_name.is_empty() {
        return Err(ExtractError::EmptyNodeName);
    }

    let mut r = RawMetrics::new();
    r.insert("nodeName".into(), RawValue::from(node.node_name.as_str()));

    if let Some(cpu) = &node.cpu {
        add_uint64_metric(&mut r, "usageNanoCores", cpu.usage_nano_cores);
        add_uint64_metric(&mut r, "usageCoreNanoSeconds", cpu.usage_core_nano_seconds);
    }

    if let Some(memory) = &node.memory {
        add_uint64_metric(&mut r, "memoryUsageBytes", memory.usage_bytes);
        add_uint64_metric(&mut r, "memoryAvailableBytes", memory.available_bytes);
        add_uint64_metric(&mut r, "memoryWorkingSetBytes", memory.working_set_bytes);
        add_uint64_metric(&mut r, "memoryRssBytes", memory.rss_bytes);
        add_uint64_metric(&mut r, "memoryPageFaults", memory.page_faults);
        add_uint64_metric(&mut r, "memoryMajorPageFaults", memory.major_page_faults);
    }

    if let Some(network) = &node.network {
        add_network_metrics(&mut r, network);
    }

    if let Some(fs) = &node.fs {
        add_fs_metrics(&mut r, "fs", fs);
    }

    if let Some(image_fs) = node.runtime.as_ref().and_then(|rt| rt.image_fs.as_ref()) {
        add_fs_metrics(&mut r, "runtime", image_fs);
    }

    Ok((r, node.node_name.clone()))
}

/// Extract pod metrics. Returns the metrics and `<namespace>_<podName>`.
pub fn fetch_pod_stats(pod: &PodStats) -> Result<(RawMetrics, String), ExtractError> {
    let name = &pod.pod_ref.name;
    let namespace = &pod.pod_ref.namespace;
    if name.is_empty() || namespace.is_empty() {
        return Err(ExtractError::EmptyPodIdentifier);
    }

    let mut r = RawMetrics::new();
    r.insert("podName".into(), RawValue::from(name.as_str()));
    r.insert("namespace".into(), RawValue::from(namespace.as_str()));

    if let Some(network) = &pod.network {
        add_network_metrics(&mut r, network);
    }

    Ok((r, pod_raw_entity_id(namespace, name)))
}

/// Extract container metrics. The raw key depends on the parent pod and is
/// built by the grouper.
pub fn fetch_container_stats(container: &ContainerStats) -> Result<RawMetrics, ExtractError> {
    if container.name.is_empty() {
        return Err(ExtractError::EmptyContainerName);
    }

    let mut r = RawMetrics::new();
    r.insert("containerName".into(), RawValue::from(container.name.as_str()));

    if let Some(cpu) = &container.cpu {
        add_uint64_metric(&mut r, "usageNanoCores", cpu.usage_nano_cores);
    }
    if let Some(memory) = &container.memory {
        add_uint64_metric(&mut r, "usageBytes", memory.usage_bytes);
    }

    Ok(r)
}

/// Raw entity key of a pod
pub fn pod_raw_entity_id(namespace: &str, pod_name: &str) -> String {
    format!("{}_{}", namespace, pod_name)
}

/// Raw entity key of a container
pub fn container_raw_entity_id(namespace: &str, pod_name: &str, container_name: &str) -> String {
    format!("{}_{}_{}", namespace, pod_name, container_name)
}

fn add_network_metrics(r: &mut RawMetrics, network: &NetworkStats) {
    add_uint64_metric(r, "rxBytes", network.rx_bytes);
    add_uint64_metric(r, "txBytes", network.tx_bytes);
    // Only reported when both counters are known
    if let (Some(rx), Some(tx)) = (network.rx_errors, network.tx_errors) {
        r.insert("errors".into(), RawValue::Uint(rx.saturating_add(tx)));
    }
}

fn add_fs_metrics(r: &mut RawMetrics, prefix: &str, fs: &FsStats) {
    let fields = [
        ("AvailableBytes", fs.available_bytes),
        ("CapacityBytes", fs.capacity_bytes),
        ("UsedBytes", fs.used_bytes),
        ("InodesFree", fs.inodes_free),
        ("Inodes", fs.inodes),
        ("InodesUsed", fs.inodes_used),
    ];
    for (suffix, value) in fields {
        add_uint64_metric(r, &format!("{}{}", prefix, suffix), value);
    }
}
