//! Observability for the snapshot agent
//!
//! Provides:
//! - Prometheus metrics (fetch latency, error counters, entities per group)
//! - Structured JSON logging with tracing

use prometheus::{
    register_histogram, register_int_counter, register_int_gauge, register_int_gauge_vec,
    Histogram, IntCounter, IntGauge, IntGaugeVec,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for kubelet request latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

static GLOBAL_METRICS: OnceLock<AgentMetricsInner> = OnceLock::new();

struct AgentMetricsInner {
    fetch_latency_seconds: Histogram,
    fetch_errors: IntCounter,
    entity_errors: IntCounter,
    entities: IntGaugeVec,
    samples: IntGauge,
}

impl AgentMetricsInner {
    fn new() -> Self {
        Self {
            fetch_latency_seconds: register_histogram!(
                "kubelet_agent_fetch_latency_seconds",
                "Time spent fetching /stats/summary from the kubelet",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register fetch_latency_seconds"),

            fetch_errors: register_int_counter!(
                "kubelet_agent_fetch_errors_total",
                "Total number of failed /stats/summary fetches"
            )
            .expect("Failed to register fetch_errors"),

            entity_errors: register_int_counter!(
                "kubelet_agent_entity_errors_total",
                "Total number of entities skipped while grouping a snapshot"
            )
            .expect("Failed to register entity_errors"),

            entities: register_int_gauge_vec!(
                "kubelet_agent_entities",
                "Number of entities in the last snapshot, by group",
                &["group"]
            )
            .expect("Failed to register entities"),

            samples: register_int_gauge!(
                "kubelet_agent_samples",
                "Number of samples built from the last snapshot"
            )
            .expect("Failed to register samples"),
        }
    }
}

/// Agent metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share the same
/// underlying metrics.
#[derive(Clone)]
pub struct AgentMetrics {
    _private: (),
}

impl Default for AgentMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(AgentMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &AgentMetricsInner {
        GLOBAL_METRICS.get_or_init(AgentMetricsInner::new)
    }

    pub fn observe_fetch_latency(&self, duration_secs: f64) {
        self.inner().fetch_latency_seconds.observe(duration_secs);
    }

    pub fn inc_fetch_errors(&self) {
        self.inner().fetch_errors.inc();
    }

    pub fn inc_entity_errors(&self, count: u64) {
        self.inner().entity_errors.inc_by(count);
    }

    /// Set the entity count of one group
    pub fn set_entities(&self, group: &str, count: i64) {
        self.inner().entities.with_label_values(&[group]).set(count);
    }

    pub fn set_samples(&self, count: i64) {
        self.inner().samples.set(count);
    }
}

/// Structured logger for agent events
#[derive(Clone)]
pub struct StructuredLogger {
    node_name: String,
    cluster_name: String,
}

impl StructuredLogger {
    pub fn new(node_name: impl Into<String>, cluster_name: impl Into<String>) -> Self {
        Self {
            node_name: node_name.into(),
            cluster_name: cluster_name.into(),
        }
    }

    /// Log a completed snapshot cycle
    pub fn log_snapshot_collected(
        &self,
        nodes: usize,
        pods: usize,
        containers: usize,
        errors: usize,
        elapsed_ms: u128,
    ) {
        info!(
            event = "snapshot_collected",
            node = %self.node_name,
            cluster = %self.cluster_name,
            nodes = nodes,
            pods = pods,
            containers = containers,
            errors = errors,
            elapsed_ms = elapsed_ms,
            "Collected kubelet snapshot"
        );
    }

    /// Log a fetch that produced no snapshot
    pub fn log_snapshot_failed(&self, error: &str) {
        warn!(
            event = "snapshot_failed",
            node = %self.node_name,
            cluster = %self.cluster_name,
            error = %error,
            "Failed to collect kubelet snapshot"
        );
    }

    /// Log an entity left out of a snapshot
    pub fn log_entity_skipped(&self, reason: &str) {
        warn!(
            event = "entity_skipped",
            node = %self.node_name,
            cluster = %self.cluster_name,
            reason = %reason,
            "Skipped entity"
        );
    }

    /// Log an entity kept under its fallback type
    pub fn log_entity_type_fallback(&self, reason: &str) {
        info!(
            event = "entity_type_fallback",
            node = %self.node_name,
            cluster = %self.cluster_name,
            reason = %reason,
            "Using fallback entity type"
        );
    }

    pub fn log_startup(&self, version: &str, kubelet_url: &str) {
        info!(
            event = "agent_started",
            node = %self.node_name,
            cluster = %self.cluster_name,
            agent_version = %version,
            kubelet_url = %kubelet_url,
            "Kubelet stats agent started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "agent_shutdown",
            node = %self.node_name,
            cluster = %self.cluster_name,
            reason = %reason,
            "Kubelet stats agent shutting down"
        );
    }
}
