//! Snapshot collection loop
//!
//! Periodically collects a snapshot from the kubelet with a configurable
//! interval and jitter, keeping health and metrics up to date.

use super::{collect_snapshot, Snapshot};
use crate::definition::GROUP_LABELS;
use crate::health::{components, HealthRegistry};
use crate::kubelet::HttpClient;
use crate::observability::{AgentMetrics, StructuredLogger};
use crate::sample::{kubelet_specs, EntitySpec};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

/// Configuration for the snapshot collection loop
#[derive(Debug, Clone)]
pub struct CollectionConfig {
    /// Base collection interval (default: 15 seconds)
    pub interval: Duration,
    /// Maximum jitter to add to interval (default: 1 second)
    pub jitter: Duration,
    /// Cluster name stamped onto entity types and samples
    pub cluster_name: String,
    /// Channel buffer size for collected snapshots
    pub buffer_size: usize,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(15),
            jitter: Duration::from_secs(1),
            cluster_name: "cluster".to_string(),
            buffer_size: 16,
        }
    }
}

/// Collection loop that takes one kubelet snapshot per tick
pub struct CollectionLoop {
    client: Arc<dyn HttpClient>,
    specs: Vec<EntitySpec>,
    config: CollectionConfig,
    health: HealthRegistry,
    metrics: AgentMetrics,
    logger: StructuredLogger,
    snapshot_tx: mpsc::Sender<Snapshot>,
}

impl CollectionLoop {
    /// Create a new collection loop
    pub fn new(
        client: Arc<dyn HttpClient>,
        config: CollectionConfig,
        health: HealthRegistry,
        logger: StructuredLogger,
    ) -> (Self, mpsc::Receiver<Snapshot>) {
        let (snapshot_tx, snapshot_rx) = mpsc::channel(config.buffer_size.max(1));

        let loop_instance = Self {
            client,
            specs: kubelet_specs(),
            config,
            health,
            metrics: AgentMetrics::new(),
            logger,
            snapshot_tx,
        };

        (loop_instance, snapshot_rx)
    }

    /// Run until a shutdown signal is received
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            cluster = %self.config.cluster_name,
            "Starting snapshot collection loop"
        );

        self.health.register(components::FETCHER).await;
        self.health.register(components::GROUPER).await;

        loop {
            // A cycle finishes before the next one is scheduled
            self.collect_once().await;

            tokio::select! {
                _ = sleep(self.current_interval()) => {}
                _ = shutdown.recv() => {
                    info!("Shutting down snapshot collection loop");
                    break;
                }
            }
        }
    }

    fn current_interval(&self) -> Duration {
        let jitter_ms = rand_jitter(self.config.jitter.as_millis() as u64);
        self.config.interval + Duration::from_millis(jitter_ms)
    }

    /// Run a single cycle, returning the snapshot if the fetch succeeded
    pub async fn collect_once(&self) -> Option<Snapshot> {
        let start = Instant::now();
        let result =
            collect_snapshot(self.client.as_ref(), &self.specs, &self.config.cluster_name).await;
        let elapsed = start.elapsed();
        self.metrics.observe_fetch_latency(elapsed.as_secs_f64());

        let snapshot = match result {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.metrics.inc_fetch_errors();
                self.health
                    .set_unhealthy(components::FETCHER, e.to_string())
                    .await;
                self.logger.log_snapshot_failed(&e.to_string());
                return None;
            }
        };
        self.health.set_healthy(components::FETCHER).await;

        self.record_diagnostics(&snapshot).await;

        for group in GROUP_LABELS {
            self.metrics
                .set_entities(group, snapshot.entity_count(group) as i64);
        }
        self.metrics.set_samples(snapshot.samples.len() as i64);
        self.health.record_snapshot(snapshot.timestamp).await;

        self.logger.log_snapshot_collected(
            snapshot.node_count(),
            snapshot.pod_count(),
            snapshot.container_count(),
            snapshot.error_count(),
            elapsed.as_millis(),
        );

        match self.snapshot_tx.try_send(snapshot.clone()) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!("Snapshot channel full, dropping snapshot");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("Snapshot channel closed");
            }
        }

        Some(snapshot)
    }

    /// Report skipped and fallback-typed entities of a snapshot.
    ///
    /// Only skipped entities count as entity errors. Either kind degrades
    /// the grouper until a clean snapshot comes in.
    async fn record_diagnostics(&self, snapshot: &Snapshot) -> usize {
        let skipped = snapshot.skipped_messages();
        let fallbacks = snapshot.fallback_messages();

        for reason in &skipped {
            self.logger.log_entity_skipped(reason);
        }
        for reason in &fallbacks {
            self.logger.log_entity_type_fallback(reason);
        }

        if skipped.is_empty() && fallbacks.is_empty() {
            self.health.set_healthy(components::GROUPER).await;
        } else {
            self.metrics.inc_entity_errors(skipped.len() as u64);
            self.health
                .set_degraded(
                    components::GROUPER,
                    format!(
                        "{} entities skipped, {} with fallback type in last snapshot",
                        skipped.len(),
                        fallbacks.len()
                    ),
                )
                .await;
        }

        skipped.len()
    }
}

/// Generate a random jitter value between 0 and max_ms
fn rand_jitter(max_ms: u64) -> u64 {
    if max_ms == 0 {
        return 0;
    }

    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64;

    now % max_ms
}

/// Builder for creating the collection loop
pub struct CollectionLoopBuilder {
    client: Option<Arc<dyn HttpClient>>,
    health: Option<HealthRegistry>,
    node_name: String,
    config: CollectionConfig,
}

impl CollectionLoopBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            client: None,
            health: None,
            node_name: String::new(),
            config: CollectionConfig::default(),
        }
    }

    /// Set the kubelet client
    pub fn client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Share a health registry with the health endpoints
    pub fn health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    pub fn node_name(mut self, node_name: impl Into<String>) -> Self {
        self.node_name = node_name.into();
        self
    }

    pub fn cluster_name(mut self, cluster_name: impl Into<String>) -> Self {
        self.config.cluster_name = cluster_name.into();
        self
    }

    /// Set the collection interval
    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    /// Set the jitter duration
    pub fn jitter(mut self, jitter: Duration) -> Self {
        self.config.jitter = jitter;
        self
    }

    /// Set the buffer size
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.config.buffer_size = size;
        self
    }

    /// Build the collection loop
    pub fn build(self) -> Result<(CollectionLoop, mpsc::Receiver<Snapshot>)> {
        let client = self
            .client
            .ok_or_else(|| anyhow::anyhow!("Kubelet client is required"))?;
        let logger = StructuredLogger::new(self.node_name, self.config.cluster_name.clone());

        Ok(CollectionLoop::new(
            client,
            self.config,
            self.health.unwrap_or_default(),
            logger,
        ))
    }
}

impl Default for CollectionLoopBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{RawGroups, POD};
    use crate::error::{FetchError, FetchResult, LookupError, SampleError, TypeLookupError};
    use crate::health::ComponentStatus;
    use crate::kubelet::{KubeletClient, KubeletClientConfig, STATS_SUMMARY_PATH};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Client that counts calls and never reaches a kubelet
    struct UnreachableClient {
        call_count: AtomicUsize,
    }

    #[async_trait]
    impl HttpClient for UnreachableClient {
        async fn get(&self, _path: &str) -> FetchResult<reqwest::Response> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            Err(FetchError::Status(503))
        }
    }

    fn client_for(server: &mockito::Server) -> Arc<dyn HttpClient> {
        Arc::new(
            KubeletClient::new(&KubeletClientConfig {
                endpoint: server.url(),
                ..Default::default()
            })
            .unwrap(),
        )
    }

    #[test]
    fn test_collection_config_default() {
        let config = CollectionConfig::default();
        assert_eq!(config.interval, Duration::from_secs(15));
        assert_eq!(config.jitter, Duration::from_secs(1));
        assert_eq!(config.cluster_name, "cluster");
    }

    #[test]
    fn test_rand_jitter() {
        let jitter = rand_jitter(1000);
        assert!(jitter < 1000);

        assert_eq!(rand_jitter(0), 0);
    }

    #[test]
    fn test_collection_loop_builder() {
        let client = Arc::new(UnreachableClient {
            call_count: AtomicUsize::new(0),
        });

        let result = CollectionLoopBuilder::new()
            .client(client)
            .cluster_name("prod")
            .interval(Duration::from_secs(5))
            .build();

        let (collection_loop, _rx) = result.unwrap();
        assert_eq!(collection_loop.config.cluster_name, "prod");
        assert_eq!(collection_loop.specs.len(), 3);
    }

    #[test]
    fn test_collection_loop_builder_missing_client() {
        let result = CollectionLoopBuilder::new().build();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_collect_once_success() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", STATS_SUMMARY_PATH)
            .with_status(200)
            .with_body(
                r#"{
                    "node": {"nodeName": "node-1"},
                    "pods": [{"podRef": {"name": "web-0", "namespace": "shop"},
                              "containers": [{"name": "nginx"}]}]
                }"#,
            )
            .create_async()
            .await;

        let health = HealthRegistry::new();
        let (collection_loop, mut rx) = CollectionLoopBuilder::new()
            .client(client_for(&server))
            .health(health.clone())
            .build()
            .unwrap();

        let snapshot = collection_loop.collect_once().await.unwrap();
        assert_eq!(snapshot.samples.len(), 3);

        let sent = rx.try_recv().unwrap();
        assert_eq!(sent.container_count(), 1);

        let report = health.health().await;
        assert_eq!(report.status, ComponentStatus::Healthy);
        assert!(health.readiness().await.ready);
    }

    #[tokio::test]
    async fn test_collect_once_partial_snapshot_degrades_grouper() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", STATS_SUMMARY_PATH)
            .with_status(200)
            .with_body(r#"{"node": {"nodeName": "node-1"}}"#)
            .create_async()
            .await;

        let health = HealthRegistry::new();
        let (collection_loop, _rx) = CollectionLoopBuilder::new()
            .client(client_for(&server))
            .health(health.clone())
            .build()
            .unwrap();

        let snapshot = collection_loop.collect_once().await.unwrap();
        assert_eq!(snapshot.node_count(), 1);
        assert_eq!(snapshot.error_count(), 1);

        let report = health.health().await;
        assert_eq!(report.status, ComponentStatus::Degraded);
        assert_eq!(
            report.components[components::GROUPER].status,
            ComponentStatus::Degraded
        );
        assert!(health.readiness().await.ready);
    }

    #[tokio::test]
    async fn test_fallback_type_degrades_without_skipping() {
        let client = Arc::new(UnreachableClient {
            call_count: AtomicUsize::new(0),
        });
        let health = HealthRegistry::new();
        let (collection_loop, _rx) = CollectionLoopBuilder::new()
            .client(client)
            .health(health.clone())
            .build()
            .unwrap();

        let snapshot = Snapshot {
            timestamp: 0,
            groups: RawGroups::new(),
            samples: Vec::new(),
            extract_errors: Vec::new(),
            sample_errors: vec![SampleError::EntityType {
                group: POD.to_string(),
                raw_entity_id: "shop_web-0".to_string(),
                source: TypeLookupError {
                    fallback: "k8s:prod:unknown:pod".to_string(),
                    source: LookupError::FieldNotFound {
                        key: "namespace".to_string(),
                        group: POD.to_string(),
                    },
                },
            }],
        };

        assert_eq!(collection_loop.record_diagnostics(&snapshot).await, 0);

        let report = health.health().await;
        let grouper = &report.components[components::GROUPER];
        assert_eq!(grouper.status, ComponentStatus::Degraded);
        assert_eq!(
            grouper.message.as_deref(),
            Some("0 entities skipped, 1 with fallback type in last snapshot")
        );

        let clean = Snapshot {
            sample_errors: Vec::new(),
            ..snapshot
        };
        assert_eq!(collection_loop.record_diagnostics(&clean).await, 0);
        assert_eq!(
            health.health().await.components[components::GROUPER].status,
            ComponentStatus::Healthy
        );
    }

    #[tokio::test]
    async fn test_collect_once_fetch_failure() {
        let client = Arc::new(UnreachableClient {
            call_count: AtomicUsize::new(0),
        });
        let health = HealthRegistry::new();
        let (collection_loop, mut rx) = CollectionLoopBuilder::new()
            .client(client.clone())
            .health(health.clone())
            .build()
            .unwrap();

        assert!(collection_loop.collect_once().await.is_none());
        assert_eq!(client.call_count.load(Ordering::SeqCst), 1);
        assert!(rx.try_recv().is_err());

        let report = health.health().await;
        assert_eq!(
            report.components[components::FETCHER].status,
            ComponentStatus::Unhealthy
        );
        assert!(!health.readiness().await.ready);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let client = Arc::new(UnreachableClient {
            call_count: AtomicUsize::new(0),
        });
        let (collection_loop, _rx) = CollectionLoopBuilder::new()
            .client(client.clone())
            .interval(Duration::from_secs(3600))
            .jitter(Duration::ZERO)
            .build()
            .unwrap();

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let handle = tokio::spawn(collection_loop.run(shutdown_rx));

        // The first cycle runs immediately
        while client.call_count.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }
        shutdown_tx.send(()).unwrap();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
