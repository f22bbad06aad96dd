//! Snapshot collection from the kubelet
//!
//! A snapshot is one `/stats/summary` response grouped into node, pod and
//! container entities, together with the samples built from it and every
//! diagnostic produced along the way. [`collect_snapshot`] takes one;
//! [`CollectionLoop`] takes one per tick.

mod r#loop;

pub use r#loop::{CollectionConfig, CollectionLoop, CollectionLoopBuilder};

use crate::definition::{RawGroups, CONTAINER, NODE, POD};
use crate::error::{ExtractError, FetchResult, SampleError};
use crate::kubelet::{fetch_summary, group_stats_summary, HttpClient};
use crate::sample::{build_samples, EntitySpec, Sample};

/// Result of one collection cycle
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Unix timestamp at which grouping finished
    pub timestamp: i64,
    pub groups: RawGroups,
    pub samples: Vec<Sample>,
    pub extract_errors: Vec<ExtractError>,
    pub sample_errors: Vec<SampleError>,
}

impl Snapshot {
    /// Number of entities in `group`, zero when the group is absent
    pub fn entity_count(&self, group: &str) -> usize {
        self.groups.group(group).map_or(0, |g| g.len())
    }

    pub fn node_count(&self) -> usize {
        self.entity_count(NODE)
    }

    pub fn pod_count(&self) -> usize {
        self.entity_count(POD)
    }

    pub fn container_count(&self) -> usize {
        self.entity_count(CONTAINER)
    }

    pub fn error_count(&self) -> usize {
        self.extract_errors.len() + self.sample_errors.len()
    }

    /// Every diagnostic of the cycle, rendered as text
    pub fn error_messages(&self) -> Vec<String> {
        self.extract_errors
            .iter()
            .map(ToString::to_string)
            .chain(self.sample_errors.iter().map(ToString::to_string))
            .collect()
    }

    /// Diagnostics of entities left out of the snapshot
    pub fn skipped_messages(&self) -> Vec<String> {
        let unidentified = self
            .sample_errors
            .iter()
            .filter(|e| matches!(e, SampleError::EntityId { .. }));

        self.extract_errors
            .iter()
            .map(ToString::to_string)
            .chain(unidentified.map(ToString::to_string))
            .collect()
    }

    /// Diagnostics of entities kept under their fallback type
    pub fn fallback_messages(&self) -> Vec<String> {
        self.sample_errors
            .iter()
            .filter(|e| matches!(e, SampleError::EntityType { .. }))
            .map(ToString::to_string)
            .collect()
    }
}

/// Fetch, group and sample one `/stats/summary` response.
///
/// Only a failed fetch is an error. Entities that could not be extracted or
/// identified are left out and reported on the returned snapshot.
pub async fn collect_snapshot(
    client: &dyn HttpClient,
    specs: &[EntitySpec],
    cluster_name: &str,
) -> FetchResult<Snapshot> {
    let summary = fetch_summary(client).await?;
    let (groups, extract_errors) = group_stats_summary(&summary);
    let (samples, sample_errors) = build_samples(&groups, specs, cluster_name);

    Ok(Snapshot {
        timestamp: chrono::Utc::now().timestamp(),
        groups,
        samples,
        extract_errors,
        sample_errors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FetchError, LookupError, TypeLookupError};
    use crate::kubelet::{KubeletClient, KubeletClientConfig, STATS_SUMMARY_PATH};
    use crate::sample::kubelet_specs;

    fn snapshot_with_errors() -> Snapshot {
        Snapshot {
            timestamp: 0,
            groups: RawGroups::new(),
            samples: Vec::new(),
            extract_errors: vec![ExtractError::EmptyContainerName],
            sample_errors: vec![
                SampleError::EntityId {
                    group: POD.to_string(),
                    raw_entity_id: "orphan".to_string(),
                    source: LookupError::FieldNotFound {
                        key: "podName".to_string(),
                        group: POD.to_string(),
                    },
                },
                SampleError::EntityType {
                    group: POD.to_string(),
                    raw_entity_id: "shop_web-0".to_string(),
                    source: TypeLookupError {
                        fallback: "k8s:prod:unknown:pod".to_string(),
                        source: LookupError::FieldNotFound {
                            key: "namespace".to_string(),
                            group: POD.to_string(),
                        },
                    },
                },
            ],
        }
    }

    fn client_for(server: &mockito::Server) -> KubeletClient {
        KubeletClient::new(&KubeletClientConfig {
            endpoint: server.url(),
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_collect_snapshot() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", STATS_SUMMARY_PATH)
            .with_status(200)
            .with_body(
                r#"{
                    "node": {"nodeName": "node-1"},
                    "pods": [
                        {"podRef": {"name": "web-0", "namespace": "shop"},
                         "containers": [{"name": "nginx"}, {"name": ""}]}
                    ]
                }"#,
            )
            .create_async()
            .await;

        let snapshot = collect_snapshot(&client_for(&server), &kubelet_specs(), "prod")
            .await
            .unwrap();

        assert_eq!(snapshot.node_count(), 1);
        assert_eq!(snapshot.pod_count(), 1);
        assert_eq!(snapshot.container_count(), 1);
        assert_eq!(snapshot.samples.len(), 3);
        assert_eq!(snapshot.extract_errors, vec![ExtractError::EmptyContainerName]);
        assert_eq!(snapshot.error_count(), 1);
        assert!(snapshot.error_messages()[0].contains("/stats/summary"));
    }

    #[test]
    fn test_fallback_types_are_not_skipped_entities() {
        let snapshot = snapshot_with_errors();
        assert_eq!(snapshot.error_count(), 3);

        let skipped = snapshot.skipped_messages();
        assert_eq!(skipped.len(), 2);
        assert!(skipped[0].contains("/stats/summary"));
        assert!(skipped[1].contains("orphan"));

        let fallbacks = snapshot.fallback_messages();
        assert_eq!(fallbacks.len(), 1);
        assert!(fallbacks[0].contains("k8s:prod:unknown:pod"));
    }

    #[tokio::test]
    async fn test_collect_snapshot_fetch_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", STATS_SUMMARY_PATH)
            .with_status(500)
            .create_async()
            .await;

        let err = collect_snapshot(&client_for(&server), &kubelet_specs(), "prod")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status(500)));
    }
}
