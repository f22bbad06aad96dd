//! Grouping of a stats summary into node, pod and container entities

use super::extract::{container_raw_entity_id, fetch_container_stats, fetch_node_stats, fetch_pod_stats};
use super::summary::Summary;
use crate::definition::{RawGroups, RawValue, CONTAINER, NODE, POD};
use crate::error::ExtractError;
use tracing::debug;

/// Group a stats summary by entity kind.
///
/// Extraction failures never abort the pass: a failing node, pod or
/// container is skipped (a failing pod takes its containers with it) and
/// the error is collected. The returned store always holds the node, pod
/// and container groups, possibly empty.
pub fn group_stats_summary(summary: &Summary) -> (RawGroups, Vec<ExtractError>) {
    let mut errs = Vec::new();
    let mut groups = RawGroups::new();

    match fetch_node_stats(&summary.node) {
        Ok((metrics, raw_entity_id)) => {
            groups.insert(NODE, raw_entity_id, metrics);
        }
        Err(e) => errs.push(e),
    }

    let Some(pods) = &summary.pods else {
        errs.push(ExtractError::MissingPods);
        return (groups, errs);
    };

    for pod in pods {
        let (pod_metrics, pod_raw_entity_id) = match fetch_pod_stats(pod) {
            Ok(extracted) => extracted,
            Err(e) => {
                errs.push(e);
                continue;
            }
        };

        groups.insert(POD, pod_raw_entity_id.as_str(), pod_metrics);

        let Some(containers) = &pod.containers else {
            errs.push(ExtractError::MissingContainers {
                pod: pod_raw_entity_id,
            });
            continue;
        };

        let namespace = pod.pod_ref.namespace.as_str();
        let pod_name = pod.pod_ref.name.as_str();

        for container in containers {
            let mut container_metrics = match fetch_container_stats(container) {
                Ok(metrics) => metrics,
                Err(e) => {
                    errs.push(e);
                    continue;
                }
            };
            container_metrics.insert("podName".into(), RawValue::from(pod_name));
            container_metrics.insert("namespace".into(), RawValue::from(namespace));

            let raw_entity_id = container_raw_entity_id(namespace, pod_name, &container.name);
            groups.insert(CONTAINER, raw_entity_id, container_metrics);
        }
    }

    debug!(
        entities = groups.entity_count(),
        errors = errs.len(),
        "Grouped stats summary"
    );

    (groups, errs)
}
