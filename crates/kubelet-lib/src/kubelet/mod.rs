//! Kubelet `/stats/summary` ingestion
//!
//! Fetches the node-local resource usage summary, reshapes it into
//! [`RawGroups`](crate::definition::RawGroups) and derives identifiers and
//! types for the entities it contains.

mod client;
mod extract;
mod fetch;
mod group;
mod identity;
pub mod summary;


pub use client::{HttpClient, KubeletClient, KubeletClientConfig, IN_CLUSTER_TOKEN_PATH};
pub use extract::{
    container_raw_entity_id, fetch_container_stats, fetch_node_stats, fetch_pod_stats,
    pod_raw_entity_id,
};
pub use fetch::{fetch_summary, STATS_SUMMARY_PATH};
pub use group::group_stats_summary;
pub use identity::{
    from_raw_entity_id_group_entity_id_generator, from_raw_groups_entity_id_generator,
    from_raw_groups_entity_type_generator,
};
pub use summary::Summary;
