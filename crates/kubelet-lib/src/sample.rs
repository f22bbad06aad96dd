//! Per-entity samples built from a grouped snapshot
//!
//! This is the hand-off point to a reporting pipeline: every entity of a
//! configured group gets an identifier, a type and a flat metric set.

use crate::definition::{
    EntityIdGenerator, EntityTypeGenerator, RawGroups, RawValue, CONTAINER, NODE, POD,
};
use crate::error::SampleError;
use crate::kubelet::{
    from_raw_entity_id_group_entity_id_generator, from_raw_groups_entity_id_generator,
    from_raw_groups_entity_type_generator,
};
use serde::Serialize;
use std::collections::BTreeMap;

/// Reported attributes of one entity
pub type MetricSet = BTreeMap<String, RawValue>;

/// Reporting identity of an entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entity {
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: String,
}

/// One entity and its metric set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sample {
    pub entity: Entity,
    pub metrics: MetricSet,
}

/// How the entities of one group are identified
pub struct EntitySpec {
    pub group: &'static str,
    pub id_generator: EntityIdGenerator,
    pub type_generator: EntityTypeGenerator,
}

impl std::fmt::Debug for EntitySpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntitySpec")
            .field("group", &self.group)
            .finish_non_exhaustive()
    }
}

/// Entity specs for the groups produced from `/stats/summary`
pub fn kubelet_specs() -> Vec<EntitySpec> {
    vec![
        EntitySpec {
            group: NODE,
            id_generator: from_raw_groups_entity_id_generator("nodeName"),
            type_generator: from_raw_groups_entity_type_generator("namespace", ""),
        },
        EntitySpec {
            group: POD,
            id_generator: from_raw_entity_id_group_entity_id_generator("namespace"),
            type_generator: from_raw_groups_entity_type_generator("namespace", ""),
        },
        EntitySpec {
            group: CONTAINER,
            id_generator: from_raw_groups_entity_id_generator("containerName"),
            type_generator: from_raw_groups_entity_type_generator("namespace", ""),
        },
    ]
}

/// Event type for a group: `replica_set` -> `K8sReplicaSetSample`
pub fn metric_set_type_guesser(group_label: &str) -> String {
    let sample_name: String = group_label.split('_').map(title_case).collect();
    format!("K8s{}Sample", sample_name)
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Stamp the cluster name onto a metric set, replacing any previous value
pub fn cluster_metrics_manipulator(metrics: &mut MetricSet, _entity: &Entity, cluster_name: &str) {
    metrics.insert("clusterName".into(), RawValue::from(cluster_name));
}

/// Expose the entity name as the display name
pub fn entity_metrics_manipulator(metrics: &mut MetricSet, entity: &Entity) {
    metrics.insert("displayName".into(), RawValue::from(entity.name.as_str()));
}

/// Build one sample per identifiable entity.
///
/// Entities without an identifier are dropped; entities whose type could
/// not be derived keep the fallback type. Both cases are reported in the
/// returned errors.
pub fn build_samples(
    groups: &RawGroups,
    specs: &[EntitySpec],
    cluster_name: &str,
) -> (Vec<Sample>, Vec<SampleError>) {
    let mut samples = Vec::new();
    let mut errs = Vec::new();

    for spec in specs {
        let Some(group) = groups.group(spec.group) else {
            continue;
        };
        let event_type = metric_set_type_guesser(spec.group);

        for (raw_entity_id, raw_metrics) in group {
            let name = match (spec.id_generator)(spec.group, raw_entity_id.as_str(), groups) {
                Ok(name) => name,
                Err(source) => {
                    errs.push(SampleError::EntityId {
                        group: spec.group.to_string(),
                        raw_entity_id: raw_entity_id.clone(),
                        source,
                    });
                    continue;
                }
            };

            let entity_type = match (spec.type_generator)(
                spec.group,
                raw_entity_id.as_str(),
                groups,
                cluster_name,
            ) {
                Ok(entity_type) => entity_type,
                Err(source) => {
                    let fallback = source.fallback.clone();
                    errs.push(SampleError::EntityType {
                        group: spec.group.to_string(),
                        raw_entity_id: raw_entity_id.clone(),
                        source,
                    });
                    fallback
                }
            };

            let entity = Entity { name, entity_type };
            let mut metrics = raw_metrics.clone();
            metrics.insert("event_type".into(), RawValue::from(event_type.as_str()));
            metrics.insert(
                "entityName".into(),
                RawValue::from(format!("{}:{}", entity.entity_type, entity.name)),
            );
            cluster_metrics_manipulator(&mut metrics, &entity, cluster_name);
            entity_metrics_manipulator(&mut metrics, &entity);

            samples.push(Sample { entity, metrics });
        }
    }

    (samples, errs)
}
