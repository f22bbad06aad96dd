//! Entity identifier and entity type generators
//!
//! Each generator is a closure over one configuration key, invoked once per
//! entity by the reporting side with the fully built [`RawGroups`].

use crate::definition::{
    EntityIdGenerator, EntityTypeGenerator, RawGroups, CONTAINER, NAMESPACE, NODE, POD,
};
use crate::error::{LookupError, TypeLookupError};

/// Use the string value of `key` verbatim as the entity ID.
///
/// Used for containers, whose raw key is the full `<ns>_<pod>_<name>` path.
pub fn from_raw_groups_entity_id_generator(key: impl Into<String>) -> EntityIdGenerator {
    let key = key.into();
    Box::new(move |group_label: &str, raw_entity_id: &str, groups: &RawGroups| {
        groups
            .lookup_str(group_label, raw_entity_id, &key)
            .map(str::to_string)
    })
}

/// Strip `<value of key>_` from the front of the raw entity key.
///
/// Used for pods, whose raw key is `<namespace>_<podName>`.
pub fn from_raw_entity_id_group_entity_id_generator(key: impl Into<String>) -> EntityIdGenerator {
    let key = key.into();
    Box::new(move |group_label: &str, raw_entity_id: &str, groups: &RawGroups| {
        let to_remove = groups.lookup(group_label, raw_entity_id, &key)?;
        let prefix = format!("{}_", to_remove);
        let id = raw_entity_id.strip_prefix(&prefix).unwrap_or(raw_entity_id);

        if id.is_empty() {
            return Err(LookupError::EmptyEntityId {
                raw_entity_id: raw_entity_id.to_string(),
            });
        }

        Ok(id.to_string())
    })
}

/// Build `k8s:<cluster>:<value of key>:<category>` for an entity.
///
/// Namespaces and nodes are typed by their group label alone. Containers
/// are categorised as pods, using the pod fields copied onto them. On a
/// failed lookup the type is built from `default_value` and returned
/// inside the error.
pub fn from_raw_groups_entity_type_generator(
    key: impl Into<String>,
    default_value: impl Into<String>,
) -> EntityTypeGenerator {
    let key = key.into();
    let default_value = default_value.into();
    Box::new(
        move |group_label: &str, raw_entity_id: &str, groups: &RawGroups, cluster_name: &str| {
            let category = match group_label {
                NAMESPACE | NODE => return Ok(format!("k8s:{}:{}", cluster_name, group_label)),
                CONTAINER => POD,
                other => other,
            };

            groups
                .lookup_str(group_label, raw_entity_id, &key)
                .map(|value| format!("k8s:{}:{}:{}", cluster_name, value, category))
                .map_err(|source| TypeLookupError {
                    fallback: format!("k8s:{}:{}:{}", cluster_name, default_value, category),
                    source,
                })
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{RawMetrics, RawValue};

    fn store() -> RawGroups {
        let mut groups = RawGroups::new();

        let mut pod = RawMetrics::new();
        pod.insert("podName".into(), "web-0".into());
        pod.insert("namespace".into(), "shop".into());
        groups.insert(POD, "shop_web-0", pod);

        let mut container = RawMetrics::new();
        container.insert("containerName".into(), "nginx".into());
        container.insert("podName".into(), "web-0".into());
        container.insert("namespace".into(), "shop".into());
        container.insert("usageBytes".into(), RawValue::Uint(10));
        groups.insert(CONTAINER, "shop_web-0_nginx", container);

        groups
    }

    #[test]
    fn test_id_from_field() {
        let generator = from_raw_groups_entity_id_generator("containerName");
        let id = generator(CONTAINER, "shop_web-0_nginx", &store()).unwrap();
        assert_eq!(id, "nginx");
    }

    #[test]
    fn test_id_from_field_failures() {
        let groups = store();

        let generator = from_raw_groups_entity_id_generator("containerName");
        assert!(matches!(
            generator(CONTAINER, "shop_web-0_missing", &groups),
            Err(LookupError::EntityNotFound { .. })
        ));
        assert!(matches!(
            generator("replicaset", "shop_web-0_nginx", &groups),
            Err(LookupError::GroupNotFound { .. })
        ));

        let generator = from_raw_groups_entity_id_generator("usageBytes");
        assert!(matches!(
            generator(CONTAINER, "shop_web-0_nginx", &groups),
            Err(LookupError::IncorrectType { .. })
        ));
    }

    #[test]
    fn test_id_from_raw_key() {
        let generator = from_raw_entity_id_group_entity_id_generator("namespace");
        let id = generator(POD, "shop_web-0", &store()).unwrap();
        assert_eq!(id, "web-0");
    }

    #[test]
    fn test_id_from_raw_key_keeps_underscores_in_name() {
        let mut groups = RawGroups::new();
        let mut pod = RawMetrics::new();
        pod.insert("podName".into(), "my_pod".into());
        pod.insert("namespace".into(), "team_a".into());
        groups.insert(POD, "team_a_my_pod", pod);

        let generator = from_raw_entity_id_group_entity_id_generator("namespace");
        assert_eq!(generator(POD, "team_a_my_pod", &groups).unwrap(), "my_pod");
    }

    #[test]
    fn test_id_from_raw_key_empty_result() {
        let mut groups = RawGroups::new();
        let mut pod = RawMetrics::new();
        pod.insert("namespace".into(), "shop".into());
        groups.insert(POD, "shop_", pod);

        let generator = from_raw_entity_id_group_entity_id_generator("namespace");
        assert!(matches!(
            generator(POD, "shop_", &groups),
            Err(LookupError::EmptyEntityId { .. })
        ));
    }

    #[test]
    fn test_id_from_raw_key_missing_field() {
        let generator = from_raw_entity_id_group_entity_id_generator("uid");
        assert!(matches!(
            generator(POD, "shop_web-0", &store()),
            Err(LookupError::FieldNotFound { .. })
        ));
    }

    #[test]
    fn test_type_for_node_and_namespace() {
        let generator = from_raw_groups_entity_type_generator("namespace", "");
        let empty = RawGroups::new();

        assert_eq!(generator(NODE, "anything", &empty, "prod").unwrap(), "k8s:prod:node");
        assert_eq!(
            generator(NAMESPACE, "shop", &empty, "prod").unwrap(),
            "k8s:prod:namespace"
        );
    }

    #[test]
    fn test_type_for_pod_and_container() {
        let generator = from_raw_groups_entity_type_generator("namespace", "");
        let groups = store();

        assert_eq!(
            generator(POD, "shop_web-0", &groups, "prod").unwrap(),
            "k8s:prod:shop:pod"
        );
        assert_eq!(
            generator(CONTAINER, "shop_web-0_nginx", &groups, "prod").unwrap(),
            "k8s:prod:shop:pod"
        );
    }

    #[test]
    fn test_type_fallback_on_missing_field() {
        let generator = from_raw_groups_entity_type_generator("deploymentName", "unknown");

        let err = generator(CONTAINER, "shop_web-0_nginx", &store(), "prod").unwrap_err();
        assert_eq!(err.fallback, "k8s:prod:unknown:pod");
        assert!(matches!(err.source, LookupError::FieldNotFound { .. }));
    }

    #[test]
    fn test_type_fallback_on_missing_entity_and_group() {
        let generator = from_raw_groups_entity_type_generator("namespace", "unknown");
        let groups = store();

        let err = generator(CONTAINER, "shop_web-1_nginx", &groups, "dev").unwrap_err();
        assert_eq!(err.fallback, "k8s:dev:unknown:pod");
        assert!(matches!(err.source, LookupError::EntityNotFound { .. }));

        let err = generator("replicaset", "shop_web", &groups, "dev").unwrap_err();
        assert_eq!(err.fallback, "k8s:dev:unknown:replicaset");
        assert!(matches!(err.source, LookupError::GroupNotFound { .. }));
    }

    #[test]
    fn test_type_fallback_on_wrong_value_type() {
        let generator = from_raw_groups_entity_type_generator("usageBytes", "unknown");

        let err = generator(CONTAINER, "shop_web-0_nginx", &store(), "prod").unwrap_err();
        assert_eq!(err.fallback, "k8s:prod:unknown:pod");
        assert!(matches!(err.source, LookupError::IncorrectType { .. }));
    }
}
