//! Flat, group-oriented representation of one kubelet snapshot
//!
//! A snapshot is reshaped into three fixed groups (node, pod, container),
//! each mapping a raw entity key to the flattened attributes of that entity.

use crate::error::{LookupError, TypeLookupError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Group label for the node entity
pub const NODE: &str = "node";
/// Group label for pod entities
pub const POD: &str = "pod";
/// Group label for container entities
pub const CONTAINER: &str = "container";
/// Group label for namespaces (never stored, only used when deriving types)
pub const NAMESPACE: &str = "namespace";

/// The fixed set of groups present in every [`RawGroups`]
pub const GROUP_LABELS: [&str; 3] = [NODE, POD, CONTAINER];

/// A single raw metric value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Uint(u64),
    Str(String),
}

impl RawValue {
    /// Returns the string payload, or `None` for integers
    pub fn as_str(&self) -> Option<&str> {
        match self {
            RawValue::Str(s) => Some(s),
            RawValue::Uint(_) => None,
        }
    }

    /// Returns the integer payload, or `None` for strings
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            RawValue::Uint(v) => Some(*v),
            RawValue::Str(_) => None,
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Uint(v) => write!(f, "{}", v),
            RawValue::Str(s) => f.write_str(s),
        }
    }
}

impl From<u64> for RawValue {
    fn from(value: u64) -> Self {
        RawValue::Uint(value)
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Str(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Str(value.to_string())
    }
}

/// Flattened attributes of one entity, keyed by field name
pub type RawMetrics = BTreeMap<String, RawValue>;

/// Entities of one group, keyed by raw entity key
pub type RawGroup = BTreeMap<String, RawMetrics>;

/// Copy `value` into `metrics` under `name` only when it is present.
///
/// Absent upstream values leave the field out entirely.
pub fn add_uint64_metric(metrics: &mut RawMetrics, name: &str, value: Option<u64>) {
    if let Some(v) = value {
        metrics.insert(name.to_string(), RawValue::Uint(v));
    }
}

/// Full snapshot: group label -> raw entity key -> raw metrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RawGroups {
    groups: BTreeMap<String, RawGroup>,
}

impl Default for RawGroups {
    fn default() -> Self {
        Self::new()
    }
}

impl RawGroups {
    /// Create a store seeded with the empty node, pod and container groups
    pub fn new() -> Self {
        let groups = GROUP_LABELS
            .iter()
            .map(|label| (label.to_string(), RawGroup::new()))
            .collect();
        Self { groups }
    }

    /// Insert an entity, replacing any previous entry under the same key.
    ///
    /// Returns `false` and stores nothing when `group_label` is not one of
    /// [`GROUP_LABELS`].
    pub fn insert(
        &mut self,
        group_label: &str,
        raw_entity_id: impl Into<String>,
        metrics: RawMetrics,
    ) -> bool {
        match self.groups.get_mut(group_label) {
            Some(group) => {
                group.insert(raw_entity_id.into(), metrics);
                true
            }
            None => false,
        }
    }

    /// Get a whole group
    pub fn group(&self, group_label: &str) -> Option<&RawGroup> {
        self.groups.get(group_label)
    }

    /// Get one entity's metrics
    pub fn entity(&self, group_label: &str, raw_entity_id: &str) -> Option<&RawMetrics> {
        self.groups.get(group_label)?.get(raw_entity_id)
    }

    /// Iterate over groups in label order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawGroup)> {
        self.groups.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Total number of entities across all groups
    pub fn entity_count(&self) -> usize {
        self.groups.values().map(BTreeMap::len).sum()
    }

    /// Look up a field of one entity.
    ///
    /// Distinguishes a missing group, a missing entity and a missing field.
    pub fn lookup(
        &self,
        group_label: &str,
        raw_entity_id: &str,
        key: &str,
    ) -> Result<&RawValue, LookupError> {
        let group = self
            .groups
            .get(group_label)
            .ok_or_else(|| LookupError::GroupNotFound {
                group: group_label.to_string(),
            })?;
        let entity = group
            .get(raw_entity_id)
            .ok_or_else(|| LookupError::EntityNotFound {
                entity: raw_entity_id.to_string(),
                group: group_label.to_string(),
            })?;
        entity.get(key).ok_or_else(|| LookupError::FieldNotFound {
            key: key.to_string(),
            group: group_label.to_string(),
        })
    }

    /// Look up a field that must hold a string
    pub fn lookup_str(
        &self,
        group_label: &str,
        raw_entity_id: &str,
        key: &str,
    ) -> Result<&str, LookupError> {
        self.lookup(group_label, raw_entity_id, key)?
            .as_str()
            .ok_or_else(|| LookupError::IncorrectType {
                key: key.to_string(),
                group: group_label.to_string(),
            })
    }
}

/// Derives the entity identifier: `(group_label, raw_entity_id, groups)`
pub type EntityIdGenerator =
    Box<dyn Fn(&str, &str, &RawGroups) -> Result<String, LookupError> + Send + Sync>;

/// Derives the entity type: `(group_label, raw_entity_id, groups, cluster_name)`
pub type EntityTypeGenerator =
    Box<dyn Fn(&str, &str, &RawGroups, &str) -> Result<String, TypeLookupError> + Send + Sync>;
