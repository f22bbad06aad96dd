//! Kubelet stats snapshot library
//!
//! This crate provides the core functionality for:
//! - Fetching the kubelet `/stats/summary` endpoint
//! - Grouping the response into node, pod and container entities
//! - Deriving entity identifiers and types
//! - Periodic snapshot collection, health checks and observability

pub mod collector;
pub mod definition;
pub mod error;
pub mod health;
pub mod kubelet;
pub mod observability;
pub mod sample;

pub use collector::{collect_snapshot, Snapshot};
pub use definition::{RawGroups, RawMetrics, RawValue};
pub use error::{ExtractError, FetchError, LookupError, SampleError, TypeLookupError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use observability::{AgentMetrics, StructuredLogger};
pub use sample::{build_samples, kubelet_specs, Entity, EntitySpec, Sample};
