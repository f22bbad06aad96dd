//! Error types for fetching, grouping and identifying kubelet entities

/// Errors raised while fetching and decoding a stats summary.
///
/// Any of these is fatal for the snapshot cycle that produced it.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The request could not be sent
    #[error("error calling kubelet endpoint: {0}")]
    Transport(#[source] reqwest::Error),

    /// The kubelet answered with something other than 200 OK
    #[error("error calling kubelet endpoint. Got status code: {0}")]
    Status(u16),

    /// The response body could not be read to the end
    #[error("error reading the response body of kubelet endpoint: {0}")]
    Read(#[source] reqwest::Error),

    /// The body is not a valid stats summary
    #[error("error unmarshaling the response body: {0}")]
    Decode(#[from] serde_json::Error),

    /// The configured endpoint or request path is not a valid URL
    #[error("invalid kubelet URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The bearer token file could not be read
    #[error("failed to read bearer token from {path}: {source}")]
    Token {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that skip one entity (or one subtree) of a snapshot
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    #[error("empty node identifier, possible data error in /stats/summary response")]
    EmptyNodeName,

    #[error("empty pod identifier, possible data error in /stats/summary response")]
    EmptyPodIdentifier,

    #[error("empty container identifier, possible data error in /stats/summary response")]
    EmptyContainerName,

    #[error("pods data not found, possible data error in /stats/summary response")]
    MissingPods,

    #[error("containers data not found for pod {pod:?}, possible data error in /stats/summary response")]
    MissingContainers { pod: String },
}

/// Errors raised while deriving entity identifiers and types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("{group:?} not found")]
    GroupNotFound { group: String },

    #[error("no entityID {entity:?} found for {group:?}")]
    EntityNotFound { entity: String, group: String },

    #[error("{key:?} not found for {group:?}")]
    FieldNotFound { key: String, group: String },

    #[error("incorrect type of {key:?} for {group:?}")]
    IncorrectType { key: String, group: String },

    #[error("generated entity ID is empty for {raw_entity_id:?}")]
    EmptyEntityId { raw_entity_id: String },
}

/// An entity type lookup failure that still carries a usable type.
///
/// `fallback` is built from the caller's default value; the caller decides
/// whether to report it or drop the entity.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{source} (using entity type {fallback:?})")]
pub struct TypeLookupError {
    pub fallback: String,
    #[source]
    pub source: LookupError,
}

/// Errors raised while turning grouped entities into samples
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SampleError {
    /// No usable identifier; the entity was dropped
    #[error("skipping {group} entity {raw_entity_id:?}: {source}")]
    EntityId {
        group: String,
        raw_entity_id: String,
        #[source]
        source: LookupError,
    },

    /// The entity was kept with its fallback type
    #[error("{group} entity {raw_entity_id:?}: {source}")]
    EntityType {
        group: String,
        raw_entity_id: String,
        #[source]
        source: TypeLookupError,
    },
}

/// Convenience alias for fetch results
pub type FetchResult<T> = std::result::Result<T, FetchError>;
