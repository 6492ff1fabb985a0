//! Error types for graph building and snapshotting.

use trail_meta::MetaError;
use trail_store::StoreError;

/// Errors that can occur while walking a graph or taking snapshots.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Type mapping or class description failure.
    #[error(transparent)]
    Meta(#[from] MetaError),

    /// The storage port failed while looking up prior versions.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The root object is not an entity or a value object.
    #[error("root object of type {type_name} is not a managed class")]
    RootNotManaged { type_name: String },

    /// An entity's id property is null or empty.
    #[error("id of {class} instance is null")]
    EntityIdIsNull { class: String },

    /// An entity's id is of a type that cannot identify it.
    #[error("unsupported id of {class}: {reason}")]
    UnsupportedId { class: String, reason: String },

    /// A map key is not a primitive or a registered value.
    #[error("unsupported key in map property {class}.{property}")]
    UnsupportedMapKey { class: String, property: String },
}

/// Convenience alias for graph results.
pub type GraphResult<T> = Result<T, GraphError>;
