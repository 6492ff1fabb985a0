//! Object graph traversal and snapshotting.
//!
//! [`ObjectGraphBuilder`] flattens a live graph into an [`ObjectGraph`] of
//! entities and value objects keyed by global id; [`Snapshotter`] turns the
//! graph into versioned snapshots ready to be committed.

pub mod builder;
pub mod error;
pub mod snapshotter;

pub use builder::{Edge, ObjectGraph, ObjectGraphBuilder, ObjectNode, DEFAULT_DOT_REPLACEMENT};
pub use error::{GraphError, GraphResult};
pub use snapshotter::Snapshotter;
