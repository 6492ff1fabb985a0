//! Foundation types for Trail.
//!
//! This crate provides the identity and record types shared by every other
//! Trail crate: how a node of an object graph is named, how its properties
//! are captured, and how captured states are grouped into commits.
//!
//! # Key Types
//!
//! - [`GlobalId`] - Stable identifier of an entity or value object
//! - [`FragmentPath`] - Location of a value object inside its owner
//! - [`PropertyValue`] - Captured property value (scalar, reference, container)
//! - [`CdoSnapshot`] - Immutable per-object state at one commit
//! - [`Commit`] - Author-stamped atomic group of snapshots

pub mod commit;
pub mod error;
pub mod global_id;
pub mod path;
pub mod snapshot;
pub mod value;

pub use commit::{Commit, CommitId, CommitMetadata};
pub use error::TypeError;
pub use global_id::GlobalId;
pub use path::FragmentPath;
pub use snapshot::{CdoSnapshot, ManagedKind, ManagedType, SnapshotKind, SnapshotState};
pub use value::{canonical_key, PropertyValue};
