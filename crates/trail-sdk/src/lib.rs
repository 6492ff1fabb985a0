//! High-level API for Trail.
//!
//! [`Trail`] is the main entry point for applications: it compares object
//! graphs, commits their snapshots to a storage port and answers history
//! queries for a single global id.

pub mod config;
pub mod error;
pub mod id;
pub mod json;
pub mod trail;

pub use config::TrailConfig;
pub use error::{TrailError, TrailResult};
pub use id::IdBuilder;
pub use json::JsonConverter;
pub use trail::{Trail, TrailBuilder};

// Re-export key types
pub use trail_changelog::{ChangeProcessor, SimpleTextChangeLog};
pub use trail_diff::{Change, ChangeKind, Diff, ElementChange, EntryChange};
pub use trail_ledger::ValidationReport;
pub use trail_meta::{ClassDef, Inspect, Live, MappingStyle, TypeRef};
pub use trail_store::{InMemoryRepository, JsonFileRepository, SnapshotRepository};
pub use trail_types::{CdoSnapshot, Commit, CommitId, GlobalId, PropertyValue, SnapshotKind};
