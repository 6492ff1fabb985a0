//! Snapshot storage for Trail.
//!
//! The [`SnapshotRepository`] trait is the storage port used by the commit
//! log. Two implementations ship with the crate:
//!
//! - [`InMemoryRepository`] - `RwLock`-guarded histories for tests and embedding
//! - [`JsonFileRepository`] - append-only, CRC-framed commit log on disk

pub mod error;
pub mod file;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use file::JsonFileRepository;
pub use memory::InMemoryRepository;
pub use traits::SnapshotRepository;
