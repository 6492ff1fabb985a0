//! Diff engine for Trail.
//!
//! Compares snapshot sets and produces structured change sets: object
//! appearance and removal, value and reference changes, and element-level
//! changes of lists, sets and maps.
//!
//! # Key Types
//!
//! - [`Differ`] / [`SnapshotSet`] - Snapshot set comparison
//! - [`Diff`] / [`Change`] / [`ChangeKind`] - The resulting change set
//! - [`ElementChange`] / [`EntryChange`] - List and map element changes
//! - [`diff_lists`] / [`apply_list_changes`] - LCS edit scripts over lists

pub mod change;
pub mod differ;
pub mod error;
pub mod list_diff;

pub use change::{Change, ChangeKind, Diff, ElementChange, EntryChange};
pub use differ::{Differ, SnapshotSet};
pub use error::{DiffError, DiffResult};
pub use list_diff::{apply_list_changes, diff_lists};
