//! Commit log for Trail.
//!
//! This crate provides:
//! - `CommitLog`: commits of object graphs and shallow deletes over a
//!   `SnapshotRepository`
//! - State history and change history queries for a single global id
//! - History validation (version sequence, commit order, terminal state)

pub mod commit_log;
pub mod error;
pub mod validation;

pub use commit_log::CommitLog;
pub use error::{LedgerError, LedgerResult};
pub use validation::{HistoryValidator, ValidationReport, Violation, ViolationKind};
