use trail_types::{CdoSnapshot, Commit, CommitId, GlobalId};

use crate::error::StoreResult;

/// Storage port for snapshots and commits.
///
/// All implementations must satisfy these invariants:
/// - `persist` is atomic per commit: every snapshot lands, or none does.
/// - A persisted snapshot's version is the latest stored version plus one
///   (or 1 for an unknown global id); anything else is rejected.
/// - `next_commit_id` never hands out the same id twice.
/// - Nothing is ever deleted; a deletion is a terminal snapshot.
pub trait SnapshotRepository: Send + Sync {
    /// Newest snapshot of `global_id`, `Ok(None)` if it was never committed.
    fn get_latest(&self, global_id: &GlobalId) -> StoreResult<Option<CdoSnapshot>>;

    /// Up to `limit` snapshots of `global_id`, newest first.
    fn get_state_history(&self, global_id: &GlobalId, limit: usize)
        -> StoreResult<Vec<CdoSnapshot>>;

    /// Append all snapshots of `commit`.
    fn persist(&self, commit: &Commit) -> StoreResult<()>;

    /// Reserve the next commit id.
    fn next_commit_id(&self) -> StoreResult<CommitId>;

    /// Every global id with at least one snapshot, in first-commit order.
    fn global_ids(&self) -> StoreResult<Vec<GlobalId>>;
}
