use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use tracing::debug;
use trail_types::{CdoSnapshot, Commit, CommitId, GlobalId};

use crate::error::{StoreError, StoreResult};
use crate::traits::SnapshotRepository;

/// Per-id snapshot histories, oldest first.
#[derive(Debug, Default)]
pub(crate) struct SnapshotIndex {
    histories: HashMap<GlobalId, Vec<CdoSnapshot>>,
    order: Vec<GlobalId>,
    last_commit: Option<CommitId>,
}

impl SnapshotIndex {
    pub(crate) fn latest(&self, global_id: &GlobalId) -> Option<&CdoSnapshot> {
        self.histories.get(global_id).and_then(|h| h.last())
    }

    pub(crate) fn history(&self, global_id: &GlobalId, limit: usize) -> Vec<CdoSnapshot> {
        self.histories
            .get(global_id)
            .map(|h| h.iter().rev().take(limit).cloned().collect())
            .unwrap_or_default()
    }

    pub(crate) fn global_ids(&self) -> Vec<GlobalId> {
        self.order.clone()
    }

    pub(crate) fn last_commit(&self) -> Option<CommitId> {
        self.last_commit
    }

    /// Check every snapshot of `commit` against the stored versions.
    pub(crate) fn validate(&self, commit: &Commit) -> StoreResult<()> {
        let mut seen = HashSet::new();
        for snapshot in &commit.snapshots {
            if !seen.insert(&snapshot.global_id) {
                return Err(StoreError::DuplicateSnapshot(snapshot.global_id.clone()));
            }
            let expected = self
                .latest(&snapshot.global_id)
                .map_or(1, |latest| latest.version + 1);
            if snapshot.version != expected {
                return Err(StoreError::VersionConflict {
                    global_id: snapshot.global_id.clone(),
                    expected,
                    actual: snapshot.version,
                });
            }
        }
        Ok(())
    }

    /// Append a validated commit.
    pub(crate) fn apply(&mut self, commit: &Commit) {
        for snapshot in &commit.snapshots {
            let history = self
                .histories
                .entry(snapshot.global_id.clone())
                .or_insert_with(|| {
                    self.order.push(snapshot.global_id.clone());
                    Vec::new()
                });
            history.push(snapshot.clone());
        }
        self.last_commit = self.last_commit.max(Some(commit.id()));
    }
}

/// In-memory snapshot repository.
///
/// Intended for tests and embedding. Histories are held behind a `RwLock`;
/// `persist` validates the whole commit before applying any of it.
pub struct InMemoryRepository {
    index: RwLock<SnapshotIndex>,
    next_commit: AtomicU64,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self {
            index: RwLock::new(SnapshotIndex::default()),
            next_commit: AtomicU64::new(1),
        }
    }

    /// Number of global ids with at least one snapshot.
    pub fn len(&self) -> usize {
        self.index.read().map(|i| i.order.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotRepository for InMemoryRepository {
    fn get_latest(&self, global_id: &GlobalId) -> StoreResult<Option<CdoSnapshot>> {
        let index = self.index.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(index.latest(global_id).cloned())
    }

    fn get_state_history(
        &self,
        global_id: &GlobalId,
        limit: usize,
    ) -> StoreResult<Vec<CdoSnapshot>> {
        let index = self.index.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(index.history(global_id, limit))
    }

    fn persist(&self, commit: &Commit) -> StoreResult<()> {
        let mut index = self.index.write().map_err(|_| StoreError::LockPoisoned)?;
        index.validate(commit)?;
        index.apply(commit);
        debug!(
            commit = %commit.id(),
            snapshots = commit.snapshots.len(),
            "persisted commit in memory"
        );
        Ok(())
    }

    fn next_commit_id(&self) -> StoreResult<CommitId> {
        Ok(CommitId(self.next_commit.fetch_add(1, Ordering::SeqCst)))
    }

    fn global_ids(&self) -> StoreResult<Vec<GlobalId>> {
        let index = self.index.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(index.global_ids())
    }
}

impl std::fmt::Debug for InMemoryRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryRepository")
            .field("global_ids", &self.len())
            .finish()
    }
}
