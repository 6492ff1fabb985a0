use tracing::debug;
use trail_store::SnapshotRepository;
use trail_types::{CdoSnapshot, CommitMetadata, GlobalId, ManagedType, SnapshotKind, SnapshotState};

use crate::builder::{ObjectGraph, ObjectNode};
use crate::error::GraphResult;

/// Projects graph nodes into versioned snapshots.
///
/// Versions continue from the latest snapshot the repository holds for each
/// global id. Every node of the graph is snapshotted, changed or not.
pub struct Snapshotter<'a> {
    repository: &'a dyn SnapshotRepository,
}

impl<'a> Snapshotter<'a> {
    pub fn new(repository: &'a dyn SnapshotRepository) -> Self {
        Self { repository }
    }

    /// One snapshot per node, in graph order.
    pub fn snapshots(
        &self,
        graph: &ObjectGraph,
        commit: &CommitMetadata,
    ) -> GraphResult<Vec<CdoSnapshot>> {
        let snapshots = graph
            .nodes()
            .iter()
            .map(|node| self.snapshot(node, commit))
            .collect::<GraphResult<Vec<_>>>()?;
        debug!(commit = %commit.id, snapshots = snapshots.len(), "took graph snapshots");
        Ok(snapshots)
    }

    fn snapshot(&self, node: &ObjectNode, commit: &CommitMetadata) -> GraphResult<CdoSnapshot> {
        let (version, kind) = match self.repository.get_latest(&node.global_id)? {
            Some(prior) => (prior.version + 1, SnapshotKind::Update),
            None => (1, SnapshotKind::Initial),
        };
        Ok(CdoSnapshot {
            global_id: node.global_id.clone(),
            managed_type: node.managed_type.clone(),
            version,
            kind,
            commit: commit.clone(),
            state: node.state.clone(),
        })
    }

    /// A terminal snapshot marking `global_id` as deleted.
    ///
    /// The managed type of an id with history is taken from its latest
    /// snapshot; `fallback` is used for ids never committed before.
    pub fn terminal(
        &self,
        global_id: &GlobalId,
        fallback: ManagedType,
        commit: &CommitMetadata,
    ) -> GraphResult<CdoSnapshot> {
        let (version, managed_type) = match self.repository.get_latest(global_id)? {
            Some(prior) => (prior.version + 1, prior.managed_type),
            None => (1, fallback),
        };
        Ok(CdoSnapshot {
            global_id: global_id.clone(),
            managed_type,
            version,
            kind: SnapshotKind::Terminal,
            commit: commit.clone(),
            state: SnapshotState::new(),
        })
    }
}

impl std::fmt::Debug for Snapshotter<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snapshotter").finish_non_exhaustive()
    }
}
