use std::sync::Arc;

use tracing::{debug, info};
use trail_diff::{Change, ChangeKind, Differ};
use trail_graph::{ObjectGraph, Snapshotter};
use trail_store::SnapshotRepository;
use trail_types::{CdoSnapshot, Commit, CommitMetadata, GlobalId, ManagedType};

use crate::error::{LedgerError, LedgerResult};

/// Append-only log of commits over a snapshot repository.
///
/// Commits are stamped with the repository's next commit id and persisted in
/// one call, so a commit lands entirely or not at all.
pub struct CommitLog {
    repository: Arc<dyn SnapshotRepository>,
    differ: Differ,
}

impl CommitLog {
    pub fn new(repository: Arc<dyn SnapshotRepository>) -> Self {
        Self {
            repository,
            differ: Differ::new(),
        }
    }

    /// Differ used to compute change histories.
    pub fn with_differ(mut self, differ: Differ) -> Self {
        self.differ = differ;
        self
    }

    pub fn repository(&self) -> &Arc<dyn SnapshotRepository> {
        &self.repository
    }

    /// Snapshot every node of `graph` and persist them as one commit.
    pub fn commit(&self, author: &str, graph: &ObjectGraph) -> LedgerResult<Commit> {
        let metadata = CommitMetadata::new(self.repository.next_commit_id()?, author);
        let snapshots = Snapshotter::new(self.repository.as_ref()).snapshots(graph, &metadata)?;
        let commit = Commit {
            metadata,
            snapshots,
        };
        self.repository.persist(&commit)?;
        info!(
            commit = %commit.id(),
            author,
            root = %graph.root().global_id,
            snapshots = commit.snapshots.len(),
            "committed object graph"
        );
        Ok(commit)
    }

    /// Persist a single terminal snapshot for `global_id`.
    ///
    /// The type recorded is the one of the latest snapshot, else
    /// `managed_type`, else the one implied by an instance or unbounded id.
    pub fn commit_shallow_delete(
        &self,
        author: &str,
        global_id: &GlobalId,
        managed_type: Option<ManagedType>,
    ) -> LedgerResult<Commit> {
        let managed_type = match (self.repository.get_latest(global_id)?, managed_type) {
            (Some(prior), _) => prior.managed_type,
            (None, Some(managed_type)) => managed_type,
            (None, None) => implied_type(global_id)
                .ok_or_else(|| LedgerError::UnknownManagedType(global_id.clone()))?,
        };

        let metadata = CommitMetadata::new(self.repository.next_commit_id()?, author);
        let terminal =
            Snapshotter::new(self.repository.as_ref()).terminal(global_id, managed_type, &metadata)?;
        let commit = Commit {
            metadata,
            snapshots: vec![terminal],
        };
        self.repository.persist(&commit)?;
        info!(commit = %commit.id(), author, %global_id, "committed shallow delete");
        Ok(commit)
    }

    /// Up to `limit` snapshots of `global_id`, newest first.
    pub fn get_state_history(
        &self,
        global_id: &GlobalId,
        limit: usize,
    ) -> LedgerResult<Vec<CdoSnapshot>> {
        Ok(self.repository.get_state_history(global_id, limit)?)
    }

    pub fn get_latest_snapshot(&self, global_id: &GlobalId) -> LedgerResult<Option<CdoSnapshot>> {
        Ok(self.repository.get_latest(global_id)?)
    }

    /// Changes between consecutive snapshots of `global_id`, newest first.
    ///
    /// Looks at the latest `limit + 1` snapshots. A history made of a single
    /// terminal snapshot yields one `ObjectRemoved`.
    pub fn get_change_history(&self, global_id: &GlobalId, limit: usize) -> LedgerResult<Vec<Change>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let history = self
            .repository
            .get_state_history(global_id, limit.saturating_add(1))?;
        let changes: Vec<Change> = match history.as_slice() {
            [] => Vec::new(),
            [only] if only.is_terminal() => vec![Change::new(
                only.global_id.clone(),
                ChangeKind::ObjectRemoved,
            )
            .with_commit(only.commit.clone())],
            [_] => Vec::new(),
            _ => history
                .windows(2)
                .flat_map(|pair| self.differ.compare_snapshots(&pair[1], &pair[0]))
                .collect(),
        };
        debug!(%global_id, snapshots = history.len(), changes = changes.len(), "built change history");
        Ok(changes)
    }
}

/// Managed type implied by the shape of an id with no history.
fn implied_type(global_id: &GlobalId) -> Option<ManagedType> {
    match global_id {
        GlobalId::Instance { type_name, .. } => Some(ManagedType::entity(type_name.as_str())),
        GlobalId::UnboundedValueObject { type_name } => {
            Some(ManagedType::value_object(type_name.as_str()))
        }
        GlobalId::ValueObject { .. } => None,
    }
}

impl std::fmt::Debug for CommitLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitLog")
            .field("differ", &self.differ)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use trail_graph::ObjectGraphBuilder;
    use trail_meta::{ClassDef, Inspect, ManagedClassRegistry, PropertyScanner, TypeMapper};
    use trail_store::InMemoryRepository;
    use trail_types::{PropertyValue, SnapshotKind};

    pub(crate) struct Person {
        pub id: String,
        pub name: String,
    }

    impl Inspect for Person {
        fn describe() -> Option<ClassDef> {
            Some(
                ClassDef::of::<Self>("Person")
                    .id_field("id", |p: &Person| &p.id)
                    .field("name", |p: &Person| &p.name)
                    .build(),
            )
        }
    }

    pub(crate) fn graph(name: &str) -> ObjectGraph {
        let registry = ManagedClassRegistry::new(TypeMapper::new(), PropertyScanner::default());
        ObjectGraphBuilder::new(&registry)
            .build(&Person {
                id: "bob".into(),
                name: name.into(),
            })
            .unwrap()
    }

    pub(crate) fn bob() -> GlobalId {
        GlobalId::instance("Person", "bob")
    }

    fn log() -> CommitLog {
        CommitLog::new(Arc::new(InMemoryRepository::new()))
    }

    #[test]
    fn commits_are_numbered_and_versioned() {
        let log = log();
        let first = log.commit("alice", &graph("Bob")).unwrap();
        let second = log.commit("alice", &graph("Robert")).unwrap();
        assert!(second.id() > first.id());
        assert_eq!(first.snapshots[0].version, 1);
        assert_eq!(second.snapshots[0].version, 2);
        assert_eq!(second.author(), "alice");
    }

    #[test]
    fn history_after_shallow_delete() {
        let log = log();
        log.commit("alice", &graph("Bob")).unwrap();
        log.commit("alice", &graph("Robert")).unwrap();
        log.commit_shallow_delete("alice", &bob(), None).unwrap();

        let history = log.get_state_history(&bob(), 10).unwrap();
        assert_eq!(history.iter().map(|s| s.version).collect::<Vec<_>>(), vec![3, 2, 1]);
        assert_eq!(history[0].kind, SnapshotKind::Terminal);
        assert_eq!(history[0].managed_type, ManagedType::entity("Person"));

        let changes = log.get_change_history(&bob(), 10).unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].kind, ChangeKind::ObjectRemoved);
        assert_eq!(
            changes[1].kind,
            ChangeKind::ValueChange {
                property: "name".into(),
                left: PropertyValue::from("Bob"),
                right: PropertyValue::from("Robert"),
            }
        );
        assert_eq!(changes[1].commit.as_ref().map(|c| c.id), Some(history[1].commit.id));
    }

    #[test]
    fn change_history_matches_pairwise_state_history() {
        let log = log();
        for name in ["a", "b", "c", "d"] {
            log.commit("alice", &graph(name)).unwrap();
        }
        let changes = log.get_change_history(&bob(), 2).unwrap();
        let states = log.get_state_history(&bob(), 3).unwrap();
        let expected: Vec<Change> = states
            .windows(2)
            .flat_map(|pair| Differ::new().compare_snapshots(&pair[1], &pair[0]))
            .collect();
        assert_eq!(changes, expected);
        assert_eq!(changes.len(), 2);
    }

    #[test]
    fn shallow_delete_of_unknown_id() {
        let log = log();
        let ghost = GlobalId::instance("Person", "ghost");
        let commit = log.commit_shallow_delete("alice", &ghost, None).unwrap();
        assert_eq!(commit.snapshots[0].version, 1);
        assert!(log.get_latest_snapshot(&ghost).unwrap().unwrap().is_terminal());

        let changes = log.get_change_history(&ghost, 5).unwrap();
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].kind, ChangeKind::ObjectRemoved);
    }

    #[test]
    fn unknown_value_object_needs_a_type() {
        let log = log();
        let address = GlobalId::value_object(bob(), trail_types::FragmentPath::new("address"));
        let err = log.commit_shallow_delete("alice", &address, None).unwrap_err();
        assert!(matches!(err, LedgerError::UnknownManagedType(_)));
        assert!(log
            .commit_shallow_delete("alice", &address, Some(ManagedType::value_object("Address")))
            .is_ok());
    }

    #[test]
    fn short_histories_have_no_changes() {
        let log = log();
        assert!(log.get_change_history(&bob(), 10).unwrap().is_empty());
        log.commit("alice", &graph("Bob")).unwrap();
        assert!(log.get_change_history(&bob(), 10).unwrap().is_empty());
        assert!(log.get_change_history(&bob(), 0).unwrap().is_empty());
    }
}
