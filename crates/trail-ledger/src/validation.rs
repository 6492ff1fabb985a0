use serde::Serialize;
use trail_store::SnapshotRepository;
use trail_types::{CdoSnapshot, CommitId, GlobalId, SnapshotKind};

use crate::error::LedgerResult;

/// Result of history validation for one global id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub global_id: GlobalId,
    pub snapshot_count: u64,
    pub versions_contiguous: bool,
    pub commits_ordered: bool,
    pub terminals_empty: bool,
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    /// Returns `true` if all checks passed.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }
}

/// A specific integrity violation detected during validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub version: u64,
    pub kind: ViolationKind,
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum ViolationKind {
    VersionGap,
    CommitOrder,
    NonEmptyTerminal,
    KindMismatch,
    ForeignSnapshot,
}

/// Snapshot history validator.
pub struct HistoryValidator;

impl HistoryValidator {
    /// Validate the stored history of one global id.
    pub fn validate_history(
        repository: &dyn SnapshotRepository,
        global_id: &GlobalId,
    ) -> LedgerResult<ValidationReport> {
        let mut history = repository.get_state_history(global_id, usize::MAX)?;
        history.reverse();
        Ok(Self::validate_snapshots(global_id, &history))
    }

    /// Validate a history given oldest first.
    pub fn validate_snapshots(global_id: &GlobalId, snapshots: &[CdoSnapshot]) -> ValidationReport {
        let mut violations = Vec::new();
        let mut versions_contiguous = true;
        let mut commits_ordered = true;
        let mut terminals_empty = true;
        let mut previous_commit: Option<CommitId> = None;

        for (index, snapshot) in snapshots.iter().enumerate() {
            let version = snapshot.version;
            if &snapshot.global_id != global_id {
                violations.push(Violation {
                    version,
                    kind: ViolationKind::ForeignSnapshot,
                    description: format!("snapshot belongs to {}", snapshot.global_id),
                });
            }

            let expected_version = (index + 1) as u64;
            if version != expected_version {
                versions_contiguous = false;
                violations.push(Violation {
                    version,
                    kind: ViolationKind::VersionGap,
                    description: format!("expected version {expected_version}, got {version}"),
                });
            }

            let commit = snapshot.commit.id;
            if let Some(previous) = previous_commit.filter(|prev| commit <= *prev) {
                commits_ordered = false;
                violations.push(Violation {
                    version,
                    kind: ViolationKind::CommitOrder,
                    description: format!("commit {commit} does not follow commit {previous}"),
                });
            }
            previous_commit = Some(commit);

            if snapshot.is_terminal() && !snapshot.state.is_empty() {
                terminals_empty = false;
                violations.push(Violation {
                    version,
                    kind: ViolationKind::NonEmptyTerminal,
                    description: format!("terminal snapshot has {} properties", snapshot.state.len()),
                });
            }

            let kind_ok = match snapshot.kind {
                SnapshotKind::Initial => version == 1,
                SnapshotKind::Update => version > 1,
                SnapshotKind::Terminal => true,
            };
            if !kind_ok {
                violations.push(Violation {
                    version,
                    kind: ViolationKind::KindMismatch,
                    description: format!("{} snapshot at version {version}", snapshot.kind),
                });
            }
        }

        ValidationReport {
            global_id: global_id.clone(),
            snapshot_count: snapshots.len() as u64,
            versions_contiguous,
            commits_ordered,
            terminals_empty,
            violations,
        }
    }

    /// Validate every global id in the repository.
    pub fn validate_all(repository: &dyn SnapshotRepository) -> LedgerResult<Vec<ValidationReport>> {
        let global_ids = repository.global_ids()?;
        let mut reports = Vec::new();
        for global_id in &global_ids {
            reports.push(Self::validate_history(repository, global_id)?);
        }
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use trail_store::InMemoryRepository;
    use trail_types::{CommitMetadata, ManagedType, PropertyValue, SnapshotState};

    use super::*;
    use crate::commit_log::tests::{bob, graph};
    use crate::commit_log::CommitLog;

    fn snapshot(version: u64, commit: u64, kind: SnapshotKind) -> CdoSnapshot {
        CdoSnapshot {
            global_id: bob(),
            managed_type: ManagedType::entity("Person"),
            version,
            kind,
            commit: CommitMetadata::new(CommitId(commit), "tester"),
            state: SnapshotState::new(),
        }
    }

    #[test]
    fn committed_history_is_valid() {
        let repo = Arc::new(InMemoryRepository::new());
        let log = CommitLog::new(repo.clone());
        log.commit("alice", &graph("Bob")).unwrap();
        log.commit("alice", &graph("Robert")).unwrap();
        log.commit_shallow_delete("alice", &bob(), None).unwrap();

        let report = HistoryValidator::validate_history(repo.as_ref(), &bob()).unwrap();
        assert!(report.is_valid());
        assert_eq!(report.snapshot_count, 3);
    }

    #[test]
    fn gaps_and_disorder_are_reported() {
        let snapshots = vec![
            snapshot(1, 5, SnapshotKind::Initial),
            snapshot(3, 4, SnapshotKind::Update),
        ];
        let report = HistoryValidator::validate_snapshots(&bob(), &snapshots);
        assert!(!report.is_valid());
        assert!(!report.versions_contiguous);
        assert!(!report.commits_ordered);
        let kinds: Vec<_> = report.violations.iter().map(|v| v.kind).collect();
        assert_eq!(kinds, vec![ViolationKind::VersionGap, ViolationKind::CommitOrder]);
    }

    #[test]
    fn terminal_with_state_is_reported() {
        let mut terminal = snapshot(2, 2, SnapshotKind::Terminal);
        terminal.state.insert("name", PropertyValue::from("Bob"));
        let snapshots = vec![snapshot(1, 1, SnapshotKind::Initial), terminal];
        let report = HistoryValidator::validate_snapshots(&bob(), &snapshots);
        assert!(!report.terminals_empty);
        assert_eq!(report.violations[0].kind, ViolationKind::NonEmptyTerminal);
    }

    #[test]
    fn update_at_version_one_is_a_kind_mismatch() {
        let report =
            HistoryValidator::validate_snapshots(&bob(), &[snapshot(1, 1, SnapshotKind::Update)]);
        assert_eq!(report.violations[0].kind, ViolationKind::KindMismatch);
    }

    #[test]
    fn validate_all_checks_every_id() {
        let repo = Arc::new(InMemoryRepository::new());
        let log = CommitLog::new(repo.clone());
        log.commit("alice", &graph("Bob")).unwrap();
        log.commit_shallow_delete("alice", &GlobalId::instance("Person", "ghost"), None)
            .unwrap();

        let reports = HistoryValidator::validate_all(repo.as_ref()).unwrap();
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(ValidationReport::is_valid));
    }

    #[test]
    fn empty_history_is_valid() {
        let repo = InMemoryRepository::new();
        let report = HistoryValidator::validate_history(&repo, &bob()).unwrap();
        assert!(report.is_valid());
        assert_eq!(report.snapshot_count, 0);
    }
}
