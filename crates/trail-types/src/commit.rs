use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::snapshot::CdoSnapshot;

/// Globally monotonic commit identifier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommitId(pub u64);

impl CommitId {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for CommitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Who committed, when, and under which id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitMetadata {
    pub id: CommitId,
    pub author: String,
    pub timestamp: DateTime<Utc>,
}

impl CommitMetadata {
    pub fn new(id: CommitId, author: impl Into<String>) -> Self {
        Self {
            id,
            author: author.into(),
            timestamp: Utc::now(),
        }
    }
}

/// An atomic, author-stamped append of snapshots.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub metadata: CommitMetadata,
    pub snapshots: Vec<CdoSnapshot>,
}

impl Commit {
    pub fn id(&self) -> CommitId {
        self.metadata.id
    }

    pub fn author(&self) -> &str {
        &self.metadata.author
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

impl fmt::Display for Commit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "commit {} by {} ({} snapshots)",
            self.metadata.id,
            self.metadata.author,
            self.snapshots.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_ids_are_ordered() {
        let first = CommitId(1);
        assert!(first < first.next());
        assert_eq!(first.next(), CommitId(2));
    }

    #[test]
    fn commit_id_serializes_as_number() {
        assert_eq!(serde_json::to_string(&CommitId(7)).unwrap(), "7");
    }

    #[test]
    fn commit_display() {
        let commit = Commit {
            metadata: CommitMetadata::new(CommitId(3), "alice"),
            snapshots: Vec::new(),
        };
        assert_eq!(commit.to_string(), "commit 3 by alice (0 snapshots)");
        assert!(commit.is_empty());
        assert_eq!(commit.author(), "alice");
    }
}
