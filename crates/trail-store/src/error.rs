use trail_types::GlobalId;

/// Errors from snapshot repository operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A snapshot's version does not follow the latest stored one.
    #[error("version conflict for {global_id}: expected {expected}, got {actual}")]
    VersionConflict {
        global_id: GlobalId,
        expected: u64,
        actual: u64,
    },

    /// The same global id appears twice in one commit.
    #[error("duplicate snapshot for {0} in one commit")]
    DuplicateSnapshot(GlobalId),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A failed append could not be rolled back; the log refuses further writes.
    #[error("commit log unusable: {0}")]
    LogUnusable(String),

    /// A lock guarding repository state was poisoned by a panicking writer.
    #[error("repository lock poisoned")]
    LockPoisoned,
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
