use trail_graph::GraphError;
use trail_store::StoreError;
use trail_types::GlobalId;

/// Errors produced by commit log operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A shallow delete of a value object id with no history and no type.
    #[error("managed type of {0} is unknown")]
    UnknownManagedType(GlobalId),
}

/// Convenience alias for ledger results.
pub type LedgerResult<T> = Result<T, LedgerError>;
