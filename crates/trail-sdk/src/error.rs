use thiserror::Error;
use trail_graph::GraphError;
use trail_ledger::LedgerError;
use trail_meta::MetaError;
use trail_store::StoreError;

#[derive(Debug, Error)]
pub enum TrailError {
    #[error("mapping error: {0}")]
    Meta(#[from] MetaError),

    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// A shallow delete got something that is neither a managed object nor a global id.
    #[error("{0} is neither a managed object nor a global id")]
    NotInstanceNorId(String),

    /// An id was requested for a class of the other managed kind.
    #[error("{class} is not managed as {expected}")]
    WrongManagedKind {
        class: String,
        expected: &'static str,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type TrailResult<T> = Result<T, TrailError>;
