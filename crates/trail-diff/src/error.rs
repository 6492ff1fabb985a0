//! Error types for the diff crate.

/// Errors that can occur while applying changes.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    /// An element change points outside the list it is applied to.
    #[error("element change at index {index} does not fit a list of length {len}")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Convenience alias for diff results.
pub type DiffResult<T> = Result<T, DiffError>;
