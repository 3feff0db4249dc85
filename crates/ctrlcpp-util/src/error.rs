//! Core error types for ctrlcpp-util.
//!
//! These cover truly exceptional conditions — caller misuse and internal
//! invariant violations — not ordinary preprocessing failures. A malformed
//! `#if` or a missing header is not an `Err`; it is an [`crate::diagnostics::Output`]
//! pushed onto the [`crate::diagnostics::Diagnostics`] sink.

use thiserror::Error;

/// Error type for the typed-index arena ([`crate::index_vec::IndexVec`]).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IndexVecError {
    /// Index out of bounds
    #[error("index out of bounds: index {index}, length {length}")]
    OutOfBounds { index: usize, length: usize },
}

/// Error type for the file registry ([`crate::location::FileRegistry`]).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FileRegistryError {
    /// Asked to resolve a `FileId` that was never issued by this registry.
    #[error("unknown file id: {0}")]
    UnknownFileId(u32),
}

/// Result type alias for index vector operations
pub type IndexVecResult<T> = std::result::Result<T, IndexVecError>;

/// Result type alias for file registry operations
pub type FileRegistryResult<T> = std::result::Result<T, FileRegistryError>;
