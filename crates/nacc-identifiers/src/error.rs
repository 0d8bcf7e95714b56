//! Error types for identifier registry operations.

use std::path::PathBuf;

use nacc_model::{Guid, ModelError, Naccid};
use thiserror::Error;

use crate::IdentifierQuery;

/// Errors raised by an [`IdentifierRepository`](crate::IdentifierRepository).
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// No record matched the query.
    #[error("no identifier matches {0}")]
    NoMatchingIdentifier(IdentifierQuery),

    /// GUID is already assigned to a different participant.
    #[error("GUID {guid} is already assigned to {naccid}")]
    Conflict { guid: Guid, naccid: Naccid },

    /// Every six digit NACCID has been allocated.
    #[error("NACCID space exhausted")]
    Exhausted,

    /// Database could not be opened.
    #[error("failed to open identifier database {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Storage rejected or failed an operation.
    #[error("identifier storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// Stored value does not parse as a model type.
    #[error("corrupt identifier record: {0}")]
    Corrupt(#[from] ModelError),

    /// Registry lock was poisoned by a panicking thread.
    #[error("identifier registry lock poisoned")]
    LockPoisoned,
}

/// Result type for registry operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;
