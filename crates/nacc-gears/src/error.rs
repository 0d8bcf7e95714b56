//! Error types for the gears.

use std::path::PathBuf;

use nacc_identifiers::RepositoryError;
use nacc_ingest::IngestError;
use thiserror::Error;

/// Failures that stop a gear run.
#[derive(Debug, Error)]
pub enum GearError {
    /// Reading the input or writing output failed, or a visitor aborted.
    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// The identifier registry failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Input file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Output file could not be written.
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Field transformation definitions could not be read.
    #[error("invalid transformation file {path}: {source}")]
    Transformations {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Result type for gear operations.
pub type Result<T> = std::result::Result<T, GearError>;
