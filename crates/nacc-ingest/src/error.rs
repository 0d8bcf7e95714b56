//! Error types for the CSV pipeline and output writers.

use std::path::PathBuf;

use thiserror::Error;

/// Failures that stop processing of a file entirely.
///
/// Problems with the content of a file are not reported here. They are
/// written to an [`ErrorWriter`](crate::ErrorWriter) as
/// [`FileError`](nacc_model::FileError) records and processing continues.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Reading the input stream failed.
    #[error("failed to read input: {0}")]
    Read(#[source] std::io::Error),

    /// Writing an output or error file failed.
    #[error("failed to write {target}: {source}")]
    Write {
        target: String,
        #[source]
        source: std::io::Error,
    },

    /// CSV output could not be encoded.
    #[error("failed to write CSV: {0}")]
    CsvWrite(#[from] csv::Error),

    /// JSON output could not be encoded.
    #[error("failed to write JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML output could not be encoded.
    #[error("failed to write YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// File could not be opened or created.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A visitor hit a failure it cannot record as a row error, such as an
    /// unreachable identifier registry.
    #[error("processing aborted: {0}")]
    Aborted(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl IngestError {
    pub fn aborted(error: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Aborted(Box::new(error))
    }
}

/// Result type for ingest operations.
pub type Result<T> = std::result::Result<T, IngestError>;
