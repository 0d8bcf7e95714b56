//! Error types for the form scheduler.

use std::path::PathBuf;

use nacc_model::ModuleName;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The queue needs at least one module to rotate over.
    #[error("module order must name at least one module")]
    EmptyModuleOrder,

    /// A module appears more than once in the module order.
    #[error("module {0} appears more than once in the module order")]
    DuplicateModule(ModuleName),

    /// Project directory or file could not be read or written.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Tag manifest could not be parsed or written.
    #[error("invalid tag manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// File is not part of the project.
    #[error("file {0} not found in project")]
    FileNotFound(String),

    /// No validation schema for the module of a queued file.
    #[error("missing validation schema for module {0}")]
    MissingSchema(ModuleName),

    /// The submission pipeline rejected a file.
    #[error("submission of {file} failed: {message}")]
    Submission { file: String, message: String },
}

/// Result type for scheduler operations.
pub type Result<T> = std::result::Result<T, SchedulerError>;
