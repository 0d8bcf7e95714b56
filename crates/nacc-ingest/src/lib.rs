//! CSV ingestion for the NACC gears.
//!
//! Input files are streamed row by row through a [`CsvVisitor`]. Problems with
//! the file or its rows are not raised as Rust errors; they are recorded as
//! [`FileError`](nacc_model::FileError) values through an [`ErrorWriter`] so a
//! single pass reports every bad row.
//!
//! # Example
//!
//! ```ignore
//! use nacc_ingest::{ListErrorWriter, read_csv};
//!
//! let mut errors = ListErrorWriter::new("input.csv");
//! let ok = read_csv(file, &mut errors, &mut visitor)?;
//! ```

mod error;
mod error_writer;
mod output;
mod reader;
mod visitor;

// === Error Types ===
pub use error::{IngestError, Result};

// === Error Writers ===
pub use error_writer::{
    ErrorFileFormat, ErrorWriter, ListErrorWriter, LogErrorWriter, StreamErrorWriter,
    write_errors_csv, write_errors_json,
};

// === Pipeline ===
pub use reader::{CsvPipeline, PipelineStats, normalize_header, read_csv};
pub use visitor::{
    AggregateRowValidator, CsvRow, CsvVisitor, NonEmptyFieldsValidator, RowValidator, field,
    require_columns,
};

// === Output ===
pub use output::{CsvWriter, write_json_list, write_yaml_list};
