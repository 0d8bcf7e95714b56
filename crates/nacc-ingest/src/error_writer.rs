//! Sinks for file errors found while processing an input file.
//!
//! Every writer is scoped to one container (the input file or the record
//! that holds it) and stamps that id on each error it receives.

use std::io::Write;
use std::path::Path;

use nacc_model::{ErrorType, FileError, FileErrorRecord};
use tracing::{info, warn};

use crate::error::{IngestError, Result};

/// Receives file errors in the order they are found.
pub trait ErrorWriter {
    fn write(&mut self, error: FileError);
}

/// Serialization used for an error file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorFileFormat {
    Csv,
    Json,
}

impl ErrorFileFormat {
    /// Picks the format from the file extension, defaulting to CSV.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("json") => ErrorFileFormat::Json,
            _ => ErrorFileFormat::Csv,
        }
    }
}

fn headerless_writer<W: Write>(writer: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer)
}

/// Writes errors as CSV rows with the columns of [`FileErrorRecord`].
///
/// The header row is written even when `errors` is empty. Errors keep the
/// container id they already carry.
pub fn write_errors_csv<W: Write>(writer: W, errors: &[FileError]) -> Result<()> {
    let mut stream = StreamErrorWriter::unscoped(writer);
    for error in errors {
        stream.write(error.clone());
    }
    stream.finish()?;
    Ok(())
}

/// Writes errors as a JSON array.
pub fn write_errors_json<W: Write>(mut writer: W, errors: &[FileError]) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, errors)?;
    writer.flush().map_err(|source| IngestError::Write {
        target: "error JSON".to_string(),
        source,
    })
}

/// Collects errors in memory.
#[derive(Debug, Clone, Default)]
pub struct ListErrorWriter {
    container_id: String,
    errors: Vec<FileError>,
}

impl ListErrorWriter {
    pub fn new(container_id: impl Into<String>) -> Self {
        Self {
            container_id: container_id.into(),
            errors: Vec::new(),
        }
    }

    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    pub fn errors(&self) -> &[FileError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<FileError> {
        self.errors
    }

    pub fn clear(&mut self) {
        self.errors.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of entries with type `error`.
    pub fn error_count(&self) -> usize {
        self.errors.iter().filter(|error| error.is_error()).count()
    }

    /// Number of entries with type `alert`.
    pub fn alert_count(&self) -> usize {
        self.errors.len() - self.error_count()
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        write_errors_csv(writer, &self.errors)
    }

    pub fn write_json<W: Write>(&self, writer: W) -> Result<()> {
        write_errors_json(writer, &self.errors)
    }

    /// Saves the collected errors, choosing CSV or JSON by extension.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path).map_err(|source| IngestError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let writer = std::io::BufWriter::new(file);
        match ErrorFileFormat::from_path(path) {
            ErrorFileFormat::Csv => self.write_csv(writer),
            ErrorFileFormat::Json => self.write_json(writer),
        }
    }
}

impl ErrorWriter for ListErrorWriter {
    fn write(&mut self, error: FileError) {
        self.errors.push(error.with_container(self.container_id.clone()));
    }
}

/// Streams errors as CSV rows to any writer.
///
/// The header is written with the first error, or by
/// [`StreamErrorWriter::finish`] when no error arrived. A write failure is
/// kept and returned from `finish`; later errors are dropped.
pub struct StreamErrorWriter<W: Write> {
    container_id: Option<String>,
    writer: csv::Writer<W>,
    header_written: bool,
    count: usize,
    failure: Option<csv::Error>,
}

impl<W: Write> StreamErrorWriter<W> {
    pub fn new(writer: W, container_id: impl Into<String>) -> Self {
        Self {
            container_id: Some(container_id.into()),
            ..Self::unscoped(writer)
        }
    }

    /// A writer that leaves each error's container id as it is.
    pub fn unscoped(writer: W) -> Self {
        Self {
            container_id: None,
            writer: headerless_writer(writer),
            header_written: false,
            count: 0,
            failure: None,
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    fn write_header(&mut self) -> std::result::Result<(), csv::Error> {
        if !self.header_written {
            self.writer.write_record(FileErrorRecord::FIELDS)?;
            self.header_written = true;
        }
        Ok(())
    }

    fn try_write(&mut self, error: &FileError) -> std::result::Result<(), csv::Error> {
        self.write_header()?;
        self.writer.serialize(FileErrorRecord::from(error))
    }

    /// Writes the header if needed, flushes and returns the inner writer.
    pub fn finish(mut self) -> Result<W> {
        if let Some(failure) = self.failure.take() {
            return Err(failure.into());
        }
        self.write_header()?;
        self.writer
            .into_inner()
            .map_err(|err| IngestError::Write {
                target: "error stream".to_string(),
                source: err.into_error(),
            })
    }
}

impl<W: Write> ErrorWriter for StreamErrorWriter<W> {
    fn write(&mut self, error: FileError) {
        if self.failure.is_some() {
            return;
        }
        let error = match &self.container_id {
            Some(container_id) => error.with_container(container_id.clone()),
            None => error,
        };
        match self.try_write(&error) {
            Ok(()) => self.count += 1,
            Err(failure) => self.failure = Some(failure),
        }
    }
}

/// Emits each error as a tracing event.
///
/// Values may carry participant identifiers and are only logged when
/// enabled with [`LogErrorWriter::with_values`].
#[derive(Debug, Clone, Default)]
pub struct LogErrorWriter {
    container_id: String,
    log_values: bool,
    count: usize,
}

impl LogErrorWriter {
    pub fn new(container_id: impl Into<String>) -> Self {
        Self {
            container_id: container_id.into(),
            log_values: false,
            count: 0,
        }
    }

    #[must_use]
    pub fn with_values(mut self, log_values: bool) -> Self {
        self.log_values = log_values;
        self
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

impl ErrorWriter for LogErrorWriter {
    fn write(&mut self, error: FileError) {
        self.count += 1;
        let value = match (&error.value, self.log_values) {
            (Some(value), true) => value.as_str(),
            (Some(_), false) => "[redacted]",
            (None, _) => "",
        };
        let line = error.line().unwrap_or_default();
        match error.error_type {
            ErrorType::Error => warn!(
                container = %self.container_id,
                code = %error.code,
                line,
                value,
                "{}",
                error.message
            ),
            ErrorType::Alert => info!(
                container = %self.container_id,
                code = %error.code,
                line,
                value,
                "{}",
                error.message
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nacc_model::file_error::{empty_file_error, identifier_error};

    #[test]
    fn list_writer_stamps_container() {
        let mut writer = ListErrorWriter::new("file-1");
        writer.write(empty_file_error());
        assert_eq!(writer.errors()[0].container_id.as_deref(), Some("file-1"));
        writer.clear();
        assert!(writer.is_empty());
    }

    #[test]
    fn stream_writer_writes_header_once() {
        let mut writer = StreamErrorWriter::new(Vec::new(), "file-2");
        writer.write(identifier_error("ptid", "1", 2, None));
        writer.write(identifier_error("ptid", "2", 3, None));
        assert_eq!(writer.count(), 2);
        let bytes = writer.finish().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert!(text.starts_with("type,code,location,container_id,value,expected,message\n"));
    }

    struct FullDevice;

    impl Write for FullDevice {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(
                std::io::ErrorKind::StorageFull,
                "no space left on device",
            ))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn stream_writer_without_errors_still_writes_header() {
        let text = String::from_utf8(StreamErrorWriter::unscoped(Vec::new()).finish().unwrap())
            .unwrap();
        assert_eq!(
            text,
            "type,code,location,container_id,value,expected,message\n"
        );
    }

    #[test]
    fn unscoped_stream_keeps_container() {
        let mut list = ListErrorWriter::new("visits.csv");
        list.write(identifier_error("ptid", "1", 2, None));
        let mut bytes = Vec::new();
        list.write_csv(&mut bytes).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.lines().nth(1).unwrap().contains("visits.csv"));
    }

    #[test]
    fn buffered_json_report_surfaces_flush_failure() {
        let mut list = ListErrorWriter::new("c");
        list.write(empty_file_error());
        let result = list.write_json(std::io::BufWriter::new(FullDevice));
        assert!(matches!(result, Err(IngestError::Write { .. })));
    }

    #[test]
    fn buffered_csv_report_surfaces_flush_failure() {
        let mut list = ListErrorWriter::new("c");
        list.write(empty_file_error());
        assert!(list.write_csv(std::io::BufWriter::new(FullDevice)).is_err());
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(
            ErrorFileFormat::from_path(Path::new("errors.JSON")),
            ErrorFileFormat::Json
        );
        assert_eq!(
            ErrorFileFormat::from_path(Path::new("errors.csv")),
            ErrorFileFormat::Csv
        );
        assert_eq!(
            ErrorFileFormat::from_path(Path::new("errors")),
            ErrorFileFormat::Csv
        );
    }
}
