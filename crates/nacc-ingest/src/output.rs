//! Writers for transformed records.

use std::io::Write;

use serde::Serialize;

use crate::CsvRow;
use crate::error::{IngestError, Result};

/// Writes rows as CSV with a fixed column list.
///
/// The header is written with the first row. Row fields outside the column
/// list are dropped and missing fields are written empty.
pub struct CsvWriter<W: Write> {
    writer: csv::Writer<W>,
    columns: Vec<String>,
    header_written: bool,
    rows: usize,
}

impl<W: Write> CsvWriter<W> {
    pub fn new<I, S>(writer: W, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            writer: csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(writer),
            columns: columns.into_iter().map(Into::into).collect(),
            header_written: false,
            rows: 0,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Replaces the column list. Ignored once the header has been written.
    pub fn set_columns(&mut self, columns: Vec<String>) {
        if !self.header_written {
            self.columns = columns;
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn write_row(&mut self, row: &CsvRow) -> Result<()> {
        if !self.header_written {
            self.writer.write_record(&self.columns)?;
            self.header_written = true;
        }
        let values = self
            .columns
            .iter()
            .map(|column| row.get(column).map_or("", String::as_str));
        self.writer.write_record(values)?;
        self.rows += 1;
        Ok(())
    }

    /// Flushes and returns the inner writer.
    pub fn finish(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|err| IngestError::Write {
                target: "CSV output".to_string(),
                source: err.into_error(),
            })
    }
}

fn flush<W: Write>(writer: &mut W, target: &str) -> Result<()> {
    writer.flush().map_err(|source| IngestError::Write {
        target: target.to_string(),
        source,
    })
}

/// Writes a list of records as a JSON array and flushes `writer`.
pub fn write_json_list<W: Write, T: Serialize>(mut writer: W, records: &[T]) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, records)?;
    flush(&mut writer, "JSON output")
}

/// Writes a list of records as a YAML sequence and flushes `writer`.
pub fn write_yaml_list<W: Write, T: Serialize>(mut writer: W, records: &[T]) -> Result<()> {
    serde_yaml::to_writer(&mut writer, records)?;
    flush(&mut writer, "YAML output")
}
