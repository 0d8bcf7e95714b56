//! Streaming CSV reader that drives a [`CsvVisitor`] over each row.

use std::io::{BufRead, BufReader, Read};

use csv::{ReaderBuilder, StringRecord};
use nacc_model::file_error::{empty_file_error, malformed_file_error, missing_header_error};
use tracing::debug;

use crate::error::{IngestError, Result};
use crate::{CsvRow, CsvVisitor, ErrorWriter};

/// Normalizes a header name: byte order mark and surrounding whitespace
/// removed, lower-cased.
pub fn normalize_header(raw: &str) -> String {
    raw.trim_start_matches('\u{feff}').trim().to_lowercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PipelineState {
    AwaitingHeader,
    ProcessingRows,
    Done,
}

/// Counters for one pass over a file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub rows: usize,
    pub failed_rows: usize,
}

/// State machine for one pass over a CSV stream.
pub struct CsvPipeline<'a> {
    state: PipelineState,
    header: Vec<String>,
    errors: &'a mut dyn ErrorWriter,
    visitor: &'a mut dyn CsvVisitor,
    stats: PipelineStats,
}

impl<'a> CsvPipeline<'a> {
    pub fn new(errors: &'a mut dyn ErrorWriter, visitor: &'a mut dyn CsvVisitor) -> Self {
        Self {
            state: PipelineState::AwaitingHeader,
            header: Vec::new(),
            errors,
            visitor,
            stats: PipelineStats::default(),
        }
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    /// Runs the pass to completion.
    ///
    /// Returns false when the file was rejected or any row failed.
    pub fn run<R: Read>(&mut self, input: R) -> Result<bool> {
        let mut input = BufReader::new(input);
        let first = input.fill_buf().map_err(IngestError::Read)?;
        if first.is_empty() {
            self.errors.write(empty_file_error());
            self.state = PipelineState::Done;
            return Ok(false);
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(input);

        let header = match reader.headers() {
            Ok(header) => header.clone(),
            Err(err) => {
                self.errors.write(malformed_file_error(&err.to_string()));
                self.state = PipelineState::Done;
                return Ok(false);
            }
        };
        if !self.accept_header(&header) {
            self.state = PipelineState::Done;
            return Ok(false);
        }
        self.state = PipelineState::ProcessingRows;

        let mut success = true;
        let mut record = StringRecord::new();
        loop {
            match reader.read_record(&mut record) {
                Ok(true) => {
                    let line = record.position().map_or(0, csv::Position::line);
                    success &= self.process_row(&record, line)?;
                }
                Ok(false) => break,
                Err(err) => {
                    self.errors.write(malformed_file_error(&err.to_string()));
                    self.state = PipelineState::Done;
                    return Ok(false);
                }
            }
        }

        self.state = PipelineState::Done;
        debug!(
            rows = self.stats.rows,
            failed_rows = self.stats.failed_rows,
            "finished CSV pass"
        );
        Ok(success)
    }

    fn accept_header(&mut self, raw: &StringRecord) -> bool {
        debug_assert_eq!(self.state, PipelineState::AwaitingHeader);
        let header: Vec<String> = raw.iter().map(normalize_header).collect();
        if header.iter().all(String::is_empty) {
            self.errors.write(missing_header_error());
            return false;
        }
        if let Err(error) = self.visitor.visit_header(&header) {
            self.errors.write(error);
            return false;
        }
        self.header = header;
        true
    }

    fn process_row(&mut self, record: &StringRecord, line: u64) -> Result<bool> {
        debug_assert_eq!(self.state, PipelineState::ProcessingRows);
        // Short rows are padded with blanks and cells past the header dropped.
        let row: CsvRow = self
            .header
            .iter()
            .enumerate()
            .filter(|(_, name)| !name.is_empty())
            .map(|(index, name)| (name.clone(), record.get(index).unwrap_or("").to_string()))
            .collect();
        self.stats.rows += 1;
        let ok = self.visitor.visit_row(&row, line, &mut *self.errors)?;
        if !ok {
            self.stats.failed_rows += 1;
        }
        Ok(ok)
    }
}

/// Reads CSV from `input`, applying `visitor` to the header and each row.
///
/// File level problems (empty input, no header, a header rejected by the
/// visitor, malformed records) are written to `errors` and yield `Ok(false)`.
/// Row failures are written by the visitor and processing continues.
/// `Err` is returned only when reading fails or the visitor aborts.
pub fn read_csv<R: Read>(
    input: R,
    errors: &mut dyn ErrorWriter,
    visitor: &mut dyn CsvVisitor,
) -> Result<bool> {
    CsvPipeline::new(errors, visitor).run(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_header_strips_bom_and_case() {
        assert_eq!(normalize_header("\u{feff}PTID "), "ptid");
        assert_eq!(normalize_header("  NaccId"), "naccid");
    }
}
