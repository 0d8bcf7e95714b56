//! Row visitor and validator traits.

use std::collections::BTreeMap;

use nacc_model::file_error::{empty_field_error, missing_columns_error};
use nacc_model::{CaseInsensitiveSet, FileError};

use crate::ErrorWriter;
use crate::error::Result;

/// One CSV record keyed by normalized header name.
pub type CsvRow = BTreeMap<String, String>;

/// Per-form row processing driven by [`read_csv`](crate::read_csv).
pub trait CsvVisitor {
    /// Checks the normalized header.
    ///
    /// A rejected header is reported by returning the single error to write;
    /// no rows are visited afterwards.
    fn visit_header(&mut self, header: &[String]) -> std::result::Result<(), FileError>;

    /// Processes one row, writing any row errors to `errors`.
    ///
    /// Returns whether the row succeeded. An `Err` aborts the whole file.
    fn visit_row(&mut self, row: &CsvRow, line: u64, errors: &mut dyn ErrorWriter)
    -> Result<bool>;
}

/// Rejects a header lacking any of the `required` columns.
///
/// All missing columns are reported in a single `missing-header` error.
pub fn require_columns(header: &[String], required: &[&str]) -> std::result::Result<(), FileError> {
    let names = CaseInsensitiveSet::new(header);
    let missing = names.missing(required);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(missing_columns_error(&missing))
    }
}

/// Value of `field` in `row`, trimmed, or `None` when absent or blank.
pub fn field<'a>(row: &'a CsvRow, field: &str) -> Option<&'a str> {
    row.get(field)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

/// A check applied to each row.
pub trait RowValidator {
    /// Returns `Ok(true)` when the row passes and writes errors otherwise.
    ///
    /// `Err` is reserved for failures that must abort the file.
    fn check(&mut self, row: &CsvRow, line: u64, errors: &mut dyn ErrorWriter) -> Result<bool>;
}

/// Runs validators in order and stops at the first failure.
#[derive(Default)]
pub struct AggregateRowValidator<'v> {
    validators: Vec<Box<dyn RowValidator + 'v>>,
}

impl<'v> AggregateRowValidator<'v> {
    pub fn new(validators: Vec<Box<dyn RowValidator + 'v>>) -> Self {
        Self { validators }
    }

    pub fn push(&mut self, validator: Box<dyn RowValidator + 'v>) {
        self.validators.push(validator);
    }
}

impl RowValidator for AggregateRowValidator<'_> {
    fn check(&mut self, row: &CsvRow, line: u64, errors: &mut dyn ErrorWriter) -> Result<bool> {
        for validator in &mut self.validators {
            if !validator.check(row, line, errors)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Fails rows where any of the named fields is blank.
#[derive(Debug, Clone)]
pub struct NonEmptyFieldsValidator {
    fields: Vec<String>,
}

impl NonEmptyFieldsValidator {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }
}

impl RowValidator for NonEmptyFieldsValidator {
    fn check(&mut self, row: &CsvRow, line: u64, errors: &mut dyn ErrorWriter) -> Result<bool> {
        let blank: Vec<&str> = self
            .fields
            .iter()
            .map(String::as_str)
            .filter(|name| field(row, name).is_none())
            .collect();
        if blank.is_empty() {
            return Ok(true);
        }
        errors.write(empty_field_error(&blank, line));
        Ok(false)
    }
}
