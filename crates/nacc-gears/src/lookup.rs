//! Visitors that add registry identifiers to form rows.

use std::collections::HashMap;
use std::io::Write;

use nacc_identifiers::{IdentifierQuery, IdentifierRepository};
use nacc_ingest::{
    CsvRow, CsvVisitor, CsvWriter, ErrorWriter, IngestError, field, require_columns,
};
use nacc_model::file_error::{center_mismatch_error, empty_field_error, identifier_error};
use nacc_model::{CenterId, FieldNames, FileError, Identifier, ModuleName, Naccid};
use tracing::debug;

use crate::error::Result;

/// `header` followed by each of `columns` it lacks.
fn extend_header(header: &[String], columns: &[&str]) -> Vec<String> {
    let mut extended = header.to_vec();
    for column in columns {
        if !extended.iter().any(|name| name == column) {
            extended.push((*column).to_string());
        }
    }
    extended
}

/// Adds `naccid` and `module` to the rows of a single center's form file.
///
/// Every row must carry the configured ADCID. NACCIDs come from a PTID map
/// loaded for the center before the pass.
pub struct NaccidLookupVisitor<W: Write> {
    adcid: CenterId,
    identifiers: HashMap<String, Identifier>,
    module: ModuleName,
    date_field: String,
    writer: CsvWriter<W>,
}

impl<W: Write> NaccidLookupVisitor<W> {
    pub fn new(
        adcid: CenterId,
        identifiers: impl IntoIterator<Item = Identifier>,
        module: ModuleName,
        date_field: impl Into<String>,
        output: W,
    ) -> Self {
        Self {
            adcid,
            identifiers: identifiers
                .into_iter()
                .filter(|identifier| identifier.adcid == adcid)
                .map(|identifier| (identifier.ptid.as_str().to_string(), identifier))
                .collect(),
            module,
            date_field: date_field.into().to_lowercase(),
            writer: CsvWriter::new(output, Vec::<String>::new()),
        }
    }

    /// Loads the center's identifiers from the registry.
    pub fn from_repository(
        repository: &dyn IdentifierRepository,
        adcid: CenterId,
        module: ModuleName,
        date_field: impl Into<String>,
        output: W,
    ) -> Result<Self> {
        let identifiers = repository.list(Some(adcid))?;
        debug!(%adcid, count = identifiers.len(), "loaded center identifiers");
        Ok(Self::new(adcid, identifiers, module, date_field, output))
    }

    pub fn rows_written(&self) -> usize {
        self.writer.rows()
    }

    pub fn finish(self) -> Result<W> {
        Ok(self.writer.finish()?)
    }
}

impl<W: Write> CsvVisitor for NaccidLookupVisitor<W> {
    fn visit_header(&mut self, header: &[String]) -> std::result::Result<(), FileError> {
        require_columns(
            header,
            &[FieldNames::PTID, FieldNames::ADCID, self.date_field.as_str()],
        )?;
        self.writer
            .set_columns(extend_header(header, &[FieldNames::NACCID, FieldNames::MODULE]));
        Ok(())
    }

    fn visit_row(
        &mut self,
        row: &CsvRow,
        line: u64,
        errors: &mut dyn ErrorWriter,
    ) -> nacc_ingest::Result<bool> {
        let adcid = field(row, FieldNames::ADCID).unwrap_or_default();
        if adcid.parse::<CenterId>().ok() != Some(self.adcid) {
            errors.write(center_mismatch_error(
                FieldNames::ADCID,
                adcid,
                &self.adcid.to_string(),
                line,
            ));
            return Ok(false);
        }

        let ptid = field(row, FieldNames::PTID).unwrap_or_default();
        let Some(identifier) = self.identifiers.get(ptid) else {
            errors.write(identifier_error(FieldNames::PTID, ptid, line, None));
            return Ok(false);
        };

        let mut output = row.clone();
        output.insert(FieldNames::NACCID.to_string(), identifier.naccid.to_string());
        output.insert(FieldNames::MODULE.to_string(), self.module.to_string());
        self.writer.write_row(&output)?;
        Ok(true)
    }
}

/// Adds `adcid` and `ptid` to rows keyed by NACCID.
pub struct CenterLookupVisitor<'a, W: Write> {
    repository: &'a dyn IdentifierRepository,
    writer: CsvWriter<W>,
}

impl<'a, W: Write> CenterLookupVisitor<'a, W> {
    pub fn new(repository: &'a dyn IdentifierRepository, output: W) -> Self {
        Self {
            repository,
            writer: CsvWriter::new(output, Vec::<String>::new()),
        }
    }

    pub fn rows_written(&self) -> usize {
        self.writer.rows()
    }

    pub fn finish(self) -> Result<W> {
        Ok(self.writer.finish()?)
    }
}

impl<W: Write> CsvVisitor for CenterLookupVisitor<'_, W> {
    fn visit_header(&mut self, header: &[String]) -> std::result::Result<(), FileError> {
        require_columns(header, &[FieldNames::NACCID])?;
        self.writer
            .set_columns(extend_header(header, &[FieldNames::ADCID, FieldNames::PTID]));
        Ok(())
    }

    fn visit_row(
        &mut self,
        row: &CsvRow,
        line: u64,
        errors: &mut dyn ErrorWriter,
    ) -> nacc_ingest::Result<bool> {
        let Some(value) = field(row, FieldNames::NACCID) else {
            errors.write(empty_field_error(&[FieldNames::NACCID], line));
            return Ok(false);
        };
        let Ok(naccid) = value.parse::<Naccid>() else {
            errors.write(identifier_error(
                FieldNames::NACCID,
                value,
                line,
                Some(format!("Invalid NACCID {value}")),
            ));
            return Ok(false);
        };

        let identifier = self
            .repository
            .find(&IdentifierQuery::ByNaccid(naccid))
            .map_err(IngestError::aborted)?;
        let Some(identifier) = identifier else {
            errors.write(identifier_error(FieldNames::NACCID, value, line, None));
            return Ok(false);
        };

        let mut output = row.clone();
        output.insert(FieldNames::ADCID.to_string(), identifier.adcid.to_string());
        output.insert(FieldNames::PTID.to_string(), identifier.ptid.to_string());
        self.writer.write_row(&output)?;
        Ok(true)
    }
}
