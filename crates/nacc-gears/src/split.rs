//! Splitters that regroup one input file into per-center and per-subject
//! outputs.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use nacc_ingest::{
    CsvRow, CsvVisitor, CsvWriter, ErrorWriter, NonEmptyFieldsValidator, RowValidator, field,
    require_columns, write_json_list,
};
use nacc_model::file_error::invalid_row_error;
use nacc_model::{CenterId, FieldNames, FileError, Naccid};
use tracing::debug;

use crate::error::{GearError, Result};

/// Groups rows by the integer center key column.
///
/// Spreadsheet exports of merged cells leave the key blank on every row but
/// the first, so a blank key continues the group of the previous row.
#[derive(Debug)]
pub struct CenterSplitVisitor {
    key: String,
    header: Vec<String>,
    groups: BTreeMap<CenterId, Vec<CsvRow>>,
    current: Option<CenterId>,
}

impl Default for CenterSplitVisitor {
    fn default() -> Self {
        Self::new(FieldNames::ADCID)
    }
}

impl CenterSplitVisitor {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into().to_lowercase(),
            header: Vec::new(),
            groups: BTreeMap::new(),
            current: None,
        }
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn groups(&self) -> &BTreeMap<CenterId, Vec<CsvRow>> {
        &self.groups
    }

    /// Writes `adcid-<center>/<file_name>` under `dir` for each group,
    /// returning the written paths.
    pub fn write_center_files(&self, dir: &Path, file_name: &str) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(self.groups.len());
        for (center, rows) in &self.groups {
            let center_dir = dir.join(format!("adcid-{center}"));
            fs::create_dir_all(&center_dir).map_err(|source| GearError::Write {
                path: center_dir.clone(),
                source,
            })?;
            let path = center_dir.join(file_name);
            let file = File::create(&path).map_err(|source| GearError::Write {
                path: path.clone(),
                source,
            })?;
            let mut writer = CsvWriter::new(BufWriter::new(file), self.header.iter().cloned());
            for row in rows {
                writer.write_row(row)?;
            }
            writer.finish()?;
            debug!(%center, rows = rows.len(), path = %path.display(), "wrote center file");
            written.push(path);
        }
        Ok(written)
    }
}

impl CsvVisitor for CenterSplitVisitor {
    fn visit_header(&mut self, header: &[String]) -> std::result::Result<(), FileError> {
        require_columns(header, &[self.key.as_str()])?;
        self.header = header.to_vec();
        Ok(())
    }

    fn visit_row(
        &mut self,
        row: &CsvRow,
        line: u64,
        errors: &mut dyn ErrorWriter,
    ) -> nacc_ingest::Result<bool> {
        let center = match field(row, &self.key) {
            Some(value) => value.parse::<CenterId>().ok(),
            None => self.current,
        };
        let Some(center) = center else {
            errors.write(invalid_row_error(
                &self.key,
                line,
                format!("Row {line} was invalid: ADCID value must be an int"),
            ));
            return Ok(false);
        };
        self.current = Some(center);
        self.groups.entry(center).or_default().push(row.clone());
        Ok(true)
    }
}

/// Groups rows by NACCID, one JSON document per subject.
#[derive(Debug)]
pub struct SubjectSplitVisitor {
    required: Vec<String>,
    validator: NonEmptyFieldsValidator,
    subjects: BTreeMap<String, Vec<CsvRow>>,
}

impl Default for SubjectSplitVisitor {
    fn default() -> Self {
        Self::new([FieldNames::NACCID])
    }
}

impl SubjectSplitVisitor {
    /// `required` must include the `naccid` column used as the subject key.
    pub fn new<I, S>(required: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut required: Vec<String> = required
            .into_iter()
            .map(|name| name.into().to_lowercase())
            .collect();
        if !required.iter().any(|name| name == FieldNames::NACCID) {
            required.insert(0, FieldNames::NACCID.to_string());
        }
        Self {
            validator: NonEmptyFieldsValidator::new(required.iter().cloned()),
            required,
            subjects: BTreeMap::new(),
        }
    }

    pub fn subjects(&self) -> &BTreeMap<String, Vec<CsvRow>> {
        &self.subjects
    }

    /// Writes `<naccid>.json` under `dir` for each subject.
    pub fn write_subject_files(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(dir).map_err(|source| GearError::Write {
            path: dir.to_path_buf(),
            source,
        })?;
        let mut written = Vec::with_capacity(self.subjects.len());
        for (subject, rows) in &self.subjects {
            let path = dir.join(format!("{subject}.json"));
            let file = File::create(&path).map_err(|source| GearError::Write {
                path: path.clone(),
                source,
            })?;
            write_json_list(BufWriter::new(file), rows)?;
            written.push(path);
        }
        Ok(written)
    }
}

impl CsvVisitor for SubjectSplitVisitor {
    fn visit_header(&mut self, header: &[String]) -> std::result::Result<(), FileError> {
        let required: Vec<&str> = self.required.iter().map(String::as_str).collect();
        require_columns(header, &required)
    }

    fn visit_row(
        &mut self,
        row: &CsvRow,
        line: u64,
        errors: &mut dyn ErrorWriter,
    ) -> nacc_ingest::Result<bool> {
        if !self.validator.check(row, line, errors)? {
            return Ok(false);
        }
        let Some(value) = field(row, FieldNames::NACCID) else {
            return Ok(false);
        };
        // Canonical spelling keeps `nacc000001` and `NACC000001` together.
        let subject = value
            .to_uppercase()
            .parse::<Naccid>()
            .map_or_else(|_| value.to_string(), |naccid| naccid.to_string());
        self.subjects.entry(subject).or_default().push(row.clone());
        Ok(true)
    }
}
