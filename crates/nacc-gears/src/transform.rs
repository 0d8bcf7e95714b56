//! Form record transformation.
//!
//! Rows are normalized before they are stored as per-subject visit records:
//! the visit date is rewritten as `YYYY-MM-DD` and, for modules with
//! versioned forms, fields that belong only to another form version are
//! dropped.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::Path;

use nacc_ingest::{
    CsvRow, CsvVisitor, ErrorWriter, NonEmptyFieldsValidator, RowValidator, field,
    require_columns,
};
use nacc_model::file_error::{invalid_date_error, unexpected_value_error};
use nacc_model::{DefaultModules, FieldNames, FileError, normalize_date};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GearError, Result};

/// Picks the form version of a record from one of its fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionMap {
    pub fieldname: String,
    #[serde(default)]
    pub value_map: HashMap<String, String>,
    pub default: String,
}

impl VersionMap {
    pub fn apply<'m>(&'m self, record: &CsvRow) -> &'m str {
        field(record, &self.fieldname)
            .and_then(|value| self.value_map.get(value))
            .map_or(self.default.as_str(), String::as_str)
    }
}

/// Field lists for each version of a form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldFilter {
    pub version_map: VersionMap,
    #[serde(default)]
    pub fields: BTreeMap<String, Vec<String>>,
}

impl FieldFilter {
    /// Fields listed for `version` and for no other version.
    fn unique_fields(&self, version: &str) -> BTreeSet<&str> {
        let Some(own) = self.fields.get(version) else {
            return BTreeSet::new();
        };
        let others: BTreeSet<&str> = self
            .fields
            .iter()
            .filter(|(name, _)| name.as_str() != version)
            .flat_map(|(_, fields)| fields.iter().map(String::as_str))
            .collect();
        own.iter()
            .map(String::as_str)
            .filter(|name| !others.contains(name))
            .collect()
    }

    /// Drops the fields unique to every version other than the record's.
    pub fn apply(&self, mut record: CsvRow) -> CsvRow {
        let version = self.version_map.apply(&record).to_string();
        let dropped: BTreeSet<String> = self
            .fields
            .keys()
            .filter(|name| **name != version)
            .flat_map(|name| self.unique_fields(name))
            .map(str::to_string)
            .collect();
        record.retain(|name, _| !dropped.contains(name));
        record
    }
}

/// Field filters per module, keyed by upper-case module name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldTransformations(BTreeMap<String, Vec<FieldFilter>>);

impl FieldTransformations {
    /// Reads transformations from a JSON document.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| GearError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| GearError::Transformations {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn get(&self, module: &str) -> &[FieldFilter] {
        self.0
            .get(&module.to_uppercase())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn add(&mut self, module: &str, filter: FieldFilter) {
        self.0.entry(module.to_uppercase()).or_default().push(filter);
    }
}

/// One step applied to a record.
///
/// `None` means the record was rejected and an error written.
pub trait RecordTransformer {
    fn transform(&self, record: CsvRow, line: u64, errors: &mut dyn ErrorWriter)
    -> Option<CsvRow>;
}

/// Normalizes the visit date.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateTransformer;

impl RecordTransformer for DateTransformer {
    fn transform(
        &self,
        mut record: CsvRow,
        line: u64,
        errors: &mut dyn ErrorWriter,
    ) -> Option<CsvRow> {
        let Some(value) = record.get(FieldNames::VISITDATE) else {
            return Some(record);
        };
        match normalize_date(value) {
            Ok(normalized) => {
                record.insert(FieldNames::VISITDATE.to_string(), normalized);
                Some(record)
            }
            Err(_) => {
                errors.write(invalid_date_error(FieldNames::VISITDATE, value, line));
                None
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct FilterTransformer(FieldFilter);

impl RecordTransformer for FilterTransformer {
    fn transform(&self, record: CsvRow, _: u64, _: &mut dyn ErrorWriter) -> Option<CsvRow> {
        Some(self.0.apply(record))
    }
}

/// Applies transformers in order, stopping at the first rejection.
#[derive(Default)]
pub struct TransformerChain {
    transformers: Vec<Box<dyn RecordTransformer>>,
}

impl TransformerChain {
    pub fn len(&self) -> usize {
        self.transformers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transformers.is_empty()
    }
}

impl RecordTransformer for TransformerChain {
    fn transform(
        &self,
        record: CsvRow,
        line: u64,
        errors: &mut dyn ErrorWriter,
    ) -> Option<CsvRow> {
        self.transformers
            .iter()
            .try_fold(record, |record, transformer| {
                transformer.transform(record, line, errors)
            })
    }
}

/// Module of a form file, as far as transformation is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormModule {
    Uds,
    Lbd,
    Other(String),
}

impl FormModule {
    pub fn parse(value: &str) -> Self {
        let lowered = value.trim().to_lowercase();
        match lowered.as_str() {
            DefaultModules::UDS => FormModule::Uds,
            DefaultModules::LBD => FormModule::Lbd,
            _ => FormModule::Other(lowered),
        }
    }

    /// Whether this module's forms come in versions with their own fields.
    pub fn is_versioned(&self) -> bool {
        matches!(self, FormModule::Uds | FormModule::Lbd)
    }
}

impl fmt::Display for FormModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormModule::Uds => f.write_str("UDS"),
            FormModule::Lbd => f.write_str("LBD"),
            FormModule::Other(name) => f.write_str(&name.to_uppercase()),
        }
    }
}

/// Builds the transformer chain for a module.
#[derive(Debug, Clone, Default)]
pub struct TransformerFactory {
    transformations: FieldTransformations,
}

impl TransformerFactory {
    pub fn new(transformations: FieldTransformations) -> Self {
        Self { transformations }
    }

    /// Date normalization, then the module's field filters for versioned
    /// modules. Other modules only get the date step.
    pub fn create(&self, module: Option<&FormModule>) -> TransformerChain {
        let mut transformers: Vec<Box<dyn RecordTransformer>> = vec![Box::new(DateTransformer)];
        if let Some(module) = module.filter(|module| module.is_versioned()) {
            for filter in self.transformations.get(&module.to_string()) {
                transformers.push(Box::new(FilterTransformer(filter.clone())));
            }
        }
        TransformerChain { transformers }
    }
}

/// Columns every form row must carry unless overridden.
pub const TRANSFORM_REQUIRED_COLUMNS: [&str; 4] = [
    FieldNames::NACCID,
    FieldNames::MODULE,
    FieldNames::VISITNUM,
    FieldNames::VISITDATE,
];

/// Key of a visit record within a subject:
/// `<ptid>_<visitnum>_<visitdate>_<module>`.
fn visit_key(record: &CsvRow) -> String {
    [
        FieldNames::PTID,
        FieldNames::VISITNUM,
        FieldNames::VISITDATE,
        FieldNames::MODULE,
    ]
        .iter()
        .map(|name| field(record, name).unwrap_or_default().to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}

/// Transforms form rows and groups them by subject.
///
/// All rows of a file must share one module when the file has a `module`
/// column. A later row for the same visit replaces the earlier one.
pub struct TransformVisitor {
    required: Vec<String>,
    factory: TransformerFactory,
    has_module: bool,
    module: Option<FormModule>,
    transformer: Option<TransformerChain>,
    records: BTreeMap<String, BTreeMap<String, CsvRow>>,
}

impl TransformVisitor {
    pub fn new(factory: TransformerFactory) -> Self {
        Self::with_required(factory, TRANSFORM_REQUIRED_COLUMNS)
    }

    pub fn with_required<I, S>(factory: TransformerFactory, required: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            required: required
                .into_iter()
                .map(|name| name.into().to_lowercase())
                .collect(),
            factory,
            has_module: false,
            module: None,
            transformer: None,
            records: BTreeMap::new(),
        }
    }

    pub fn module(&self) -> Option<&FormModule> {
        self.module.as_ref()
    }

    /// Transformed records by NACCID, then by visit.
    pub fn records(&self) -> &BTreeMap<String, BTreeMap<String, CsvRow>> {
        &self.records
    }

    pub fn into_records(self) -> BTreeMap<String, BTreeMap<String, CsvRow>> {
        self.records
    }

    fn check_module(&mut self, row: &CsvRow, line: u64, errors: &mut dyn ErrorWriter) -> bool {
        if !self.has_module {
            return true;
        }
        let value = field(row, FieldNames::MODULE).unwrap_or_default();
        let row_module = FormModule::parse(value);
        let module = self.module.get_or_insert_with(|| row_module.clone());
        if *module == row_module {
            return true;
        }
        errors.write(unexpected_value_error(
            FieldNames::MODULE,
            value,
            &module.to_string(),
            line,
            None,
        ));
        false
    }
}

impl CsvVisitor for TransformVisitor {
    fn visit_header(&mut self, header: &[String]) -> std::result::Result<(), FileError> {
        let required: Vec<&str> = self.required.iter().map(String::as_str).collect();
        require_columns(header, &required)?;
        self.has_module = header.iter().any(|name| name == FieldNames::MODULE);
        Ok(())
    }

    fn visit_row(
        &mut self,
        row: &CsvRow,
        line: u64,
        errors: &mut dyn ErrorWriter,
    ) -> nacc_ingest::Result<bool> {
        let mut required = NonEmptyFieldsValidator::new(self.required.iter().cloned());
        if !required.check(row, line, errors)? {
            return Ok(false);
        }
        if !self.check_module(row, line, errors) {
            return Ok(false);
        }

        let module = self.module.as_ref();
        let factory = &self.factory;
        let transformer = self
            .transformer
            .get_or_insert_with(|| factory.create(module));
        let Some(record) = transformer.transform(row.clone(), line, errors) else {
            return Ok(false);
        };

        let subject = field(&record, FieldNames::NACCID)
            .unwrap_or_default()
            .to_string();
        let key = visit_key(&record);
        debug!(line, "transformed record");
        self.records.entry(subject).or_default().insert(key, record);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nacc_ingest::ListErrorWriter;
    use nacc_model::ErrorCode;

    fn row(pairs: &[(&str, &str)]) -> CsvRow {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect()
    }

    fn filter(fields: &[(&str, &[&str])]) -> FieldFilter {
        FieldFilter {
            version_map: VersionMap {
                fieldname: "formver".to_string(),
                value_map: [("3".to_string(), "v3".to_string())].into_iter().collect(),
                default: "v4".to_string(),
            },
            fields: fields
                .iter()
                .map(|(version, names)| {
                    (
                        (*version).to_string(),
                        names.iter().map(|name| (*name).to_string()).collect(),
                    )
                })
                .collect(),
        }
    }

    #[test]
    fn version_map_falls_back_to_default() {
        let map = filter(&[]).version_map;
        assert_eq!(map.apply(&row(&[("formver", "3")])), "v3");
        assert_eq!(map.apply(&row(&[("formver", "9")])), "v4");
        assert_eq!(map.apply(&row(&[])), "v4");
    }

    #[test]
    fn filter_drops_fields_of_other_versions() {
        let filter = filter(&[("v3", &["shared", "old"]), ("v4", &["shared", "new"])]);
        let record = filter.apply(row(&[
            ("formver", "3"),
            ("shared", "1"),
            ("old", "2"),
            ("new", "3"),
        ]));
        assert!(record.contains_key("old"));
        assert!(record.contains_key("shared"));
        assert!(!record.contains_key("new"));
    }

    #[test]
    fn filter_keeps_fields_listed_by_every_version() {
        let filter = filter(&[("v3", &["f1"]), ("v4", &["f1"])]);
        let input = row(&[("formver", "3"), ("f1", "x")]);
        assert_eq!(filter.apply(input.clone()), input);
    }

    #[test]
    fn date_transformer_normalizes_or_rejects() {
        let mut errors = ListErrorWriter::new("c");
        let record = DateTransformer
            .transform(row(&[("visitdate", "2024/1/5")]), 2, &mut errors)
            .unwrap();
        assert_eq!(record["visitdate"], "2024-01-05");

        assert!(
            DateTransformer
                .transform(row(&[("visitdate", "01052024")]), 3, &mut errors)
                .is_none()
        );
        assert_eq!(errors.errors()[0].code, ErrorCode::InvalidDate);

        let untouched = row(&[("ptid", "1")]);
        assert_eq!(
            DateTransformer.transform(untouched.clone(), 4, &mut errors),
            Some(untouched)
        );
    }

    #[test]
    fn only_versioned_modules_get_filters() {
        let mut transformations = FieldTransformations::default();
        transformations.add("uds", filter(&[("v3", &["old"]), ("v4", &["new"])]));
        transformations.add("np", filter(&[("v3", &["old"]), ("v4", &["new"])]));
        let factory = TransformerFactory::new(transformations);
        assert_eq!(factory.create(Some(&FormModule::Uds)).len(), 2);
        assert_eq!(factory.create(Some(&FormModule::parse("np"))).len(), 1);
        assert_eq!(factory.create(None).len(), 1);
    }
}
