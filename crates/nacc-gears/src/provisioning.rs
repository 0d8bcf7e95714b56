//! Identifier provisioning from enrollment forms.
//!
//! Each row of an enrollment file is either a new enrollment, which queues a
//! NACCID creation request, or a transfer between centers, which is checked
//! against the registry and recorded for follow-up. Creation requests are
//! committed together after the whole file has been read.

use chrono::NaiveDate;
use nacc_identifiers::{IdentifierBatch, IdentifierQuery, IdentifierRepository};
use nacc_ingest::{
    AggregateRowValidator, CsvRow, CsvVisitor, ErrorWriter, IngestError,
    NonEmptyFieldsValidator, RowValidator, field, require_columns,
};
use nacc_model::file_error::{
    empty_field_error, existing_participant_error, identifier_error, invalid_date_error,
    mismatched_id_error, transfer_alert, unexpected_value_error,
};
use nacc_model::{
    CenterId, CenterIdentifiers, EnrollmentRecord, FieldNames, FileError, Guid, Identifier,
    IdentifierRequest, ModuleName, Naccid, Ptid, TransferRecord, parse_form_date,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::Result;

/// Columns an enrollment file must provide.
pub const PROVISIONING_COLUMNS: [&str; 12] = [
    FieldNames::MODULE,
    FieldNames::ENRLTYPE,
    FieldNames::ADCID,
    FieldNames::PTID,
    FieldNames::GUID,
    FieldNames::ENRLFRM_DATE,
    FieldNames::ENRLFRM_INITIALS,
    FieldNames::OLDADCID,
    FieldNames::OLDPTID,
    FieldNames::NACCIDKNWN,
    FieldNames::NACCID,
    FieldNames::PREVENRL,
];

/// What an enrollment form row asks for, from its `enrltype`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollmentKind {
    NewEnrollment,
    Transfer,
}

impl EnrollmentKind {
    fn from_code(code: i64) -> Self {
        if code == 1 {
            EnrollmentKind::NewEnrollment
        } else {
            EnrollmentKind::Transfer
        }
    }
}

/// Reads an integer-coded form field, writing an error when it is not an
/// integer. A blank or absent field is `Some(None)`.
fn coded_field(
    row: &CsvRow,
    name: &str,
    line: u64,
    errors: &mut dyn ErrorWriter,
) -> Option<Option<i64>> {
    let Some(value) = field(row, name) else {
        return Some(None);
    };
    match value.parse::<i64>() {
        Ok(code) => Some(Some(code)),
        Err(_) => {
            errors.write(unexpected_value_error(
                name,
                value,
                "integer",
                line,
                Some(format!("Expected an integer code for field {name}")),
            ));
            None
        }
    }
}

/// Yes/no checkbox field. Blank means no.
fn flag(row: &CsvRow, name: &str, line: u64, errors: &mut dyn ErrorWriter) -> Option<bool> {
    coded_field(row, name, line, errors).map(|code| code == Some(1))
}

/// Fails rows whose participant is already registered or queued.
struct NewPtidValidator<'v> {
    batch: &'v IdentifierBatch<'v>,
    center: &'v CenterIdentifiers,
}

impl RowValidator for NewPtidValidator<'_> {
    fn check(
        &mut self,
        _row: &CsvRow,
        line: u64,
        errors: &mut dyn ErrorWriter,
    ) -> nacc_ingest::Result<bool> {
        let exists = self
            .batch
            .has_center(self.center.adcid, &self.center.ptid)
            .map_err(IngestError::aborted)?;
        if !exists {
            return Ok(true);
        }
        debug!(line, "participant already registered for center");
        errors.write(existing_participant_error(
            FieldNames::PTID,
            self.center.ptid.as_str(),
            line,
            None,
        ));
        Ok(false)
    }
}

/// Fails rows whose available GUID already belongs to a participant.
struct NewGuidValidator<'v> {
    batch: &'v IdentifierBatch<'v>,
    guid: Option<&'v Guid>,
}

impl RowValidator for NewGuidValidator<'_> {
    fn check(
        &mut self,
        _row: &CsvRow,
        line: u64,
        errors: &mut dyn ErrorWriter,
    ) -> nacc_ingest::Result<bool> {
        let Some(guid) = self.guid else {
            return Ok(true);
        };
        if !self.batch.has_guid(guid).map_err(IngestError::aborted)? {
            return Ok(true);
        }
        debug!(line, "participant already registered for GUID");
        errors.write(existing_participant_error(
            FieldNames::GUID,
            guid.as_str(),
            line,
            Some(format!("Participant exists for GUID {guid}")),
        ));
        Ok(false)
    }
}

/// Fields shared by both enrollment kinds, parsed once per row.
struct FormFields {
    center: CenterIdentifiers,
    date: NaiveDate,
    initials: String,
}

/// Result of a provisioning pass after the batch has been committed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProvisioningOutcome {
    /// Identifiers created by this pass.
    pub identifiers: Vec<Identifier>,
    pub enrollments: Vec<EnrollmentRecord>,
    pub transfers: Vec<TransferRecord>,
}

/// Provisions NACCIDs for new enrollments and records transfers.
pub struct ProvisioningVisitor<'a> {
    form_name: ModuleName,
    batch: IdentifierBatch<'a>,
    enrollments: Vec<EnrollmentRecord>,
    transfers: Vec<TransferRecord>,
}

impl<'a> ProvisioningVisitor<'a> {
    pub fn new(form_name: ModuleName, repository: &'a dyn IdentifierRepository) -> Self {
        Self {
            form_name,
            batch: IdentifierBatch::new(repository),
            enrollments: Vec::new(),
            transfers: Vec::new(),
        }
    }

    pub fn pending(&self) -> usize {
        self.batch.len()
    }

    pub fn transfers(&self) -> &[TransferRecord] {
        &self.transfers
    }

    /// Commits the queued requests and fills in the new enrollments' NACCIDs.
    ///
    /// The batch is committed even when some rows failed; only rows that
    /// passed queued a request.
    pub fn finish(self) -> Result<ProvisioningOutcome> {
        let identifiers = self.batch.commit()?;
        let mut enrollments = self.enrollments;
        for enrollment in &mut enrollments {
            enrollment.naccid = identifiers
                .iter()
                .find(|identifier| identifier.center_identifiers() == enrollment.center_identifiers)
                .map(|identifier| identifier.naccid);
        }
        info!(
            created = identifiers.len(),
            transfers = self.transfers.len(),
            "provisioning finished"
        );
        Ok(ProvisioningOutcome {
            identifiers,
            enrollments,
            transfers: self.transfers,
        })
    }

    fn form_fields(
        row: &CsvRow,
        line: u64,
        errors: &mut dyn ErrorWriter,
    ) -> nacc_ingest::Result<Option<FormFields>> {
        let mut required = NonEmptyFieldsValidator::new([
            FieldNames::ADCID,
            FieldNames::PTID,
            FieldNames::ENRLFRM_DATE,
        ]);
        if !required.check(row, line, errors)? {
            return Ok(None);
        }

        let adcid_value = field(row, FieldNames::ADCID).unwrap_or_default();
        let Ok(adcid) = adcid_value.parse::<CenterId>() else {
            errors.write(unexpected_value_error(
                FieldNames::ADCID,
                adcid_value,
                "integer",
                line,
                None,
            ));
            return Ok(None);
        };
        let ptid_value = field(row, FieldNames::PTID).unwrap_or_default();
        let ptid = match Ptid::new(ptid_value) {
            Ok(ptid) => ptid,
            Err(err) => {
                errors.write(identifier_error(
                    FieldNames::PTID,
                    ptid_value,
                    line,
                    Some(err.to_string()),
                ));
                return Ok(None);
            }
        };
        let date_value = field(row, FieldNames::ENRLFRM_DATE).unwrap_or_default();
        let Ok(date) = parse_form_date(date_value) else {
            errors.write(invalid_date_error(FieldNames::ENRLFRM_DATE, date_value, line));
            return Ok(None);
        };

        Ok(Some(FormFields {
            center: CenterIdentifiers::new(adcid, ptid),
            date,
            initials: field(row, FieldNames::ENRLFRM_INITIALS)
                .unwrap_or_default()
                .to_string(),
        }))
    }

    /// The row's GUID when `guidavail` is checked.
    ///
    /// `Err(())` means an error was written for the row.
    fn available_guid(
        row: &CsvRow,
        line: u64,
        errors: &mut dyn ErrorWriter,
    ) -> std::result::Result<Option<Guid>, ()> {
        match flag(row, FieldNames::GUIDAVAIL, line, errors) {
            None => return Err(()),
            Some(false) => return Ok(None),
            Some(true) => {}
        }
        let Some(value) = field(row, FieldNames::GUID) else {
            errors.write(empty_field_error(&[FieldNames::GUID], line));
            return Err(());
        };
        match Guid::new(value) {
            Ok(guid) => Ok(Some(guid)),
            Err(_) => {
                errors.write(identifier_error(
                    FieldNames::GUID,
                    value,
                    line,
                    Some(format!("Invalid GUID {value}")),
                ));
                Err(())
            }
        }
    }

    fn visit_new_enrollment(
        &mut self,
        row: &CsvRow,
        line: u64,
        form: FormFields,
        errors: &mut dyn ErrorWriter,
    ) -> nacc_ingest::Result<bool> {
        let Ok(guid) = Self::available_guid(row, line, errors) else {
            return Ok(false);
        };

        let validators: Vec<Box<dyn RowValidator + '_>> = vec![
            Box::new(NewPtidValidator {
                batch: &self.batch,
                center: &form.center,
            }),
            Box::new(NewGuidValidator {
                batch: &self.batch,
                guid: guid.as_ref(),
            }),
        ];
        let passed = AggregateRowValidator::new(validators).check(row, line, errors)?;
        if !passed {
            return Ok(false);
        }

        debug!(line, "queued new enrollment");
        self.batch.add(
            IdentifierRequest::new(form.center.adcid, form.center.ptid.clone())
                .with_guid(guid.clone()),
        );
        self.enrollments.push(EnrollmentRecord {
            center_identifiers: form.center,
            naccid: None,
            guid,
            start_date: form.date,
        });
        Ok(true)
    }

    fn visit_transfer(
        &mut self,
        row: &CsvRow,
        line: u64,
        form: FormFields,
        errors: &mut dyn ErrorWriter,
    ) -> nacc_ingest::Result<bool> {
        let mut incoming = NewPtidValidator {
            batch: &self.batch,
            center: &form.center,
        };
        if !incoming.check(row, line, errors)? {
            return Ok(false);
        }
        let repository = self.batch.repository();
        let find = |query: IdentifierQuery| repository.find(&query).map_err(IngestError::aborted);

        let mut resolved: Option<Identifier> = None;

        let Some(naccid_known) = flag(row, FieldNames::NACCIDKNWN, line, errors) else {
            return Ok(false);
        };
        if naccid_known && let Some(value) = field(row, FieldNames::NACCID) {
            let found = match value.parse::<Naccid>() {
                Ok(naccid) => find(IdentifierQuery::ByNaccid(naccid))?,
                Err(_) => None,
            };
            let Some(found) = found else {
                errors.write(identifier_error(FieldNames::NACCID, value, line, None));
                return Ok(false);
            };
            resolved = Some(found);
        }

        let Ok(guid) = Self::available_guid(row, line, errors) else {
            return Ok(false);
        };
        if let Some(guid) = guid {
            let Some(found) = find(IdentifierQuery::ByGuid(guid.clone()))? else {
                errors.write(identifier_error(
                    FieldNames::GUID,
                    guid.as_str(),
                    line,
                    Some(format!("No NACCID found for GUID {guid}")),
                ));
                return Ok(false);
            };
            if let Some(known) = &resolved
                && known.naccid != found.naccid
            {
                errors.write(mismatched_id_error(
                    FieldNames::NACCID,
                    line,
                    format!(
                        "mismatched NACCID for GUID {guid} and provided NACCID {}",
                        known.naccid
                    ),
                ));
                return Ok(false);
            }
            resolved = Some(found);
        }

        let mut previous = None;
        let Some(previously_enrolled) = flag(row, FieldNames::PREVENRL, line, errors) else {
            return Ok(false);
        };
        if previously_enrolled
            && let (Some(old_adcid), Some(old_ptid)) = (
                field(row, FieldNames::OLDADCID),
                field(row, FieldNames::OLDPTID),
            )
        {
            let not_found = || {
                identifier_error(
                    FieldNames::OLDPTID,
                    old_ptid,
                    line,
                    Some(format!(
                        "No NACCID found for ADCID {old_adcid}, PTID {old_ptid}"
                    )),
                )
            };
            let (Ok(adcid), Ok(ptid)) = (old_adcid.parse::<CenterId>(), Ptid::new(old_ptid)) else {
                errors.write(not_found());
                return Ok(false);
            };
            let Some(found) = find(IdentifierQuery::center(adcid, ptid.clone()))? else {
                errors.write(not_found());
                return Ok(false);
            };
            if let Some(known) = &resolved
                && known.naccid != found.naccid
            {
                errors.write(mismatched_id_error(
                    FieldNames::NACCID,
                    line,
                    format!(
                        "mismatched NACCID for {old_adcid}-{old_ptid} and {}",
                        known.naccid
                    ),
                ));
                return Ok(false);
            }
            resolved = Some(found);
            previous = Some(CenterIdentifiers::new(adcid, ptid));
        }

        debug!(line, resolved = resolved.is_some(), "recorded transfer");
        self.transfers.push(TransferRecord {
            date: form.date,
            initials: form.initials,
            center_identifiers: form.center,
            previous_identifiers: previous,
            naccid: resolved.map(|identifier| identifier.naccid),
        });
        errors.write(transfer_alert(
            FieldNames::ENRLTYPE,
            line,
            "Transfer not performed",
        ));
        Ok(true)
    }
}

impl CsvVisitor for ProvisioningVisitor<'_> {
    fn visit_header(&mut self, header: &[String]) -> std::result::Result<(), FileError> {
        require_columns(header, &PROVISIONING_COLUMNS)
    }

    fn visit_row(
        &mut self,
        row: &CsvRow,
        line: u64,
        errors: &mut dyn ErrorWriter,
    ) -> nacc_ingest::Result<bool> {
        let module = field(row, FieldNames::MODULE).unwrap_or_default();
        if ModuleName::new(module).ok().as_ref() != Some(&self.form_name) {
            errors.write(unexpected_value_error(
                FieldNames::MODULE,
                module,
                self.form_name.as_str(),
                line,
                None,
            ));
            return Ok(false);
        }

        let kind = match coded_field(row, FieldNames::ENRLTYPE, line, errors) {
            None => return Ok(false),
            Some(None) => {
                errors.write(empty_field_error(&[FieldNames::ENRLTYPE], line));
                return Ok(false);
            }
            Some(Some(code)) => EnrollmentKind::from_code(code),
        };

        let Some(form) = Self::form_fields(row, line, errors)? else {
            return Ok(false);
        };
        match kind {
            EnrollmentKind::NewEnrollment => self.visit_new_enrollment(row, line, form, errors),
            EnrollmentKind::Transfer => self.visit_transfer(row, line, form, errors),
        }
    }
}
