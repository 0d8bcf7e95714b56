//! Structured errors reported against an input file.
//!
//! A [`FileError`] ties an error code and message to a location in a CSV
//! (line and column) or JSON (key path) file. Errors for one file are
//! collected in order by an error writer and written out as CSV or JSON.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Severity of a file error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorType {
    Alert,
    Error,
}

impl ErrorType {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorType::Alert => "alert",
            ErrorType::Error => "error",
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error codes recognized by the downstream error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCode {
    EmptyFile,
    MissingHeader,
    InvalidHeader,
    MalformedFile,
    EmptyField,
    Identifier,
    UnexpectedValue,
    InvalidRow,
    ParticipantExists,
    MismatchedId,
    Transfer,
    CenterMismatch,
    InvalidDate,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::EmptyFile => "empty-file",
            ErrorCode::MissingHeader => "missing-header",
            ErrorCode::InvalidHeader => "invalid-header",
            ErrorCode::MalformedFile => "malformed-file",
            ErrorCode::EmptyField => "empty-field",
            ErrorCode::Identifier => "identifier",
            ErrorCode::UnexpectedValue => "unexpected-value",
            ErrorCode::InvalidRow => "invalid-row",
            ErrorCode::ParticipantExists => "participant-exists",
            ErrorCode::MismatchedId => "mismatched-id",
            ErrorCode::Transfer => "transfer",
            ErrorCode::CenterMismatch => "center-mismatch",
            ErrorCode::InvalidDate => "invalid-date",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where in the file an error occurred.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorLocation {
    Csv { line: u64, column_name: String },
    Json { key_path: String },
}

/// An error found in a file during a pipeline step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileError {
    #[serde(rename = "type")]
    pub error_type: ErrorType,
    pub code: ErrorCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<ErrorLocation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    pub message: String,
}

impl FileError {
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(ErrorType::Error, code, message)
    }

    pub fn alert(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(ErrorType::Alert, code, message)
    }

    fn new(error_type: ErrorType, code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error_type,
            code,
            location: None,
            container_id: None,
            value: None,
            expected: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn at_csv(mut self, line: u64, column_name: impl Into<String>) -> Self {
        self.location = Some(ErrorLocation::Csv {
            line,
            column_name: column_name.into(),
        });
        self
    }

    #[must_use]
    pub fn at_json(mut self, key_path: impl Into<String>) -> Self {
        self.location = Some(ErrorLocation::Json {
            key_path: key_path.into(),
        });
        self
    }

    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    #[must_use]
    pub fn with_expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self
    }

    #[must_use]
    pub fn with_container(mut self, container_id: impl Into<String>) -> Self {
        self.container_id = Some(container_id.into());
        self
    }

    /// Line number for CSV located errors.
    pub fn line(&self) -> Option<u64> {
        match &self.location {
            Some(ErrorLocation::Csv { line, .. }) => Some(*line),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error_type == ErrorType::Error
    }
}

/// Flat form of a [`FileError`] for CSV output.
///
/// The location is embedded as a JSON string so that both location kinds fit
/// a single column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileErrorRecord {
    #[serde(rename = "type")]
    pub error_type: String,
    pub code: String,
    pub location: String,
    pub container_id: String,
    pub value: String,
    pub expected: String,
    pub message: String,
}

impl FileErrorRecord {
    pub const FIELDS: [&'static str; 7] = [
        "type",
        "code",
        "location",
        "container_id",
        "value",
        "expected",
        "message",
    ];
}

impl From<&FileError> for FileErrorRecord {
    fn from(error: &FileError) -> Self {
        let location = error
            .location
            .as_ref()
            .and_then(|location| serde_json::to_string(location).ok())
            .unwrap_or_default();
        Self {
            error_type: error.error_type.to_string(),
            code: error.code.to_string(),
            location,
            container_id: error.container_id.clone().unwrap_or_default(),
            value: error.value.clone().unwrap_or_default(),
            expected: error.expected.clone().unwrap_or_default(),
            message: error.message.clone(),
        }
    }
}

pub fn empty_file_error() -> FileError {
    FileError::error(ErrorCode::EmptyFile, "Empty input file")
}

pub fn missing_header_error() -> FileError {
    FileError::error(ErrorCode::MissingHeader, "No file header found")
}

/// Header lacks one or more required columns.
pub fn missing_columns_error<S: AsRef<str>>(columns: &[S]) -> FileError {
    let names: Vec<&str> = columns.iter().map(AsRef::as_ref).collect();
    FileError::error(
        ErrorCode::MissingHeader,
        format!("Missing required field(s) {} in the header", names.join(", ")),
    )
    .with_expected(names.join(","))
}

pub fn invalid_header_error(message: impl Into<String>) -> FileError {
    FileError::error(ErrorCode::InvalidHeader, message)
}

pub fn malformed_file_error(detail: &str) -> FileError {
    FileError::error(
        ErrorCode::MalformedFile,
        format!("Malformed input file: {detail}"),
    )
}

/// Required fields are blank in a row.
pub fn empty_field_error<S: AsRef<str>>(fields: &[S], line: u64) -> FileError {
    let names: Vec<&str> = fields.iter().map(AsRef::as_ref).collect();
    let column = names.first().copied().unwrap_or_default();
    FileError::error(
        ErrorCode::EmptyField,
        format!("Field(s) {} cannot be blank", names.join(", ")),
    )
    .at_csv(line, column)
}

/// Identifier value has no registry match.
pub fn identifier_error(field: &str, value: &str, line: u64, message: Option<String>) -> FileError {
    FileError::error(
        ErrorCode::Identifier,
        message.unwrap_or_else(|| "Unrecognized participant ID".to_string()),
    )
    .at_csv(line, field)
    .with_value(value)
}

pub fn unexpected_value_error(
    field: &str,
    value: &str,
    expected: &str,
    line: u64,
    message: Option<String>,
) -> FileError {
    FileError::error(
        ErrorCode::UnexpectedValue,
        message.unwrap_or_else(|| format!("Expected {expected} for field {field}")),
    )
    .at_csv(line, field)
    .with_value(value)
    .with_expected(expected)
}

pub fn invalid_row_error(field: &str, line: u64, message: impl Into<String>) -> FileError {
    FileError::error(ErrorCode::InvalidRow, message).at_csv(line, field)
}

pub fn existing_participant_error(
    field: &str,
    value: &str,
    line: u64,
    message: Option<String>,
) -> FileError {
    FileError::error(
        ErrorCode::ParticipantExists,
        message.unwrap_or_else(|| format!("Participant exists for PTID {value}")),
    )
    .at_csv(line, field)
    .with_value(value)
}

pub fn mismatched_id_error(field: &str, line: u64, message: impl Into<String>) -> FileError {
    FileError::error(ErrorCode::MismatchedId, message).at_csv(line, field)
}

/// Transfers are recorded but not carried out automatically.
pub fn transfer_alert(field: &str, line: u64, message: impl Into<String>) -> FileError {
    FileError::alert(ErrorCode::Transfer, message).at_csv(line, field)
}

pub fn center_mismatch_error(field: &str, value: &str, expected: &str, line: u64) -> FileError {
    FileError::error(
        ErrorCode::CenterMismatch,
        format!("Center ID {value} does not match the expected center {expected}"),
    )
    .at_csv(line, field)
    .with_value(value)
    .with_expected(expected)
}

pub fn invalid_date_error(field: &str, value: &str, line: u64) -> FileError {
    FileError::error(ErrorCode::InvalidDate, "Expected a valid date string")
        .at_csv(line, field)
        .with_value(value)
        .with_expected("YYYY-MM-DD")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_record_embeds_location_as_json() {
        let error = identifier_error("ptid", "110001", 3, None).with_container("file-1");
        let record = FileErrorRecord::from(&error);

        assert_eq!(record.error_type, "error");
        assert_eq!(record.code, "identifier");
        assert_eq!(record.location, r#"{"line":3,"column_name":"ptid"}"#);
        assert_eq!(record.container_id, "file-1");
        assert_eq!(record.value, "110001");
        assert_eq!(record.message, "Unrecognized participant ID");
    }

    #[test]
    fn missing_columns_lists_every_column() {
        let error = missing_columns_error(&["a1", "a2"]);
        assert_eq!(error.code, ErrorCode::MissingHeader);
        assert_eq!(
            error.message,
            "Missing required field(s) a1, a2 in the header"
        );
        assert!(error.location.is_none());
    }

    #[test]
    fn json_location_round_trips() {
        let error = FileError::error(ErrorCode::UnexpectedValue, "bad").at_json("visits[0].date");
        let json = serde_json::to_string(&error).unwrap();
        let back: FileError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, error);
        assert_eq!(back.line(), None);
    }
}
