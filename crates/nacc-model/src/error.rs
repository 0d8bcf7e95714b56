//! Error types for parsing identifiers, dates and other model values.

use thiserror::Error;

/// Format errors raised where a raw value is parsed into a model type.
///
/// Callers processing CSV rows catch these and convert them into row-level
/// [`FileError`](crate::FileError) records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// Center identifier is not a non-negative integer.
    #[error("invalid ADCID '{0}': expected a non-negative integer")]
    InvalidCenterId(String),

    /// Participant identifier is empty or too long.
    #[error("invalid PTID '{value}': {reason}")]
    InvalidPtid { value: String, reason: &'static str },

    /// NACCID does not match `NACC` followed by six digits.
    #[error("invalid NACCID '{0}': expected NACC followed by six digits")]
    InvalidNaccid(String),

    /// Numeric NACCID outside the six digit range.
    #[error("NACCID number {0} is out of range")]
    NaccidOutOfRange(u64),

    /// GUID does not match the expected pattern.
    #[error("invalid GUID '{0}'")]
    InvalidGuid(String),

    /// Module name is empty or not alphabetic.
    #[error("invalid module name '{0}'")]
    InvalidModule(String),

    /// Date string matched none of the accepted formats.
    #[error("invalid date '{value}': expected one of {}", formats.join(", "))]
    DateFormat {
        value: String,
        formats: Vec<&'static str>,
    },

    /// Integer flag column could not be parsed.
    #[error("invalid value '{value}' for {field}: expected an integer")]
    InvalidInteger { field: String, value: String },
}

/// Result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_format_lists_formats() {
        let err = ModelError::DateFormat {
            value: "13/45/2024".to_string(),
            formats: vec!["%m/%d/%Y", "%Y-%m-%d"],
        };
        assert_eq!(
            err.to_string(),
            "invalid date '13/45/2024': expected one of %m/%d/%Y, %Y-%m-%d"
        );
    }
}
