//! Form date parsing.

use chrono::NaiveDate;

use crate::{ModelError, Result};

/// Date formats accepted on input forms, tried in order.
pub const DATE_FORMATS: [&str; 4] = ["%m/%d/%Y", "%m-%d-%Y", "%Y/%m/%d", "%Y-%m-%d"];

/// Canonical output format.
pub const NORMALIZED_DATE_FORMAT: &str = "%Y-%m-%d";

/// Parses a form date in any of the [`DATE_FORMATS`].
pub fn parse_form_date(value: &str) -> Result<NaiveDate> {
    let trimmed = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
        .ok_or_else(|| ModelError::DateFormat {
            value: value.to_string(),
            formats: DATE_FORMATS.to_vec(),
        })
}

/// Rewrites a form date as `YYYY-MM-DD`.
pub fn normalize_date(value: &str) -> Result<String> {
    parse_form_date(value).map(|date| date.format(NORMALIZED_DATE_FORMAT).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_each_format() {
        for value in ["03/07/2024", "03-07-2024", "2024/03/07", "2024-03-07"] {
            assert_eq!(normalize_date(value).unwrap(), "2024-03-07", "{value}");
        }
    }

    #[test]
    fn rejects_impossible_dates() {
        assert!(parse_form_date("02/30/2024").is_err());
        assert!(parse_form_date("2024-13-01").is_err());
        assert!(parse_form_date("").is_err());
    }
}
