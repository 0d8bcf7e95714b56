//! Strongly typed participant and center identifiers.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::ModelError;

/// Maximum length of a center assigned participant ID.
pub const PTID_MAX_LEN: usize = 10;

/// Largest number that fits the six digit NACCID format.
pub const NACCID_MAX: u32 = 999_999;

static NACCID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^NACC(\d{6})$").expect("valid NACCID pattern"));

static GUID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]{13,20}$").expect("valid GUID pattern"));

static MODULE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]+$").expect("valid module pattern"));

/// Center identifier (ADCID).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CenterId(u32);

impl CenterId {
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

impl FromStr for CenterId {
    type Err = ModelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        value
            .trim()
            .parse::<u32>()
            .map(Self)
            .map_err(|_| ModelError::InvalidCenterId(value.to_string()))
    }
}

impl fmt::Display for CenterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Participant ID assigned by a center.
///
/// Trimmed, non-empty and at most [`PTID_MAX_LEN`] characters.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ptid(String);

impl Ptid {
    pub fn new(value: impl Into<String>) -> Result<Self, ModelError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ModelError::InvalidPtid {
                value,
                reason: "must not be empty",
            });
        }
        if trimmed.chars().count() > PTID_MAX_LEN {
            return Err(ModelError::InvalidPtid {
                value,
                reason: "must be at most 10 characters",
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Ptid {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Ptid> for String {
    fn from(value: Ptid) -> Self {
        value.0
    }
}

impl FromStr for Ptid {
    type Err = ModelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::new(value)
    }
}

impl fmt::Display for Ptid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Global participant identifier, rendered as `NACC` plus six digits.
///
/// The numeric part is the registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Naccid(u32);

impl Naccid {
    pub fn from_number(number: u64) -> Result<Self, ModelError> {
        u32::try_from(number)
            .ok()
            .filter(|value| *value <= NACCID_MAX)
            .map(Self)
            .ok_or(ModelError::NaccidOutOfRange(number))
    }

    pub const fn number(self) -> u32 {
        self.0
    }
}

impl FromStr for Naccid {
    type Err = ModelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let captures = NACCID_PATTERN
            .captures(trimmed)
            .ok_or_else(|| ModelError::InvalidNaccid(value.to_string()))?;
        captures[1]
            .parse::<u32>()
            .map(Self)
            .map_err(|_| ModelError::InvalidNaccid(value.to_string()))
    }
}

impl TryFrom<String> for Naccid {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Naccid> for String {
    fn from(value: Naccid) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Naccid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NACC{:06}", self.0)
    }
}

/// External participant GUID.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Guid(String);

impl Guid {
    pub fn new(value: impl Into<String>) -> Result<Self, ModelError> {
        let value = value.into();
        let trimmed = value.trim();
        if !GUID_PATTERN.is_match(trimmed) {
            return Err(ModelError::InvalidGuid(value));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Guid {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Guid> for String {
    fn from(value: Guid) -> Self {
        value.0
    }
}

impl FromStr for Guid {
    type Err = ModelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::new(value)
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Form module name, stored lower-case (e.g. `uds`, `enroll`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModuleName(String);

impl ModuleName {
    pub fn new(value: impl Into<String>) -> Result<Self, ModelError> {
        let value = value.into();
        let normalized = value.trim().to_ascii_lowercase();
        if !MODULE_PATTERN.is_match(&normalized) {
            return Err(ModelError::InvalidModule(value));
        }
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ModuleName {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ModuleName> for String {
    fn from(value: ModuleName) -> Self {
        value.0
    }
}

impl FromStr for ModuleName {
    type Err = ModelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::new(value)
    }
}

impl fmt::Display for ModuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn naccid_renders_zero_padded() {
        let naccid = Naccid::from_number(42).unwrap();
        assert_eq!(naccid.to_string(), "NACC000042");
        assert_eq!("NACC000042".parse::<Naccid>().unwrap(), naccid);
    }

    #[test]
    fn naccid_rejects_bad_format() {
        assert!("NACC12345".parse::<Naccid>().is_err());
        assert!("nacc123456".parse::<Naccid>().is_err());
        assert!("NACC1234567".parse::<Naccid>().is_err());
        assert!(Naccid::from_number(1_000_000).is_err());
    }

    #[test]
    fn ptid_is_trimmed_and_bounded() {
        assert_eq!(Ptid::new("  110001 ").unwrap().as_str(), "110001");
        assert!(Ptid::new("   ").is_err());
        assert!(Ptid::new("12345678901").is_err());
    }

    #[test]
    fn center_id_parses_non_negative() {
        assert_eq!("0".parse::<CenterId>().unwrap(), CenterId::new(0));
        assert_eq!(" 43 ".parse::<CenterId>().unwrap(), CenterId::new(43));
        assert!("-1".parse::<CenterId>().is_err());
        assert!("hello".parse::<CenterId>().is_err());
    }

    #[test]
    fn guid_requires_pattern() {
        assert!(Guid::new("NIAGUID000001").is_ok());
        assert!(Guid::new("short").is_err());
        assert!(Guid::new("has spaces in it!").is_err());
    }

    #[test]
    fn module_name_is_lower_cased() {
        assert_eq!(ModuleName::new("UDS").unwrap().as_str(), "uds");
        assert!(ModuleName::new("uds-v4").is_err());
        assert!(ModuleName::new("").is_err());
    }
}
