use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{CenterIdentifiers, Guid, Naccid};

/// Transfer of a participant between centers, as reported on an enrollment
/// form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub date: NaiveDate,
    pub initials: String,
    pub center_identifiers: CenterIdentifiers,
    #[serde(default)]
    pub previous_identifiers: Option<CenterIdentifiers>,
    #[serde(default)]
    pub naccid: Option<Naccid>,
}

/// Enrollment of a participant at a center.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentRecord {
    pub center_identifiers: CenterIdentifiers,
    #[serde(default)]
    pub naccid: Option<Naccid>,
    #[serde(default)]
    pub guid: Option<Guid>,
    pub start_date: NaiveDate,
}
