use serde::{Deserialize, Serialize};

use crate::{CenterId, Guid, Naccid, Ptid};

/// Center scoped identifiers for a participant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CenterIdentifiers {
    pub adcid: CenterId,
    pub ptid: Ptid,
}

impl CenterIdentifiers {
    pub fn new(adcid: CenterId, ptid: Ptid) -> Self {
        Self { adcid, ptid }
    }
}

/// Registry record mapping a center participant to its NACCID.
///
/// Records are append-only: created once by provisioning, never updated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identifier {
    pub naccid: Naccid,
    pub adcid: CenterId,
    pub ptid: Ptid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<Guid>,
}

impl Identifier {
    pub fn center_identifiers(&self) -> CenterIdentifiers {
        CenterIdentifiers::new(self.adcid, self.ptid.clone())
    }
}

/// Request to provision a NACCID for a center participant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentifierRequest {
    pub adcid: CenterId,
    pub ptid: Ptid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<Guid>,
}

impl IdentifierRequest {
    pub fn new(adcid: CenterId, ptid: Ptid) -> Self {
        Self {
            adcid,
            ptid,
            guid: None,
        }
    }

    #[must_use]
    pub fn with_guid(mut self, guid: Option<Guid>) -> Self {
        self.guid = guid;
        self
    }
}
