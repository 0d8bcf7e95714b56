//! Registry trait and lookup queries.

use std::fmt;

use nacc_model::{CenterId, Guid, Identifier, IdentifierRequest, Naccid, Ptid};

use crate::error::{RepositoryError, Result};

/// Key used to look up a single identifier record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentifierQuery {
    ByNaccid(Naccid),
    ByGuid(Guid),
    ByCenter { adcid: CenterId, ptid: Ptid },
}

impl IdentifierQuery {
    pub fn center(adcid: CenterId, ptid: Ptid) -> Self {
        IdentifierQuery::ByCenter { adcid, ptid }
    }
}

impl fmt::Display for IdentifierQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentifierQuery::ByNaccid(naccid) => write!(f, "NACCID {naccid}"),
            IdentifierQuery::ByGuid(guid) => write!(f, "GUID {guid}"),
            IdentifierQuery::ByCenter { adcid, ptid } => {
                write!(f, "ADCID {adcid} and PTID {ptid}")
            }
        }
    }
}

/// Append-only registry of participant identifiers.
///
/// `(adcid, ptid)`, NACCID and GUID are each unique across records.
pub trait IdentifierRepository {
    /// Returns the record matching `query`, or `None`.
    fn find(&self, query: &IdentifierQuery) -> Result<Option<Identifier>>;

    /// Returns the record for `(adcid, ptid)`, creating it when absent.
    ///
    /// Repeated calls for the same pair return the same record. A GUID held
    /// by another participant is a [`RepositoryError::Conflict`].
    fn create(&self, request: &IdentifierRequest) -> Result<Identifier>;

    /// All records, or those of one center, ordered by NACCID.
    fn list(&self, adcid: Option<CenterId>) -> Result<Vec<Identifier>>;

    /// Like [`find`](Self::find) but a miss is an error.
    fn get(&self, query: &IdentifierQuery) -> Result<Identifier> {
        self.find(query)?
            .ok_or_else(|| RepositoryError::NoMatchingIdentifier(query.clone()))
    }

    /// Creates each request in order.
    fn create_list(&self, requests: &[IdentifierRequest]) -> Result<Vec<Identifier>> {
        requests.iter().map(|request| self.create(request)).collect()
    }
}
