//! In-memory registry.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use nacc_model::{CenterId, CenterIdentifiers, Guid, Identifier, IdentifierRequest, Naccid};
use tracing::debug;

use crate::error::{RepositoryError, Result};
use crate::{IdentifierQuery, IdentifierRepository};

#[derive(Debug, Default)]
struct Registry {
    records: BTreeMap<Naccid, Identifier>,
    by_center: HashMap<CenterIdentifiers, Naccid>,
    by_guid: HashMap<Guid, Naccid>,
    next: u64,
}

impl Registry {
    fn insert(&mut self, identifier: Identifier) {
        let naccid = identifier.naccid;
        self.by_center.insert(identifier.center_identifiers(), naccid);
        if let Some(guid) = &identifier.guid {
            self.by_guid.insert(guid.clone(), naccid);
        }
        self.next = self.next.max(u64::from(naccid.number()) + 1);
        self.records.insert(naccid, identifier);
    }
}

/// Registry held in process memory.
///
/// NACCIDs are allocated sequentially from 1. Useful for tests and dry runs.
#[derive(Debug)]
pub struct InMemoryIdentifierRepository {
    registry: Mutex<Registry>,
}

impl Default for InMemoryIdentifierRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryIdentifierRepository {
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(Registry {
                next: 1,
                ..Registry::default()
            }),
        }
    }

    /// Registry seeded with existing records.
    pub fn with_identifiers(identifiers: impl IntoIterator<Item = Identifier>) -> Self {
        let repository = Self::new();
        if let Ok(mut registry) = repository.registry.lock() {
            for identifier in identifiers {
                registry.insert(identifier);
            }
        }
        repository
    }

    fn lock(&self) -> Result<MutexGuard<'_, Registry>> {
        self.registry
            .lock()
            .map_err(|_| RepositoryError::LockPoisoned)
    }
}

impl IdentifierRepository for InMemoryIdentifierRepository {
    fn find(&self, query: &IdentifierQuery) -> Result<Option<Identifier>> {
        let registry = self.lock()?;
        let naccid = match query {
            IdentifierQuery::ByNaccid(naccid) => Some(*naccid),
            IdentifierQuery::ByGuid(guid) => registry.by_guid.get(guid).copied(),
            IdentifierQuery::ByCenter { adcid, ptid } => registry
                .by_center
                .get(&CenterIdentifiers::new(*adcid, ptid.clone()))
                .copied(),
        };
        Ok(naccid.and_then(|naccid| registry.records.get(&naccid).cloned()))
    }

    fn create(&self, request: &IdentifierRequest) -> Result<Identifier> {
        let mut registry = self.lock()?;
        let key = CenterIdentifiers::new(request.adcid, request.ptid.clone());
        if let Some(naccid) = registry.by_center.get(&key)
            && let Some(existing) = registry.records.get(naccid)
        {
            return Ok(existing.clone());
        }
        if let Some(guid) = &request.guid
            && let Some(naccid) = registry.by_guid.get(guid)
        {
            return Err(RepositoryError::Conflict {
                guid: guid.clone(),
                naccid: *naccid,
            });
        }

        let naccid = Naccid::from_number(registry.next).map_err(|_| RepositoryError::Exhausted)?;
        let identifier = Identifier {
            naccid,
            adcid: request.adcid,
            ptid: request.ptid.clone(),
            guid: request.guid.clone(),
        };
        registry.insert(identifier.clone());
        debug!(%naccid, adcid = %request.adcid, "allocated identifier");
        Ok(identifier)
    }

    fn list(&self, adcid: Option<CenterId>) -> Result<Vec<Identifier>> {
        let registry = self.lock()?;
        Ok(registry
            .records
            .values()
            .filter(|identifier| adcid.is_none_or(|adcid| identifier.adcid == adcid))
            .cloned()
            .collect())
    }
}
