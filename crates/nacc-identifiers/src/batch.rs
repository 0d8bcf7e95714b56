//! Deferred identifier creation for a single file pass.

use std::collections::HashSet;

use nacc_model::{CenterId, CenterIdentifiers, Guid, Identifier, IdentifierRequest, Ptid};
use tracing::info;

use crate::error::Result;
use crate::{IdentifierQuery, IdentifierRepository};

/// Collects creation requests while a file is validated and commits them
/// afterwards.
///
/// Lookups see both the repository and the pending requests, so a file that
/// enrolls the same participant twice is caught before anything is written.
pub struct IdentifierBatch<'a> {
    repository: &'a dyn IdentifierRepository,
    pending: Vec<IdentifierRequest>,
    pending_centers: HashSet<CenterIdentifiers>,
    pending_guids: HashSet<Guid>,
}

impl<'a> IdentifierBatch<'a> {
    pub fn new(repository: &'a dyn IdentifierRepository) -> Self {
        Self {
            repository,
            pending: Vec::new(),
            pending_centers: HashSet::new(),
            pending_guids: HashSet::new(),
        }
    }

    pub fn repository(&self) -> &'a dyn IdentifierRepository {
        self.repository
    }

    /// Queues a request. Returns false when the pair is already queued.
    pub fn add(&mut self, request: IdentifierRequest) -> bool {
        let key = CenterIdentifiers::new(request.adcid, request.ptid.clone());
        if !self.pending_centers.insert(key) {
            return false;
        }
        if let Some(guid) = &request.guid {
            self.pending_guids.insert(guid.clone());
        }
        self.pending.push(request);
        true
    }

    pub fn pending(&self) -> &[IdentifierRequest] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Whether the pair is registered or queued.
    pub fn has_center(&self, adcid: CenterId, ptid: &Ptid) -> Result<bool> {
        let key = CenterIdentifiers::new(adcid, ptid.clone());
        if self.pending_centers.contains(&key) {
            return Ok(true);
        }
        Ok(self
            .repository
            .find(&IdentifierQuery::center(adcid, ptid.clone()))?
            .is_some())
    }

    /// Whether the GUID is registered or queued.
    pub fn has_guid(&self, guid: &Guid) -> Result<bool> {
        if self.pending_guids.contains(guid) {
            return Ok(true);
        }
        Ok(self
            .repository
            .find(&IdentifierQuery::ByGuid(guid.clone()))?
            .is_some())
    }

    /// Creates the queued identifiers in the order they were added.
    pub fn commit(self) -> Result<Vec<Identifier>> {
        if self.pending.is_empty() {
            return Ok(Vec::new());
        }
        let created = self.repository.create_list(&self.pending)?;
        info!(count = created.len(), "committed identifier batch");
        Ok(created)
    }
}
