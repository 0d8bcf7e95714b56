//! Behaviour shared by every registry backend.

use nacc_identifiers::{
    IdentifierBatch, IdentifierQuery, IdentifierRepository, InMemoryIdentifierRepository,
    RepositoryError, SqliteIdentifierRepository,
};
use nacc_model::{CenterId, Guid, IdentifierRequest, Ptid};
use proptest::prelude::*;

fn request(adcid: u32, ptid: &str) -> IdentifierRequest {
    IdentifierRequest::new(CenterId::new(adcid), Ptid::new(ptid).unwrap())
}

fn backends() -> Vec<(&'static str, Box<dyn IdentifierRepository>)> {
    vec![
        ("memory", Box::new(InMemoryIdentifierRepository::new())),
        (
            "sqlite",
            Box::new(SqliteIdentifierRepository::open_in_memory().unwrap()),
        ),
    ]
}

#[test]
fn create_is_get_or_create() {
    for (name, repository) in backends() {
        let first = repository.create(&request(1, "110001")).unwrap();
        let again = repository.create(&request(1, "110001")).unwrap();
        assert_eq!(first, again, "{name}");
        assert_eq!(repository.list(None).unwrap().len(), 1, "{name}");
    }
}

#[test]
fn lookups_by_every_key() {
    for (name, repository) in backends() {
        let guid = Guid::new("NIAGUID000001").unwrap();
        let created = repository
            .create(&request(2, "A1").with_guid(Some(guid.clone())))
            .unwrap();

        let by_naccid = repository
            .get(&IdentifierQuery::ByNaccid(created.naccid))
            .unwrap();
        let by_guid = repository.get(&IdentifierQuery::ByGuid(guid)).unwrap();
        let by_center = repository
            .get(&IdentifierQuery::center(CenterId::new(2), Ptid::new("A1").unwrap()))
            .unwrap();
        assert_eq!(by_naccid, created, "{name}");
        assert_eq!(by_guid, created, "{name}");
        assert_eq!(by_center, created, "{name}");
    }
}

#[test]
fn miss_is_none_and_get_is_error() {
    for (name, repository) in backends() {
        let query = IdentifierQuery::center(CenterId::new(9), Ptid::new("none").unwrap());
        assert!(repository.find(&query).unwrap().is_none(), "{name}");
        let error = repository.get(&query).unwrap_err();
        assert!(
            matches!(error, RepositoryError::NoMatchingIdentifier(_)),
            "{name}"
        );
        assert_eq!(
            error.to_string(),
            "no identifier matches ADCID 9 and PTID none"
        );
    }
}

#[test]
fn guid_of_another_participant_conflicts() {
    for (name, repository) in backends() {
        let guid = Guid::new("NIAGUID000002").unwrap();
        let owner = repository
            .create(&request(1, "a").with_guid(Some(guid.clone())))
            .unwrap();
        let result = repository.create(&request(1, "b").with_guid(Some(guid)));
        match result {
            Err(RepositoryError::Conflict { naccid, .. }) => {
                assert_eq!(naccid, owner.naccid, "{name}");
            }
            other => panic!("{name}: expected conflict, got {other:?}"),
        }
    }
}

#[test]
fn list_filters_by_center_in_naccid_order() {
    for (name, repository) in backends() {
        repository
            .create_list(&[request(1, "a"), request(2, "b"), request(1, "c")])
            .unwrap();
        let center_one: Vec<String> = repository
            .list(Some(CenterId::new(1)))
            .unwrap()
            .into_iter()
            .map(|identifier| identifier.ptid.to_string())
            .collect();
        assert_eq!(center_one, vec!["a", "c"], "{name}");
    }
}

#[test]
fn sqlite_registry_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("identifiers.db");
    let naccid = {
        let repository = SqliteIdentifierRepository::open(&path).unwrap();
        repository.create(&request(5, "p1")).unwrap().naccid
    };
    let reopened = SqliteIdentifierRepository::open(&path).unwrap();
    let found = reopened
        .get(&IdentifierQuery::center(CenterId::new(5), Ptid::new("p1").unwrap()))
        .unwrap();
    assert_eq!(found.naccid, naccid);
}

#[test]
fn batch_sees_pending_requests_and_commits_once() {
    let repository = InMemoryIdentifierRepository::new();
    let mut batch = IdentifierBatch::new(&repository);
    let ptid = Ptid::new("new").unwrap();

    assert!(!batch.has_center(CenterId::new(1), &ptid).unwrap());
    assert!(batch.add(request(1, "new")));
    assert!(!batch.add(request(1, "new")));
    assert!(batch.has_center(CenterId::new(1), &ptid).unwrap());
    assert!(repository.list(None).unwrap().is_empty());

    let created = batch.commit().unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(repository.list(None).unwrap(), created);
}

proptest! {
    #[test]
    fn repeated_creates_return_same_naccid(
        pairs in prop::collection::vec((0u32..5, "[a-z0-9]{1,10}"), 1..20)
    ) {
        let repository = InMemoryIdentifierRepository::new();
        for (adcid, ptid) in &pairs {
            let first = repository.create(&request(*adcid, ptid)).unwrap();
            let second = repository.create(&request(*adcid, ptid)).unwrap();
            prop_assert_eq!(first.naccid, second.naccid);
            let found = repository
                .get(&IdentifierQuery::center(CenterId::new(*adcid), Ptid::new(ptid.as_str()).unwrap()))
                .unwrap();
            prop_assert_eq!(found.naccid, first.naccid);
        }
    }
}
