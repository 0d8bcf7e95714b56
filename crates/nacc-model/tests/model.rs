//! Tests for nacc-model types.

use chrono::NaiveDate;
use nacc_model::{
    CenterId, CenterIdentifiers, ErrorCode, ErrorType, FileError, Identifier, Naccid, Ptid,
    TransferRecord,
};
use proptest::prelude::*;

#[test]
fn identifier_serializes_with_string_naccid() {
    let identifier = Identifier {
        naccid: Naccid::from_number(7).unwrap(),
        adcid: CenterId::new(1),
        ptid: Ptid::new("110001").unwrap(),
        guid: None,
    };
    let json = serde_json::to_value(&identifier).expect("serialize identifier");
    assert_eq!(
        json,
        serde_json::json!({"naccid": "NACC000007", "adcid": 1, "ptid": "110001"})
    );
}

#[test]
fn transfer_alert_is_not_an_error() {
    let alert = nacc_model::file_error::transfer_alert("enrltype", 4, "Transfer to center 2");
    assert_eq!(alert.error_type, ErrorType::Alert);
    assert_eq!(alert.code, ErrorCode::Transfer);
    assert!(!alert.is_error());
    assert_eq!(alert.line(), Some(4));
}

#[test]
fn file_error_json_uses_kebab_codes() {
    let error = nacc_model::file_error::empty_field_error(&["naccid"], 2);
    let json = serde_json::to_value(&error).unwrap();
    assert_eq!(json["type"], "error");
    assert_eq!(json["code"], "empty-field");
    assert_eq!(json["location"]["line"], 2);
    assert_eq!(json["location"]["column_name"], "naccid");

    let back: FileError = serde_json::from_value(json).unwrap();
    assert_eq!(back, error);
}

#[test]
fn transfer_record_serializes_dates_as_iso() {
    let record = TransferRecord {
        date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
        initials: "AB".to_string(),
        center_identifiers: CenterIdentifiers::new(CenterId::new(2), Ptid::new("22").unwrap()),
        previous_identifiers: Some(CenterIdentifiers::new(
            CenterId::new(1),
            Ptid::new("11").unwrap(),
        )),
        naccid: Some("NACC000001".parse().unwrap()),
    };
    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["date"], "2024-05-01");
    assert_eq!(json["naccid"], "NACC000001");
    assert_eq!(json["previous_identifiers"]["adcid"], 1);
}

proptest! {
    #[test]
    fn naccid_display_parses_back(number in 0u64..=999_999) {
        let naccid = Naccid::from_number(number).unwrap();
        let text = naccid.to_string();
        prop_assert_eq!(text.len(), 10);
        prop_assert_eq!(text.parse::<Naccid>().unwrap(), naccid);
    }
}
