//! Gear runs against files on disk.

use std::fs;

use nacc_cli::config::{ConfigError, GearConfig};
use nacc_cli::runner::{run_apoe, run_provision, run_split_centers, run_transform};
use nacc_identifiers::{IdentifierRepository, SqliteIdentifierRepository};
use nacc_model::{CenterId, ErrorCode, Guid, IdentifierRequest, ModuleName, Ptid};

const ENROLLMENT_HEADER: &str = "module,enrltype,adcid,ptid,guid,guidavail,frmdate_enrl,\
initials_enrl,oldadcid,oldptid,naccidknwn,naccid,prevenrl";

#[test]
fn apoe_writes_codes_next_to_input() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("apoe.csv");
    fs::write(&input, "ADCID,PTID,NACCID,A1,A2\n1,5,,E2,E2\n2,6,,e4,E3\n").unwrap();
    let output = dir.path().join("out").join("apoe-coded.csv");

    let run = run_apoe(&input, &output).unwrap();
    assert!(run.succeeded);
    assert!(!run.has_errors());
    assert_eq!(run.stats.rows, 2);
    assert_eq!(run.outputs, vec![output.clone()]);
    assert_eq!(
        fs::read_to_string(&output).unwrap(),
        "adcid,ptid,naccid,apoe\n1,5,,6\n2,6,,2\n"
    );
}

#[test]
fn apoe_rejected_header_writes_no_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("apoe.csv");
    fs::write(&input, "adcid,ptid,a1\n1,5,E2\n").unwrap();
    let output = dir.path().join("apoe-coded.csv");

    let run = run_apoe(&input, &output).unwrap();
    assert!(!run.succeeded);
    assert!(run.has_errors());
    assert_eq!(run.errors.errors()[0].code, ErrorCode::MissingHeader);
    assert!(!output.exists());
}

#[test]
fn center_split_writes_one_directory_per_center() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("visits.csv");
    fs::write(&input, "adcid,ptid\n1,A\n,B\n2,C\n").unwrap();
    let output_dir = dir.path().join("split");

    let run = run_split_centers(&input, &output_dir, None).unwrap();
    assert!(run.succeeded);
    assert_eq!(
        fs::read_to_string(output_dir.join("adcid-1").join("visits.csv")).unwrap(),
        "adcid,ptid\n1,A\n,B\n"
    );
    assert_eq!(
        fs::read_to_string(output_dir.join("adcid-2").join("visits.csv")).unwrap(),
        "adcid,ptid\n2,C\n"
    );
}

#[test]
fn provisioning_commits_to_database_and_lists_transfers() {
    let dir = tempfile::tempdir().unwrap();
    let database = dir.path().join("identifiers.db");
    {
        let repository = SqliteIdentifierRepository::open(&database).unwrap();
        repository
            .create(
                &IdentifierRequest::new(CenterId::new(1), Ptid::new("OLD1").unwrap())
                    .with_guid(Some(Guid::new("NIAGUID000001").unwrap())),
            )
            .unwrap();
    }

    let input = dir.path().join("ptenrl-enroll.csv");
    let rows = [
        "enroll,1,1,NEW1,,0,01/15/2024,AB,,,0,,0",
        "enroll,1,1,OLD1,,0,01/15/2024,AB,,,0,,0",
        "enroll,2,2,T1,,0,2024-02-01,CD,1,OLD1,0,,1",
    ];
    fs::write(&input, format!("{ENROLLMENT_HEADER}\n{}\n", rows.join("\n"))).unwrap();
    let transfers = dir.path().join("transfers.yaml");
    let errors = dir.path().join("errors.csv");

    let repository = SqliteIdentifierRepository::open(&database).unwrap();
    let (run, outcome) = run_provision(
        &input,
        Some(&transfers),
        &repository,
        ModuleName::new("enroll").unwrap(),
    )
    .unwrap();
    assert!(run.has_errors());
    assert_eq!(run.errors.error_count(), 1);
    assert_eq!(run.errors.alert_count(), 1);
    assert_eq!(outcome.transfers.len(), 1);
    assert!(transfers.is_file());

    insta::assert_json_snapshot!(outcome.identifiers, @r#"
    [
      {
        "naccid": "NACC000002",
        "adcid": 1,
        "ptid": "NEW1"
      }
    ]
    "#);
    assert_eq!(repository.list(Some(CenterId::new(1))).unwrap().len(), 2);

    run.errors.save(&errors).unwrap();
    let report = fs::read_to_string(&errors).unwrap();
    let mut lines = report.lines();
    assert_eq!(
        lines.next(),
        Some("type,code,location,container_id,value,expected,message")
    );
    assert_eq!(lines.count(), 2);
    assert!(report.contains("ptenrl-enroll.csv"));
}

#[test]
fn transform_writes_one_json_list_per_subject() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("visits-uds.csv");
    fs::write(
        &input,
        "naccid,ptid,module,visitnum,visitdate\n\
NACC000001,P1,UDS,1,01/02/2024\n\
NACC000001,P1,UDS,2,2024-03-04\n\
NACC000002,P2,UDS,1,2024-03-04\n",
    )
    .unwrap();
    let output_dir = dir.path().join("subjects");

    let run = run_transform(&input, &output_dir, None).unwrap();
    assert!(run.succeeded);
    assert_eq!(run.outputs.len(), 2);
    let text = fs::read_to_string(output_dir.join("NACC000001.json")).unwrap();
    let records: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(records.as_array().map(Vec::len), Some(2));
    assert_eq!(records[0]["visitdate"], "2024-01-02");
    assert_eq!(records[1]["visitnum"], "2");
}

#[test]
fn config_file_overrides_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nacc.toml");
    fs::write(
        &path,
        "[identifiers]\ndatabase = \"ids.db\"\n\n[scheduler]\nmodule_order = [\"enroll\", \"UDS\"]\n\n[lookup]\nadcid = 7\nmodule = \"uds\"\n",
    )
    .unwrap();

    let config = GearConfig::load(Some(&path)).unwrap();
    assert_eq!(config.database().unwrap(), std::path::Path::new("ids.db"));
    let order: Vec<String> = config
        .module_order()
        .unwrap()
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(order, vec!["enroll", "uds"]);
    assert_eq!(config.lookup_center().unwrap(), CenterId::new(7));
    assert_eq!(config.lookup.date_field, "visitdate");
    assert_eq!(config.scheduler.queue_tags, vec!["queued"]);
}

#[test]
fn unknown_config_keys_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nacc.toml");
    fs::write(&path, "[lookup]\ncenter = 7\n").unwrap();
    assert!(matches!(
        GearConfig::load(Some(&path)),
        Err(ConfigError::Parse { .. })
    ));
}
