//! Frequently used form field names.
//!
//! Header names are normalized to lower case before visitors see them, so
//! these constants are lower case as well.

pub struct FieldNames;

impl FieldNames {
    pub const NACCID: &'static str = "naccid";
    pub const MODULE: &'static str = "module";
    pub const PTID: &'static str = "ptid";
    pub const ADCID: &'static str = "adcid";
    pub const VISITDATE: &'static str = "visitdate";
    pub const VISITNUM: &'static str = "visitnum";
    pub const GUID: &'static str = "guid";
    pub const OLDADCID: &'static str = "oldadcid";
    pub const OLDPTID: &'static str = "oldptid";
    pub const ENRLFRM_DATE: &'static str = "frmdate_enrl";
    pub const ENRLFRM_INITIALS: &'static str = "initials_enrl";
    pub const NACCIDKNWN: &'static str = "naccidknwn";
    pub const PREVENRL: &'static str = "prevenrl";
    pub const ENRLTYPE: &'static str = "enrltype";
    pub const GUIDAVAIL: &'static str = "guidavail";
}

/// Module names with their own handling.
pub struct DefaultModules;

impl DefaultModules {
    pub const ENROLLMENT: &'static str = "enroll";
    pub const UDS: &'static str = "uds";
    pub const LBD: &'static str = "lbd";
}
