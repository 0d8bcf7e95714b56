//! APOE genotype transform.
//!
//! Converts the pair of alleles reported by the genotyping lab into the
//! single NACC APOE code.

use std::str::FromStr;

use nacc_ingest::{CsvRow, CsvVisitor, ErrorWriter, require_columns};
use nacc_model::FileError;

pub const APOE_INPUT_COLUMNS: [&str; 5] = ["adcid", "ptid", "naccid", "a1", "a2"];
pub const APOE_OUTPUT_COLUMNS: [&str; 4] = ["adcid", "ptid", "naccid", "apoe"];

/// Code for any pair outside the known genotypes.
pub const APOE_UNKNOWN: u8 = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Allele {
    E2,
    E3,
    E4,
}

impl FromStr for Allele {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "E2" => Ok(Allele::E2),
            "E3" => Ok(Allele::E3),
            "E4" => Ok(Allele::E4),
            _ => Err(()),
        }
    }
}

/// NACC code for an unordered allele pair.
pub fn apoe_code(a1: &str, a2: &str) -> u8 {
    let (Ok(first), Ok(second)) = (a1.parse::<Allele>(), a2.parse::<Allele>()) else {
        return APOE_UNKNOWN;
    };
    match (first.min(second), first.max(second)) {
        (Allele::E3, Allele::E3) => 1,
        (Allele::E3, Allele::E4) => 2,
        (Allele::E2, Allele::E3) => 3,
        (Allele::E4, Allele::E4) => 4,
        (Allele::E2, Allele::E4) => 5,
        (Allele::E2, Allele::E2) => 6,
        _ => APOE_UNKNOWN,
    }
}

/// Replaces `a1`/`a2` with `apoe` and drops every other non-output column.
pub fn transform_row(row: &CsvRow) -> CsvRow {
    let a1 = row.get("a1").map_or("", String::as_str);
    let a2 = row.get("a2").map_or("", String::as_str);
    let mut output: CsvRow = row
        .iter()
        .filter(|(name, _)| APOE_OUTPUT_COLUMNS.contains(&name.as_str()))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect();
    output.insert("apoe".to_string(), apoe_code(a1, a2).to_string());
    output
}

/// Collects transformed rows. Rows never fail.
#[derive(Debug, Default)]
pub struct ApoeVisitor {
    rows: Vec<CsvRow>,
}

impl ApoeVisitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[CsvRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<CsvRow> {
        self.rows
    }
}

impl CsvVisitor for ApoeVisitor {
    fn visit_header(&mut self, header: &[String]) -> Result<(), FileError> {
        require_columns(header, &APOE_INPUT_COLUMNS)
    }

    fn visit_row(
        &mut self,
        row: &CsvRow,
        _line: u64,
        _errors: &mut dyn ErrorWriter,
    ) -> nacc_ingest::Result<bool> {
        self.rows.push(transform_row(row));
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_are_unordered() {
        assert_eq!(apoe_code("E3", "E4"), 2);
        assert_eq!(apoe_code("E4", "E3"), 2);
        assert_eq!(apoe_code("e2", " E4 "), 5);
    }

    #[test]
    fn full_table() {
        let table = [
            ("E3", "E3", 1),
            ("E3", "E4", 2),
            ("E3", "E2", 3),
            ("E4", "E4", 4),
            ("E4", "E2", 5),
            ("E2", "E2", 6),
        ];
        for (a1, a2, code) in table {
            assert_eq!(apoe_code(a1, a2), code, "{a1}/{a2}");
        }
    }

    #[test]
    fn unknown_alleles_map_to_nine() {
        assert_eq!(apoe_code("", "E3"), APOE_UNKNOWN);
        assert_eq!(apoe_code("E1", "E3"), APOE_UNKNOWN);
        assert_eq!(apoe_code("NA", "NA"), APOE_UNKNOWN);
    }
}
