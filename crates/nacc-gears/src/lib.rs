//! Row visitors for the NACC gears.
//!
//! Each gear reads one CSV file through [`nacc_ingest::read_csv`] with one of
//! the visitors below and writes its own output once the pass completes.

mod apoe;
mod error;
mod lookup;
mod provisioning;
mod split;
mod transform;

// === Error Types ===
pub use error::{GearError, Result};

// === Form Transforms ===
pub use apoe::{
    APOE_INPUT_COLUMNS, APOE_OUTPUT_COLUMNS, APOE_UNKNOWN, ApoeVisitor, apoe_code, transform_row,
};
pub use transform::{
    DateTransformer, FieldFilter, FieldTransformations, FilterTransformer, FormModule,
    RecordTransformer, TRANSFORM_REQUIRED_COLUMNS, TransformVisitor, TransformerChain,
    TransformerFactory, VersionMap,
};

// === Splitters ===
pub use split::{CenterSplitVisitor, SubjectSplitVisitor};

// === Identifiers ===
pub use lookup::{CenterLookupVisitor, NaccidLookupVisitor};
pub use provisioning::{
    EnrollmentKind, PROVISIONING_COLUMNS, ProvisioningOutcome, ProvisioningVisitor,
};
