//! Data model shared by the NACC gears: participant identifiers, identifier
//! registry records, enrollment records and the structured file errors
//! reported against input files.

pub mod dates;
pub mod enrollment;
pub mod error;
pub mod file_error;
pub mod identifier;
pub mod ids;
pub mod keys;
pub mod lookup;

pub use dates::{DATE_FORMATS, normalize_date, parse_form_date};
pub use enrollment::{EnrollmentRecord, TransferRecord};
pub use error::{ModelError, Result};
pub use file_error::{ErrorCode, ErrorLocation, ErrorType, FileError, FileErrorRecord};
pub use identifier::{CenterIdentifiers, Identifier, IdentifierRequest};
pub use ids::{CenterId, Guid, ModuleName, NACCID_MAX, Naccid, PTID_MAX_LEN, Ptid};
pub use keys::{DefaultModules, FieldNames};
pub use lookup::CaseInsensitiveSet;
