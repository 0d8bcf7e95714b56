//! Participant identifier registry.
//!
//! Maps a center participant `(adcid, ptid)` to a global NACCID. The
//! registry is append-only: records are created by provisioning and never
//! changed. Two backends implement [`IdentifierRepository`]:
//! [`InMemoryIdentifierRepository`] and [`SqliteIdentifierRepository`].

mod batch;
mod error;
mod memory;
mod repository;
pub mod sqlite;

pub use batch::IdentifierBatch;
pub use error::{RepositoryError, Result};
pub use memory::InMemoryIdentifierRepository;
pub use repository::{IdentifierQuery, IdentifierRepository};
pub use sqlite::SqliteIdentifierRepository;
