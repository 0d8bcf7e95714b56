//! SQLite backed registry.
//!
//! Uniqueness of `(adc_id, patient_id)` and `guid` is enforced by the table.
//! Creation runs in an immediate transaction, inserts with `ON CONFLICT DO
//! NOTHING` on the pair and re-reads the row, so a record created
//! concurrently by another process is returned rather than duplicated. A
//! GUID claimed by another pair is a `Conflict` whether it is seen before or
//! during the insert. NACCIDs come from the integer primary key.

pub mod schema;

use std::path::Path;
use std::sync::Mutex;

use nacc_model::{CenterId, Guid, Identifier, IdentifierRequest, Naccid, Ptid};
use rusqlite::{Connection, ErrorCode, OptionalExtension, Row, TransactionBehavior, params};
use tracing::{debug, info};

use crate::error::{RepositoryError, Result};
use crate::{IdentifierQuery, IdentifierRepository};

const SELECT_COLUMNS: &str = "SELECT nacc_id, adc_id, patient_id, guid FROM identifier";

/// Raw column values of one `identifier` row.
struct IdentifierRow {
    nacc_id: i64,
    adc_id: i64,
    patient_id: String,
    guid: Option<String>,
}

impl IdentifierRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            nacc_id: row.get(0)?,
            adc_id: row.get(1)?,
            patient_id: row.get(2)?,
            guid: row.get(3)?,
        })
    }

    fn into_identifier(self) -> Result<Identifier> {
        let number = u64::try_from(self.nacc_id).map_err(|_| RepositoryError::Exhausted)?;
        let naccid = Naccid::from_number(number).map_err(|_| RepositoryError::Exhausted)?;
        let adcid = u32::try_from(self.adc_id)
            .map(CenterId::new)
            .map_err(|_| nacc_model::ModelError::InvalidCenterId(self.adc_id.to_string()))?;
        Ok(Identifier {
            naccid,
            adcid,
            ptid: Ptid::new(self.patient_id)?,
            guid: self.guid.map(Guid::new).transpose()?,
        })
    }
}

/// Registry stored in a SQLite database.
pub struct SqliteIdentifierRepository {
    conn: Mutex<Connection>,
}

impl SqliteIdentifierRepository {
    /// Opens or creates the registry database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        info!(path = %path.display(), "opening identifier database");
        let conn = Connection::open(path).map_err(|source| RepositoryError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        Self::with_connection(conn)
    }

    /// Opens an empty in-memory registry.
    pub fn open_in_memory() -> Result<Self> {
        debug!("opening in-memory identifier database");
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        schema::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self.conn.lock().map_err(|_| RepositoryError::LockPoisoned)?;
        f(&mut conn)
    }
}

fn query_one(conn: &Connection, query: &IdentifierQuery) -> Result<Option<Identifier>> {
    let row = match query {
        IdentifierQuery::ByNaccid(naccid) => conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE nacc_id = ?1"),
                [i64::from(naccid.number())],
                IdentifierRow::from_row,
            )
            .optional()?,
        IdentifierQuery::ByGuid(guid) => conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE guid = ?1"),
                [guid.as_str()],
                IdentifierRow::from_row,
            )
            .optional()?,
        IdentifierQuery::ByCenter { adcid, ptid } => conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE adc_id = ?1 AND patient_id = ?2"),
                params![i64::from(adcid.get()), ptid.as_str()],
                IdentifierRow::from_row,
            )
            .optional()?,
    };
    row.map(IdentifierRow::into_identifier).transpose()
}

/// Fails with `Conflict` when `guid` already belongs to a record.
fn guid_conflict(conn: &Connection, guid: &Guid) -> Result<()> {
    match query_one(conn, &IdentifierQuery::ByGuid(guid.clone()))? {
        Some(owner) => Err(RepositoryError::Conflict {
            guid: guid.clone(),
            naccid: owner.naccid,
        }),
        None => Ok(()),
    }
}

/// Inserts the request unless its `(adcid, ptid)` pair exists.
///
/// A uniqueness failure can only come from the GUID column and is reported
/// as a `Conflict` with the GUID's owner.
fn insert_request(conn: &Connection, request: &IdentifierRequest) -> Result<()> {
    let inserted = conn.execute(
        "INSERT INTO identifier (adc_id, patient_id, guid) VALUES (?1, ?2, ?3)
         ON CONFLICT (adc_id, patient_id) DO NOTHING",
        params![
            i64::from(request.adcid.get()),
            request.ptid.as_str(),
            request.guid.as_ref().map(Guid::as_str),
        ],
    );
    match (inserted, &request.guid) {
        (Ok(_), _) => Ok(()),
        (Err(error), Some(guid))
            if error.sqlite_error_code() == Some(ErrorCode::ConstraintViolation) =>
        {
            guid_conflict(conn, guid)?;
            Err(error.into())
        }
        (Err(error), _) => Err(error.into()),
    }
}

impl IdentifierRepository for SqliteIdentifierRepository {
    fn find(&self, query: &IdentifierQuery) -> Result<Option<Identifier>> {
        self.with_conn(|conn| query_one(conn, query))
    }

    fn create(&self, request: &IdentifierRequest) -> Result<Identifier> {
        let center = IdentifierQuery::center(request.adcid, request.ptid.clone());
        self.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            if let Some(existing) = query_one(&tx, &center)? {
                return Ok(existing);
            }
            if let Some(guid) = &request.guid {
                guid_conflict(&tx, guid)?;
            }

            insert_request(&tx, request)?;
            let created = query_one(&tx, &center)?
                .ok_or_else(|| RepositoryError::NoMatchingIdentifier(center.clone()))?;
            tx.commit()?;
            debug!(naccid = %created.naccid, adcid = %request.adcid, "allocated identifier");
            Ok(created)
        })
    }

    fn list(&self, adcid: Option<CenterId>) -> Result<Vec<Identifier>> {
        self.with_conn(|conn| {
            let rows = match adcid {
                Some(adcid) => {
                    let mut statement = conn.prepare(&format!(
                        "{SELECT_COLUMNS} WHERE adc_id = ?1 ORDER BY nacc_id"
                    ))?;
                    let rows = statement
                        .query_map([i64::from(adcid.get())], IdentifierRow::from_row)?
                        .collect::<rusqlite::Result<Vec<_>>>()?;
                    rows
                }
                None => {
                    let mut statement =
                        conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY nacc_id"))?;
                    let rows = statement
                        .query_map([], IdentifierRow::from_row)?
                        .collect::<rusqlite::Result<Vec<_>>>()?;
                    rows
                }
            };
            rows.into_iter().map(IdentifierRow::into_identifier).collect()
        })
    }
}
