//! Registry table definitions.

use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

use crate::error::Result;

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 1;

const IDENTIFIER_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS identifier (
    nacc_id    INTEGER PRIMARY KEY AUTOINCREMENT,
    adc_id     INTEGER NOT NULL,
    patient_id TEXT    NOT NULL,
    guid       TEXT    UNIQUE,
    UNIQUE (adc_id, patient_id)
);
CREATE INDEX IF NOT EXISTS idx_identifier_adc_id ON identifier (adc_id);
";

/// Creates the registry tables when missing.
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)",
        [],
    )?;
    let current: Option<i32> = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .optional()?;

    match current {
        None => {
            info!(version = SCHEMA_VERSION, "creating identifier schema");
            conn.execute_batch(IDENTIFIER_SCHEMA)?;
            conn.execute(
                "INSERT INTO schema_version (version) VALUES (?1)",
                [SCHEMA_VERSION],
            )?;
        }
        Some(version) => debug!(version, "identifier schema present"),
    }
    Ok(())
}
