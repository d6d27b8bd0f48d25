//! Document table schema and version check.
//!
//! # Invariants
//! - The schema version lives in `PRAGMA user_version`.
//! - A database stamped with a newer version is refused, never modified.
//! - Stored bodies are valid JSON and collection names are non-empty.

use crate::store::{StoreError, StoreResult};
use rusqlite::Connection;

/// Version stamped on databases created by this build.
pub const SCHEMA_VERSION: u32 = 1;

const CREATE_DOCUMENTS: &str = "CREATE TABLE documents (
    collection TEXT NOT NULL CHECK (length(collection) > 0),
    id TEXT NOT NULL,
    body TEXT NOT NULL CHECK (json_valid(body)),
    PRIMARY KEY (collection, id)
) WITHOUT ROWID;";

/// Creates the document table on a fresh database, or checks that an
/// existing one carries a supported version.
pub fn ensure_schema(conn: &mut Connection) -> StoreResult<()> {
    match schema_version(conn)? {
        0 => {
            let tx = conn.transaction()?;
            tx.execute_batch(CREATE_DOCUMENTS)?;
            tx.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION};"))?;
            tx.commit()?;
            Ok(())
        }
        SCHEMA_VERSION => Ok(()),
        db_version => Err(StoreError::UnsupportedSchemaVersion {
            db_version,
            latest_supported: SCHEMA_VERSION,
        }),
    }
}

pub fn schema_version(conn: &Connection) -> StoreResult<u32> {
    let version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}
