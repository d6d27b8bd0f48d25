//! Embedded document database backing `SqliteDocumentStore`.
//!
//! # Responsibility
//! - Open SQLite connections with the document schema in place.
//! - Own every SQL statement touching the `documents` table.
//!
//! # Invariants
//! - No document is read or written before `schema::ensure_schema` succeeds.

pub(crate) mod documents;
pub mod schema;

use crate::store::{StoreError, StoreResult};
use log::{error, info};
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens (or creates) a database file with the document schema applied.
pub fn open_db(path: impl AsRef<Path>) -> StoreResult<Connection> {
    open_with("file", || Connection::open(path))
}

pub fn open_db_in_memory() -> StoreResult<Connection> {
    open_with("memory", Connection::open_in_memory)
}

fn open_with(
    mode: &'static str,
    connect: impl FnOnce() -> rusqlite::Result<Connection>,
) -> StoreResult<Connection> {
    let started_at = Instant::now();
    let result: StoreResult<Connection> = connect()
        .map_err(StoreError::from)
        .and_then(|mut conn| -> StoreResult<Connection> {
            conn.busy_timeout(BUSY_TIMEOUT)?;
            schema::ensure_schema(&mut conn)?;
            Ok(conn)
        });

    let duration_ms = started_at.elapsed().as_millis();
    match &result {
        Ok(_) => info!("event=db_open module=db status=ok mode={mode} duration_ms={duration_ms}"),
        Err(err) => error!(
            "event=db_open module=db status=error mode={mode} duration_ms={duration_ms} error={err}"
        ),
    }
    result
}
