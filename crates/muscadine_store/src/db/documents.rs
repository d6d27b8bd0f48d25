//! Statements over the `documents` table.

use crate::store::{StoreError, StoreResult};
use rusqlite::{params, Connection, OptionalExtension};

/// JSON bodies of one collection, ascending by id (binary collation).
pub(crate) fn select_bodies(conn: &Connection, collection: &str) -> StoreResult<Vec<String>> {
    let mut stmt =
        conn.prepare_cached("SELECT body FROM documents WHERE collection = ?1 ORDER BY id ASC;")?;
    let bodies = stmt
        .query_map([collection], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(bodies)
}

pub(crate) fn select_body(conn: &Connection, collection: &str, id: &str) -> StoreResult<Option<String>> {
    let body = conn
        .prepare_cached("SELECT body FROM documents WHERE collection = ?1 AND id = ?2;")?
        .query_row(params![collection, id], |row| row.get::<_, String>(0))
        .optional()?;
    Ok(body)
}

/// Inserts one body; an existing `(collection, id)` is left untouched.
pub(crate) fn insert_body(conn: &Connection, collection: &str, id: &str, body: &str) -> StoreResult<()> {
    let result = conn
        .prepare_cached("INSERT INTO documents (collection, id, body) VALUES (?1, ?2, ?3);")?
        .execute(params![collection, id, body]);

    match result {
        Ok(_) => Ok(()),
        Err(err) if is_primary_key_violation(&err) => {
            Err(StoreError::DuplicateIdentifier(id.to_string()))
        }
        Err(err) => Err(err.into()),
    }
}

fn is_primary_key_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}
