//! Document store contract and backend implementations.
//!
//! # Responsibility
//! - Define the typed CRUD contract shared by all backends.
//! - Map backend failures to one error taxonomy.
//!
//! # Invariants
//! - `list_all` orders documents ascending by `_id`.
//! - `get_by_id` reports a missing document as `Ok(None)`, never as an error.
//! - `insert` never overwrites: an existing `_id` yields
//!   `StoreError::DuplicateIdentifier`.

use crate::config::ConfigError;
use crate::model::record::{generate_id, Record, RecordId, ID_FIELD};
use async_trait::async_trait;
use log::{debug, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

pub mod mongo;
pub mod sqlite;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug)]
pub enum StoreError {
    /// The database could not be reached or refused the credentials.
    Connection {
        host: String,
        source: mongodb::error::Error,
    },
    Mongo(mongodb::error::Error),
    Sqlite(rusqlite::Error),
    /// The embedded database was written by a newer schema.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    Config(ConfigError),
    Serialization(String),
    DuplicateIdentifier(RecordId),
    NotFound(RecordId),
    InvalidArgument(String),
    Task(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connection { host, source } => {
                write!(f, "cannot connect to document database at {host}: {source}")
            }
            Self::Mongo(err) => write!(f, "{err}"),
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "document database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::Config(err) => write!(f, "{err}"),
            Self::Serialization(message) => write!(f, "document serialization failed: {message}"),
            Self::DuplicateIdentifier(id) => write!(f, "document already exists: {id}"),
            Self::NotFound(id) => write!(f, "could not find document with id {id}"),
            Self::InvalidArgument(message) => write!(f, "{message}"),
            Self::Task(message) => write!(f, "store task failed: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Connection { source, .. } => Some(source),
            Self::Mongo(err) => Some(err),
            Self::Sqlite(err) => Some(err),
            Self::Config(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. }
            | Self::Serialization(_)
            | Self::DuplicateIdentifier(_)
            | Self::NotFound(_)
            | Self::InvalidArgument(_)
            | Self::Task(_) => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<ConfigError> for StoreError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<mongodb::error::Error> for StoreError {
    fn from(value: mongodb::error::Error) -> Self {
        Self::Mongo(value)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value.to_string())
    }
}

impl From<mongodb::bson::ser::Error> for StoreError {
    fn from(value: mongodb::bson::ser::Error) -> Self {
        Self::Serialization(value.to_string())
    }
}

impl From<mongodb::bson::de::Error> for StoreError {
    fn from(value: mongodb::bson::de::Error) -> Self {
        Self::Serialization(value.to_string())
    }
}

/// Typed access to one collection of a document database.
///
/// Operations are independent request/response exchanges; no transactions
/// span calls. Implementations are safe to share across tasks.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Name of the collection this store reads and writes.
    fn collection_name(&self) -> &str;

    /// Returns every document in the collection, ascending by `_id`.
    async fn list_all<T: Record>(&self) -> StoreResult<Vec<T>>;

    /// Returns the document whose `_id` equals `id`, if any.
    async fn get_by_id<T: Record>(&self, id: &str) -> StoreResult<Option<T>>;

    /// Writes `record` as a new document and returns the `_id` used.
    ///
    /// # Errors
    /// - `DuplicateIdentifier` when a document with the same id exists.
    /// - `Serialization` when `record` does not serialize to a map.
    async fn insert<T: Record>(&self, record: &T) -> StoreResult<RecordId>;
}

/// The `_id` entry of a serialized record, as seen by a backend.
pub(crate) enum IdField<'a> {
    Missing,
    Text(&'a str),
    /// Present but not a string; carries the value's type name.
    Other(String),
}

/// Decides the identifier an insert writes.
///
/// Missing, null or empty ids get a generated one. A string id is kept.
/// Any other value is rejected so the caller's id is never replaced.
pub(crate) fn resolve_id_field(field: IdField<'_>) -> StoreResult<RecordId> {
    match field {
        IdField::Missing => Ok(generate_id()),
        IdField::Text(id) if id.is_empty() => Ok(generate_id()),
        IdField::Text(id) => Ok(id.to_string()),
        IdField::Other(kind) => Err(StoreError::Serialization(format!(
            "`{ID_FIELD}` must be a string, got {kind}"
        ))),
    }
}

pub(crate) fn validate_name(kind: &str, value: &str) -> StoreResult<()> {
    if value.trim().is_empty() {
        return Err(StoreError::InvalidArgument(format!(
            "{kind} name cannot be empty"
        )));
    }
    Ok(())
}

/// Emits one metadata-only `event=<event>` line for a finished operation.
pub(crate) fn log_outcome<T>(
    event: &str,
    backend: &str,
    collection: &str,
    started_at: Instant,
    result: &StoreResult<T>,
) {
    let duration_ms = started_at.elapsed().as_millis();
    match result {
        Ok(_) => debug!(
            "event={event} module=store backend={backend} status=ok collection={collection} duration_ms={duration_ms}"
        ),
        Err(err) => warn!(
            "event={event} module=store backend={backend} status=error collection={collection} duration_ms={duration_ms} error_code={} error={err}",
            error_code(err)
        ),
    }
}

fn error_code(err: &StoreError) -> &'static str {
    match err {
        StoreError::Connection { .. } => "connection_failed",
        StoreError::Mongo(_) => "mongo_failed",
        StoreError::Sqlite(_) => "sqlite_failed",
        StoreError::UnsupportedSchemaVersion { .. } => "unsupported_schema",
        StoreError::Config(_) => "invalid_config",
        StoreError::Serialization(_) => "serialization_failed",
        StoreError::DuplicateIdentifier(_) => "duplicate_identifier",
        StoreError::NotFound(_) => "not_found",
        StoreError::InvalidArgument(_) => "invalid_argument",
        StoreError::Task(_) => "task_failed",
    }
}
