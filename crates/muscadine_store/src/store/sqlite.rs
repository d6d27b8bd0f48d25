//! Embedded SQLite-backed document store.
//!
//! # Responsibility
//! - Provide the `DocumentStore` contract without a database server.
//! - Keep documents as JSON text keyed by `(collection, id)`.
//!
//! # Invariants
//! - Listing orders by `id` with binary collation.
//! - Blocking SQLite calls run on the blocking thread pool while holding the
//!   connection lock; the lock is never held across an await.

use crate::db::{documents, open_db, open_db_in_memory};
use crate::model::record::{Record, RecordId, ID_FIELD};
use crate::store::{
    log_outcome, resolve_id_field, validate_name, DocumentStore, IdField, StoreError, StoreResult,
};
use async_trait::async_trait;
use rusqlite::Connection;
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;

const BACKEND: &str = "sqlite";

/// Document store over one collection of an embedded database.
#[derive(Clone)]
pub struct SqliteDocumentStore {
    conn: Arc<Mutex<Connection>>,
    collection: String,
}

impl SqliteDocumentStore {
    /// Opens (or creates) a database file and binds to `collection`.
    pub fn open(path: impl AsRef<Path>, collection: impl Into<String>) -> StoreResult<Self> {
        let collection = collection.into();
        validate_name("collection", &collection)?;
        Ok(Self::from_connection(open_db(path)?, collection))
    }

    pub fn open_in_memory(collection: impl Into<String>) -> StoreResult<Self> {
        let collection = collection.into();
        validate_name("collection", &collection)?;
        Ok(Self::from_connection(open_db_in_memory()?, collection))
    }

    /// Returns a store for another collection sharing this connection.
    pub fn with_collection(&self, collection: impl Into<String>) -> StoreResult<Self> {
        let collection = collection.into();
        validate_name("collection", &collection)?;
        Ok(Self {
            conn: Arc::clone(&self.conn),
            collection,
        })
    }

    fn from_connection(conn: Connection, collection: String) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            collection,
        }
    }

    async fn run<R, F>(&self, task: F) -> StoreResult<R>
    where
        F: FnOnce(&Connection, &str) -> StoreResult<R> + Send + 'static,
        R: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let collection = self.collection.clone();
        tokio::task::spawn_blocking(move || -> StoreResult<R> {
            let guard = conn
                .lock()
                .map_err(|_| StoreError::Task("sqlite connection lock poisoned".to_string()))?;
            task(&*guard, collection.as_str())
        })
        .await
        .map_err(|err| StoreError::Task(err.to_string()))?
    }

    async fn fetch_all<T: Record>(&self) -> StoreResult<Vec<T>> {
        let bodies = self
            .run(|conn, collection| documents::select_bodies(conn, collection))
            .await?;

        bodies
            .iter()
            .map(|body| serde_json::from_str(body).map_err(StoreError::from))
            .collect()
    }

    async fn fetch_one<T: Record>(&self, id: &str) -> StoreResult<Option<T>> {
        let id = id.to_string();
        let body = self
            .run(move |conn, collection| documents::select_body(conn, collection, &id))
            .await?;

        body.map(|body| serde_json::from_str(&body).map_err(StoreError::from))
            .transpose()
    }

    async fn write_one<T: Record>(&self, record: &T) -> StoreResult<RecordId> {
        let (id, body) = prepare_body(record)?;
        let row_id = id.clone();
        self.run(move |conn, collection| documents::insert_body(conn, collection, &row_id, &body))
            .await?;
        Ok(id)
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    fn collection_name(&self) -> &str {
        &self.collection
    }

    async fn list_all<T: Record>(&self) -> StoreResult<Vec<T>> {
        let started_at = Instant::now();
        let result = self.fetch_all().await;
        log_outcome("doc_list", BACKEND, &self.collection, started_at, &result);
        result
    }

    async fn get_by_id<T: Record>(&self, id: &str) -> StoreResult<Option<T>> {
        let started_at = Instant::now();
        let result = self.fetch_one(id).await;
        log_outcome("doc_get", BACKEND, &self.collection, started_at, &result);
        result
    }

    async fn insert<T: Record>(&self, record: &T) -> StoreResult<RecordId> {
        let started_at = Instant::now();
        let result = self.write_one(record).await;
        log_outcome("doc_insert", BACKEND, &self.collection, started_at, &result);
        result
    }
}

/// Serializes `record` to a JSON object with a resolved string `_id`.
fn prepare_body<T: Record>(record: &T) -> StoreResult<(RecordId, String)> {
    let mut fields = match serde_json::to_value(record)? {
        Value::Object(fields) => fields,
        other => {
            return Err(StoreError::Serialization(format!(
                "record must serialize to a map, got {}",
                json_kind(&other)
            )));
        }
    };
    let field = match fields.get(ID_FIELD) {
        None | Some(Value::Null) => IdField::Missing,
        Some(Value::String(id)) => IdField::Text(id.as_str()),
        Some(other) => IdField::Other(json_kind(other).to_string()),
    };
    let id = resolve_id_field(field)?;
    fields.insert(ID_FIELD.to_string(), Value::String(id.clone()));
    Ok((id, serde_json::to_string(&fields)?))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
