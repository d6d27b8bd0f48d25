//! MongoDB-backed document store.
//!
//! # Responsibility
//! - Open a verified session to one database collection.
//! - Translate records to and from BSON documents.
//!
//! # Invariants
//! - `open` pings the server, so a returned store has reached it once.
//! - The store holds no locks; the client pools connections internally.

use crate::config::StoreConfig;
use crate::model::record::{Record, RecordId, ID_FIELD};
use crate::store::{
    log_outcome, resolve_id_field, DocumentStore, IdField, StoreError, StoreResult,
};
use async_trait::async_trait;
use futures_util::TryStreamExt;
use log::{error, info};
use mongodb::bson::{self, doc, Bson, Document as BsonDocument};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection, Database};
use std::fmt::{Debug, Formatter};
use std::time::{Duration, Instant};

const BACKEND: &str = "mongo";
const APP_NAME: &str = "muscadine";
const DUPLICATE_KEY_CODE: i32 = 11000;

/// Connection descriptor for one collection.
///
/// Cheap to clone; clones share the underlying client.
#[derive(Clone)]
pub struct MongoDocumentStore {
    host_name: String,
    database_name: String,
    collection_name: String,
    client: Client,
    database: Database,
    collection: Collection<BsonDocument>,
}

impl Debug for MongoDocumentStore {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoDocumentStore")
            .field("host_name", &self.host_name)
            .field("database_name", &self.database_name)
            .field("collection_name", &self.collection_name)
            .finish_non_exhaustive()
    }
}

impl MongoDocumentStore {
    /// Connects to `host_name` with the given credentials and resolves the
    /// named database and collection.
    ///
    /// # Errors
    /// - `Config` when the parameters do not form a valid connection string.
    /// - `Connection` when the server is unreachable or rejects the
    ///   credentials. Nothing is retried.
    pub async fn open(
        host_name: &str,
        database_name: &str,
        collection_name: &str,
        username: &str,
        password: &str,
    ) -> StoreResult<Self> {
        let config = StoreConfig::new(
            host_name,
            database_name,
            collection_name,
            username,
            password,
        );
        Self::open_with_config(&config).await
    }

    pub async fn open_with_config(config: &StoreConfig) -> StoreResult<Self> {
        config.validate()?;
        let uri = config.connection_string()?;

        let started_at = Instant::now();
        info!(
            "event=store_open module=store backend={BACKEND} status=start host={} database={} collection={}",
            config.host, config.database, config.collection
        );

        let timeout = Duration::from_millis(config.server_selection_timeout_ms);
        let (client, database) = match connect(&uri, &config.database, timeout).await {
            Ok(handles) => handles,
            Err(source) => {
                error!(
                    "event=store_open module=store backend={BACKEND} status=error host={} duration_ms={} error_code=connection_failed error={}",
                    config.host,
                    started_at.elapsed().as_millis(),
                    source
                );
                return Err(StoreError::Connection {
                    host: config.host.clone(),
                    source,
                });
            }
        };
        let collection = database.collection::<BsonDocument>(&config.collection);

        info!(
            "event=store_open module=store backend={BACKEND} status=ok host={} duration_ms={}",
            config.host,
            started_at.elapsed().as_millis()
        );

        Ok(Self {
            host_name: config.host.clone(),
            database_name: config.database.clone(),
            collection_name: config.collection.clone(),
            client,
            database,
            collection,
        })
    }

    pub fn host_name(&self) -> &str {
        &self.host_name
    }

    pub fn database_name(&self) -> &str {
        &self.database_name
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn collection(&self) -> &Collection<BsonDocument> {
        &self.collection
    }

    async fn fetch_all<T: Record>(&self) -> StoreResult<Vec<T>> {
        let mut sort = BsonDocument::new();
        sort.insert(ID_FIELD, 1);

        let mut cursor = self.collection.find(doc! {}).sort(sort).await?;
        let mut records = Vec::new();
        while let Some(document) = cursor.try_next().await? {
            records.push(bson::from_document(document)?);
        }
        Ok(records)
    }

    async fn fetch_one<T: Record>(&self, id: &str) -> StoreResult<Option<T>> {
        let found = self.collection.find_one(id_filter(id)).await?;
        match found {
            Some(document) => Ok(Some(bson::from_document(document)?)),
            None => Ok(None),
        }
    }

    async fn write_one<T: Record>(&self, record: &T) -> StoreResult<RecordId> {
        let (id, document) = prepare_document(record)?;

        match self.collection.insert_one(document).await {
            Ok(_) => Ok(id),
            Err(err) if is_duplicate_key(&err) => Err(StoreError::DuplicateIdentifier(id)),
            Err(err) => Err(err.into()),
        }
    }
}

#[async_trait]
impl DocumentStore for MongoDocumentStore {
    fn collection_name(&self) -> &str {
        &self.collection_name
    }

    async fn list_all<T: Record>(&self) -> StoreResult<Vec<T>> {
        let started_at = Instant::now();
        let result = self.fetch_all().await;
        log_outcome("doc_list", BACKEND, &self.collection_name, started_at, &result);
        result
    }

    async fn get_by_id<T: Record>(&self, id: &str) -> StoreResult<Option<T>> {
        let started_at = Instant::now();
        let result = self.fetch_one(id).await;
        log_outcome("doc_get", BACKEND, &self.collection_name, started_at, &result);
        result
    }

    async fn insert<T: Record>(&self, record: &T) -> StoreResult<RecordId> {
        let started_at = Instant::now();
        let result = self.write_one(record).await;
        log_outcome("doc_insert", BACKEND, &self.collection_name, started_at, &result);
        result
    }
}

async fn connect(
    uri: &str,
    database_name: &str,
    server_selection_timeout: Duration,
) -> mongodb::error::Result<(Client, Database)> {
    let mut options = ClientOptions::parse(uri).await?;
    options.app_name = Some(APP_NAME.to_string());
    options.server_selection_timeout = Some(server_selection_timeout);

    let client = Client::with_options(options)?;
    let database = client.database(database_name);
    database.run_command(doc! { "ping": 1 }).await?;
    Ok((client, database))
}

/// Converts `record` to BSON with a resolved string `_id`.
fn prepare_document<T: Record>(record: &T) -> StoreResult<(RecordId, BsonDocument)> {
    let mut document = bson::to_document(record)?;
    let field = match document.get(ID_FIELD) {
        None | Some(Bson::Null) => IdField::Missing,
        Some(Bson::String(id)) => IdField::Text(id.as_str()),
        Some(other) => IdField::Other(format!("{:?}", other.element_type())),
    };
    let id = resolve_id_field(field)?;
    document.insert(ID_FIELD, id.as_str());
    Ok((id, document))
}

fn id_filter(id: &str) -> BsonDocument {
    let mut filter = BsonDocument::new();
    filter.insert(ID_FIELD, id);
    filter
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        &*err.kind,
        ErrorKind::Write(WriteFailure::WriteError(write_error))
            if write_error.code == DUPLICATE_KEY_CODE
    )
}

#[cfg(test)]
mod tests {
    use super::{id_filter, prepare_document};
    use crate::model::document::Document;
    use crate::model::record::Record;
    use crate::store::StoreError;
    use mongodb::bson::{self, Bson};
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize)]
    struct Score(u32);

    impl Record for Score {
        fn id(&self) -> Option<&str> {
            None
        }
    }

    fn document(value: serde_json::Value) -> Document {
        Document::from_value(value).unwrap()
    }

    #[test]
    fn prepare_document_keeps_string_id() {
        let (id, prepared) = prepare_document(&document(serde_json::json!({"_id": "p1", "n": 1}))).unwrap();
        assert_eq!(id, "p1");
        assert_eq!(prepared.get_str("_id").unwrap(), "p1");
        assert_eq!(prepared.len(), 2);
    }

    #[test]
    fn prepare_document_fills_missing_and_null_ids() {
        for value in [serde_json::json!({"n": 1}), serde_json::json!({"_id": null, "n": 1})] {
            let (id, prepared) = prepare_document(&document(value)).unwrap();
            assert_eq!(id.len(), 36);
            assert_eq!(prepared.get_str("_id").unwrap(), id);
        }
    }

    #[test]
    fn prepare_document_rejects_non_string_id() {
        let err = prepare_document(&document(serde_json::json!({"_id": 7}))).unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }

    #[test]
    fn prepare_document_rejects_non_map_records() {
        let err = prepare_document(&Score(3)).unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }

    #[test]
    fn id_filter_matches_exact_identifier() {
        let filter = id_filter("post-1");
        assert_eq!(filter.len(), 1);
        assert_eq!(filter.get_str("_id").unwrap(), "post-1");
    }

    #[test]
    fn untyped_documents_convert_to_bson_maps() {
        let record = Document::from_value(serde_json::json!({"_id": "a", "tags": ["x"]})).unwrap();
        let converted = bson::to_document(&record).unwrap();
        assert_eq!(converted.get("_id"), Some(&Bson::String("a".to_string())));

        let back: Document = bson::from_document(converted).unwrap();
        assert_eq!(back, record);
    }
}
