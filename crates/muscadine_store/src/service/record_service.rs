//! Record use-case service.
//!
//! # Invariants
//! - Service APIs never bypass store identifier and duplicate rules.
//! - `NotFound` is raised here, never by a store.

use crate::model::record::{Record, RecordId};
use crate::store::{DocumentStore, StoreError, StoreResult};
use log::info;

/// Use-case wrapper around a single-collection store.
#[derive(Debug, Clone)]
pub struct RecordService<S: DocumentStore> {
    store: S,
}

impl<S: DocumentStore> RecordService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Lists all records ordered by id.
    pub async fn list<T: Record>(&self) -> StoreResult<Vec<T>> {
        self.store.list_all().await
    }

    /// Gets one record if it exists.
    pub async fn get<T: Record>(&self, id: &str) -> StoreResult<Option<T>> {
        self.store.get_by_id(id).await
    }

    /// Gets one record that must exist.
    ///
    /// # Errors
    /// - `StoreError::NotFound(id)` when no document has this id.
    pub async fn require<T: Record>(&self, id: &str) -> StoreResult<T> {
        self.store
            .get_by_id(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Creates a record and returns its stable id.
    pub async fn create<T: Record>(&self, record: &T) -> StoreResult<RecordId> {
        let id_source = match record.id() {
            Some(id) if !id.is_empty() => "caller",
            _ => "generated",
        };
        let id = self.store.insert(record).await?;
        info!(
            "event=record_create module=service status=ok collection={} id={} id_source={}",
            self.store.collection_name(),
            id,
            id_source
        );
        Ok(id)
    }
}
