//! Typed document storage for the Muscadine site back-office.
//!
//! Generic list/get/insert over one collection of a document database,
//! with a MongoDB backend and an embedded SQLite backend that share one
//! contract.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod service;
pub mod store;

pub use config::{load_config, ConfigError, StoreConfig};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::document::Document;
pub use model::record::{generate_id, Record, RecordId, ID_FIELD};
pub use service::record_service::RecordService;
pub use store::mongo::MongoDocumentStore;
pub use store::sqlite::SqliteDocumentStore;
pub use store::{DocumentStore, StoreError, StoreResult};

/// Returns the store crate version.
pub fn store_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
