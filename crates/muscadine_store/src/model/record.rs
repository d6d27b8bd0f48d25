//! Record capability and identifier helpers.
//!
//! # Invariants
//! - Identifiers are stored under [`ID_FIELD`] in every backend.
//! - A record whose serialized `_id` is missing, null or empty receives a
//!   generated UUID v4 at insert time; a non-string `_id` is rejected.

use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

/// Stable identifier of a stored document.
pub type RecordId = String;

/// Document field holding the identifier.
pub const ID_FIELD: &str = "_id";

/// Capability of a type that can be stored as a document.
///
/// Implementors map their identifier field to [`ID_FIELD`] in their serde
/// representation, typically with `#[serde(rename = "_id")]`, so documents
/// read back from a store populate it.
///
/// ```
/// use muscadine_store::Record;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Post {
///     #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
///     id: Option<String>,
///     body: String,
/// }
///
/// impl Record for Post {
///     fn id(&self) -> Option<&str> {
///         self.id.as_deref()
///     }
/// }
/// ```
pub trait Record: Serialize + DeserializeOwned + Send + Sync {
    /// Caller-assigned identifier, if any.
    fn id(&self) -> Option<&str>;
}

/// Generates a fresh random identifier (hyphenated UUID v4, 36 chars).
pub fn generate_id() -> RecordId {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::{generate_id, Record};
    use serde::{Deserialize, Serialize};
    use std::collections::HashSet;

    #[derive(Serialize, Deserialize)]
    struct Tag {
        #[serde(rename = "_id")]
        id: Option<String>,
    }

    impl Record for Tag {
        fn id(&self) -> Option<&str> {
            self.id.as_deref()
        }
    }

    #[test]
    fn generated_ids_are_hyphenated_uuids() {
        let id = generate_id();
        assert_eq!(id.len(), 36);
        assert_eq!(id.matches('-').count(), 4);
    }

    #[test]
    fn generated_ids_do_not_repeat() {
        let ids: HashSet<_> = (0..10_000).map(|_| generate_id()).collect();
        assert_eq!(ids.len(), 10_000);
    }

    #[test]
    fn record_exposes_caller_identifier() {
        let tag = Tag {
            id: Some("rust".to_string()),
        };
        assert_eq!(tag.id(), Some("rust"));
        assert_eq!(Tag { id: None }.id(), None);
    }
}
