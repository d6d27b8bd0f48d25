use muscadine_store::{Record, RecordService, SqliteDocumentStore, StoreError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Item {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    name: String,
}

impl Record for Item {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

fn service() -> RecordService<SqliteDocumentStore> {
    RecordService::new(SqliteDocumentStore::open_in_memory("items").unwrap())
}

#[tokio::test]
async fn require_returns_existing_record() {
    let service = service();
    let id = service
        .create(&Item {
            id: None,
            name: "muscadine".to_string(),
        })
        .await
        .unwrap();

    let item: Item = service.require(&id).await.unwrap();
    assert_eq!(item.name, "muscadine");
    assert_eq!(item.id, Some(id));
}

#[tokio::test]
async fn require_missing_record_returns_not_found() {
    let service = service();
    let err = service.require::<Item>("missing").await.unwrap_err();

    assert!(matches!(err, StoreError::NotFound(ref id) if id == "missing"));
    assert_eq!(err.to_string(), "could not find document with id missing");
}

#[tokio::test]
async fn get_and_list_delegate_to_store() {
    let service = service();
    for name in ["zeta", "alpha"] {
        service
            .create(&Item {
                id: Some(name.to_string()),
                name: name.to_string(),
            })
            .await
            .unwrap();
    }

    let items: Vec<Item> = service.list().await.unwrap();
    let names: Vec<_> = items.iter().map(|item| item.name.as_str()).collect();
    assert_eq!(names, ["alpha", "zeta"]);
    assert!(service.get::<Item>("beta").await.unwrap().is_none());
}
