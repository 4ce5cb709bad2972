use std::{fmt, sync::Arc};

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::{
    entities::plant::PlantRecord,
    errors::PersistenceError,
    repositories::subscription::Subscription,
};

/// Field every stored plant keeps from its first write.
pub const OWNER_FIELD: &str = "addedBy";

/// Ordering the dashboard subscribes with.
pub const DEFAULT_ORDER_BY: &str = "name";

/// `artifacts/{app_id}/users/{uid}/plants`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionPath {
    app_id: String,
    uid: String,
}

impl CollectionPath {
    pub fn plants(app_id: impl Into<String>, uid: impl Into<String>) -> Self {
        CollectionPath {
            app_id: app_id.into(),
            uid: uid.into(),
        }
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn document(&self, id: &str) -> String {
        format!("{self}/{id}")
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "artifacts/{}/users/{}/plants", self.app_id, self.uid)
    }
}

/// Full ordered listing of a collection. `version` increases with every
/// change to the collection, so a receiver can drop stale deliveries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub version: u64,
    pub records: Vec<PlantRecord>,
}

pub type SnapshotListener = Arc<dyn Fn(Snapshot) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    pub merge: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        WriteOptions { merge: true }
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn check_connection(&self) -> Result<(), PersistenceError>;

    /// Delivers the current snapshot right away, then a fresh one after
    /// every write or delete in `path`.
    async fn subscribe(
        &self,
        path: &CollectionPath,
        order_by: &str,
        listener: SnapshotListener,
    ) -> Result<Subscription, PersistenceError>;

    async fn snapshot(&self, path: &CollectionPath, order_by: &str) -> Result<Snapshot, PersistenceError>;

    /// Creates the document `id` or overwrites it. With `merge`, fields the
    /// record does not carry keep their stored values.
    async fn upsert(
        &self,
        path: &CollectionPath,
        id: &str,
        record: &PlantRecord,
        options: WriteOptions,
    ) -> Result<(), PersistenceError>;

    async fn delete(&self, path: &CollectionPath, id: &str) -> Result<(), PersistenceError>;
}

/// Produces the stored form of a write. The owner field is never replaced
/// once a document has one.
pub fn merge_document(
    existing: Option<&Map<String, Value>>,
    incoming: Map<String, Value>,
    options: WriteOptions,
) -> Map<String, Value> {
    let mut merged = match existing {
        Some(current) if options.merge => current.clone(),
        _ => Map::new(),
    };

    for (key, value) in incoming {
        merged.insert(key, value);
    }

    if let Some(owner) = existing
        .and_then(|current| current.get(OWNER_FIELD))
        .filter(|owner| owner.as_str().is_some_and(|s| !s.is_empty()))
    {
        merged.insert(OWNER_FIELD.to_string(), owner.clone());
    }

    merged
}

pub fn record_to_document(record: &PlantRecord) -> Result<Map<String, Value>, PersistenceError> {
    match serde_json::to_value(record) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(PersistenceError::Malformed {
            id: record.id.clone(),
            reason: "record did not serialize to an object".to_string(),
        }),
        Err(e) => Err(PersistenceError::Malformed {
            id: record.id.clone(),
            reason: e.to_string(),
        }),
    }
}

pub fn document_to_record(id: &str, document: Map<String, Value>) -> Result<PlantRecord, PersistenceError> {
    let mut record: PlantRecord = serde_json::from_value(Value::Object(document))
        .map_err(|e| PersistenceError::Malformed {
            id: id.to_string(),
            reason: e.to_string(),
        })?;
    record.id = id.to_string();
    Ok(record)
}

/// Stable ascending order on the string-coerced `order_by` field.
pub fn order_records(records: &mut [PlantRecord], order_by: &str) {
    records.sort_by_cached_key(|record| record.field_value(order_by));
}
