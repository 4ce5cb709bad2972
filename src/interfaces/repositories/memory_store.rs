use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{Map, Value};

use crate::{
    entities::plant::PlantRecord,
    errors::PersistenceError,
    repositories::{
        plant_store::{
            document_to_record, merge_document, order_records, record_to_document,
            CollectionPath, DocumentStore, Snapshot, SnapshotListener, WriteOptions,
        },
        subscription::{ListenerRegistry, Subscription},
    },
};

#[derive(Default)]
struct Collection {
    version: u64,
    documents: BTreeMap<String, Map<String, Value>>,
}

/// Process-local document store. Backs development runs and tests.
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: DashMap<String, Collection>,
    listeners: ListenerRegistry<Snapshot>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document_count(&self, path: &CollectionPath) -> usize {
        self.collections
            .get(&path.to_string())
            .map(|c| c.documents.len())
            .unwrap_or(0)
    }

    /// Collections with at least one live subscriber.
    pub fn watched_collections(&self) -> usize {
        self.listeners.source_count()
    }

    fn unordered_snapshot(&self, key: &str) -> Snapshot {
        let Some(collection) = self.collections.get(key) else {
            return Snapshot::default();
        };

        let records = collection
            .documents
            .iter()
            .filter_map(|(id, doc)| match document_to_record(id, doc.clone()) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!("Skipping document in {}: {}", key, e);
                    None
                }
            })
            .collect();

        Snapshot {
            version: collection.version,
            records,
        }
    }

    fn publish(&self, key: &str) {
        if let Some(listeners) = self.listeners.listeners(key) {
            listeners.emit(self.unordered_snapshot(key));
        }
    }
}

fn ordered(listener: SnapshotListener, order_by: String) -> SnapshotListener {
    Arc::new(move |mut snapshot: Snapshot| {
        order_records(&mut snapshot.records, &order_by);
        listener(snapshot);
    })
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn check_connection(&self) -> Result<(), PersistenceError> {
        Ok(())
    }

    async fn subscribe(
        &self,
        path: &CollectionPath,
        order_by: &str,
        listener: SnapshotListener,
    ) -> Result<Subscription, PersistenceError> {
        let key = path.to_string();
        let listener = ordered(listener, order_by.to_string());

        let subscription = self.listeners.register(&key, Arc::clone(&listener));

        listener(self.unordered_snapshot(&key));
        Ok(subscription)
    }

    async fn snapshot(&self, path: &CollectionPath, order_by: &str) -> Result<Snapshot, PersistenceError> {
        let mut snapshot = self.unordered_snapshot(&path.to_string());
        order_records(&mut snapshot.records, order_by);
        Ok(snapshot)
    }

    async fn upsert(
        &self,
        path: &CollectionPath,
        id: &str,
        record: &PlantRecord,
        options: WriteOptions,
    ) -> Result<(), PersistenceError> {
        let key = path.to_string();
        let incoming = record_to_document(record)?;

        {
            let mut collection = self.collections.entry(key.clone()).or_default();
            let merged = merge_document(collection.documents.get(id), incoming, options);
            collection.documents.insert(id.to_string(), merged);
            collection.version += 1;
        }

        self.publish(&key);
        Ok(())
    }

    async fn delete(&self, path: &CollectionPath, id: &str) -> Result<(), PersistenceError> {
        let key = path.to_string();

        {
            let mut collection = self.collections.entry(key.clone()).or_default();
            if collection.documents.remove(id).is_none() {
                return Ok(());
            }
            collection.version += 1;
        }

        self.publish(&key);
        Ok(())
    }
}
