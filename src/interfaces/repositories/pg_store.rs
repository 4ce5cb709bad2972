use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{types::Json, PgPool, Postgres, Transaction};

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

/// Plant documents kept as JSONB rows keyed by `(collection, id)`.
///
/// Change notifications are fanned out in-process after each committed
/// write, so subscribers see changes made through this instance.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
    listeners: ListenerRegistry<Snapshot>,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        PgDocumentStore {
            pool,
            listeners: ListenerRegistry::new(),
        }
    }

    async fn read_snapshot(&self, collection: &str) -> Result<Snapshot, PersistenceError> {
        let mut tx = self.pool.begin().await?;

        let version: Option<i64> = sqlx::query_scalar(
            "SELECT version FROM plant_collections WHERE collection = $1",
        )
        .bind(collection)
        .fetch_optional(&mut *tx)
        .await?;

        let rows: Vec<(String, Json<Map<String, Value>>)> = sqlx::query_as(
            "SELECT id, data FROM plant_documents WHERE collection = $1",
        )
        .bind(collection)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await?;

        let records = rows
            .into_iter()
            .filter_map(|(id, Json(doc))| match document_to_record(&id, doc) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!("Skipping document in {}: {}", collection, e);
                    None
                }
            })
            .collect();

        Ok(Snapshot {
            version: version.unwrap_or(0).max(0) as u64,
            records,
        })
    }

    async fn bump_version(tx: &mut Transaction<'_, Postgres>, collection: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO plant_collections (collection, version)
            VALUES ($1, 1)
            ON CONFLICT (collection)
            DO UPDATE SET version = plant_collections.version + 1
            "#,
        )
        .bind(collection)
        .execute(&mut **tx)
        .await
        .map(|_| ())
    }

    async fn publish(&self, collection: &str) {
        let Some(listeners) = self.listeners.listeners(collection) else {
            return;
        };

        match self.read_snapshot(collection).await {
            Ok(snapshot) => listeners.emit(snapshot),
            Err(e) => tracing::error!("Failed to refresh snapshot for {}: {}", collection, e),
        }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn check_connection(&self) -> Result<(), PersistenceError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(PersistenceError::from)
    }

    async fn subscribe(
        &self,
        path: &CollectionPath,
        order_by: &str,
        listener: SnapshotListener,
    ) -> Result<Subscription, PersistenceError> {
        let collection = path.to_string();
        let order_by = order_by.to_string();

        let initial = self.read_snapshot(&collection).await.map_err(|e| PersistenceError::Subscribe {
            path: collection.clone(),
            reason: e.to_string(),
        })?;

        let listener: SnapshotListener = Arc::new(move |mut snapshot: Snapshot| {
            order_records(&mut snapshot.records, &order_by);
            listener(snapshot);
        });

        let subscription = self.listeners.register(&collection, Arc::clone(&listener));

        listener(initial);
        Ok(subscription)
    }

    async fn snapshot(&self, path: &CollectionPath, order_by: &str) -> Result<Snapshot, PersistenceError> {
        let mut snapshot = self.read_snapshot(&path.to_string()).await?;
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
        let collection = path.to_string();
        let incoming = record_to_document(record)?;
        let write_error = |e: sqlx::Error| PersistenceError::Write {
            id: id.to_string(),
            reason: e.to_string(),
        };

        let mut tx = self.pool.begin().await.map_err(write_error)?;

        let existing: Option<Json<Map<String, Value>>> = sqlx::query_scalar(
            "SELECT data FROM plant_documents WHERE collection = $1 AND id = $2 FOR UPDATE",
        )
        .bind(&collection)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(write_error)?;

        let merged = merge_document(existing.as_ref().map(|Json(doc)| doc), incoming, options);

        sqlx::query(
            r#"
            INSERT INTO plant_documents (collection, id, data, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (collection, id)
            DO UPDATE SET data = EXCLUDED.data, updated_at = NOW()
            "#,
        )
        .bind(&collection)
        .bind(id)
        .bind(Json(merged))
        .execute(&mut *tx)
        .await
        .map_err(write_error)?;

        Self::bump_version(&mut tx, &collection).await.map_err(write_error)?;
        tx.commit().await.map_err(write_error)?;

        self.publish(&collection).await;
        Ok(())
    }

    async fn delete(&self, path: &CollectionPath, id: &str) -> Result<(), PersistenceError> {
        let collection = path.to_string();
        let delete_error = |e: sqlx::Error| PersistenceError::Delete {
            id: id.to_string(),
            reason: e.to_string(),
        };

        let mut tx = self.pool.begin().await.map_err(delete_error)?;

        let result = sqlx::query("DELETE FROM plant_documents WHERE collection = $1 AND id = $2")
            .bind(&collection)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(delete_error)?;

        if result.rows_affected() > 0 {
            Self::bump_version(&mut tx, &collection).await.map_err(delete_error)?;
        }
        tx.commit().await.map_err(delete_error)?;

        if result.rows_affected() > 0 {
            self.publish(&collection).await;
        }
        Ok(())
    }
}
