use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Bson, Document as BsonDocument},
    error::{ErrorKind, WriteFailure},
    options::IndexOptions,
    Collection, IndexModel,
};
use std::future::Future;
use std::marker::PhantomData;
use std::time::Duration;

use super::connection::{ConnectionManager, ConnectionStatus, MongoConnector};
use super::metrics::record_store_operation;
use super::store::{DocumentStore, StoreError};
use crate::config::MongoSettings;
use crate::models::Document;

const DUPLICATE_KEY: i32 = 11000;

/// MongoDB-backed [`DocumentStore`], one collection per instance.
pub struct MongoStore<T> {
    manager: ConnectionManager<MongoConnector>,
    database: String,
    collection: String,
    timeout: Duration,
    _kind: PhantomData<fn() -> T>,
}

impl<T: Document> MongoStore<T> {
    pub fn new(settings: MongoSettings) -> Self {
        Self {
            database: settings.database.clone(),
            collection: settings.collection.clone(),
            timeout: settings.timeout,
            manager: ConnectionManager::new(MongoConnector::new(settings.clone()), settings.timeout),
            _kind: PhantomData,
        }
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.manager.status()
    }

    async fn documents(&self) -> Result<Collection<T>, StoreError> {
        let client = self.manager.connect().await?;
        Ok(client.database(&self.database).collection(&self.collection))
    }

    /// Run `op` under the per-operation timeout and record its outcome.
    async fn bounded<R, F>(&self, operation: &'static str, op: F) -> Result<R, StoreError>
    where
        F: Future<Output = Result<R, StoreError>>,
    {
        let result = match tokio::time::timeout(self.timeout, op).await {
            Ok(result) => result,
            Err(_) => {
                tracing::error!(
                    collection = %self.collection,
                    operation,
                    timeout = ?self.timeout,
                    "Store operation timed out"
                );
                Err(StoreError::Unavailable(format!(
                    "{} timed out after {:?}",
                    operation, self.timeout
                )))
            }
        };
        record_store_operation(T::KIND, operation, &result);
        result
    }

    async fn exists(&self, documents: &Collection<T>, id: &str) -> Result<bool, StoreError> {
        let found = documents
            .find_one(doc! { "id": id }, None)
            .await
            .map_err(|e| {
                tracing::error!(collection = %self.collection, id, "Failed to look up document: {}", e);
                StoreError::unavailable(e)
            })?;
        Ok(found.is_some())
    }

    fn not_found(id: &str) -> StoreError {
        StoreError::NotFound {
            kind: T::KIND,
            id: id.to_string(),
        }
    }

    /// Unique index on the identifier field. A duplicate insert that slips
    /// past the existence check is then rejected by the server.
    pub async fn init_indexes(&self) -> Result<(), StoreError> {
        self.bounded("init_indexes", async {
            let index = IndexModel::builder()
                .keys(doc! { "id": 1 })
                .options(
                    IndexOptions::builder()
                        .name(format!("{}_id_idx", T::KIND))
                        .unique(true)
                        .build(),
                )
                .build();

            self.documents()
                .await?
                .create_index(index, None)
                .await
                .map_err(|e| {
                    tracing::error!(collection = %self.collection, "Failed to create id index: {}", e);
                    StoreError::unavailable(e)
                })?;

            tracing::info!(collection = %self.collection, "Store indexes initialized");
            Ok(())
        })
        .await
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == DUPLICATE_KEY
    )
}

#[async_trait]
impl<T: Document> DocumentStore<T> for MongoStore<T> {
    async fn create_document(&self, id: &str, document: &T) -> Result<(), StoreError> {
        self.bounded("create", async {
            let documents = self.documents().await?;
            if self.exists(&documents, id).await? {
                return Err(StoreError::Conflict {
                    kind: T::KIND,
                    id: id.to_string(),
                });
            }

            documents.insert_one(document, None).await.map_err(|e| {
                if is_duplicate_key(&e) {
                    StoreError::Conflict {
                        kind: T::KIND,
                        id: id.to_string(),
                    }
                } else {
                    tracing::error!(collection = %self.collection, id, "Failed to insert document: {}", e);
                    StoreError::unavailable(e)
                }
            })?;
            Ok(())
        })
        .await
    }

    async fn find_document(&self, id: &str) -> Result<T, StoreError> {
        self.bounded("find", async {
            self.documents()
                .await?
                .find_one(doc! { "id": id }, None)
                .await
                .map_err(|e| {
                    tracing::error!(collection = %self.collection, id, "Failed to find document: {}", e);
                    StoreError::unavailable(e)
                })?
                .ok_or_else(|| Self::not_found(id))
        })
        .await
    }

    async fn find_documents_by_field(&self, field: &str, value: Bson) -> Result<Vec<T>, StoreError> {
        self.bounded("find_by_field", async {
            let mut filter = BsonDocument::new();
            filter.insert(field, value);

            let cursor = self.documents().await?.find(filter, None).await.map_err(|e| {
                tracing::error!(collection = %self.collection, field, "Failed to query documents: {}", e);
                StoreError::unavailable(e)
            })?;

            cursor.try_collect::<Vec<T>>().await.map_err(|e| {
                tracing::error!(collection = %self.collection, field, "Failed to collect documents: {}", e);
                StoreError::unavailable(e)
            })
        })
        .await
    }

    async fn list_documents(&self) -> Result<Vec<T>, StoreError> {
        self.bounded("list", async {
            let cursor = self.documents().await?.find(doc! {}, None).await.map_err(|e| {
                tracing::error!(collection = %self.collection, "Failed to list documents: {}", e);
                StoreError::unavailable(e)
            })?;

            cursor.try_collect::<Vec<T>>().await.map_err(|e| {
                tracing::error!(collection = %self.collection, "Failed to collect documents: {}", e);
                StoreError::unavailable(e)
            })
        })
        .await
    }

    async fn update_document(&self, id: &str, document: &T) -> Result<(), StoreError> {
        self.bounded("update", async {
            let documents = self.documents().await?;
            if !self.exists(&documents, id).await? {
                return Err(Self::not_found(id));
            }

            documents
                .replace_one(doc! { "id": id }, document, None)
                .await
                .map_err(|e| {
                    tracing::error!(collection = %self.collection, id, "Failed to replace document: {}", e);
                    StoreError::unavailable(e)
                })?;
            Ok(())
        })
        .await
    }

    async fn delete_document(&self, id: &str) -> Result<(), StoreError> {
        self.bounded("delete", async {
            let documents = self.documents().await?;
            if !self.exists(&documents, id).await? {
                return Err(Self::not_found(id));
            }

            documents
                .delete_one(doc! { "id": id }, None)
                .await
                .map_err(|e| {
                    tracing::error!(collection = %self.collection, id, "Failed to delete document: {}", e);
                    StoreError::unavailable(e)
                })?;
            Ok(())
        })
        .await
    }

    async fn disconnect(&self) -> Result<(), StoreError> {
        self.manager.disconnect().await
    }
}
