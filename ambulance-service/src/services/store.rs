//! The data-access contract shared by every document kind.

use async_trait::async_trait;
use mongodb::bson::Bson;
use service_core::error::AppError;
use thiserror::Error;

use crate::models::Document;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    #[error("{kind} '{id}' already exists")]
    Conflict { kind: &'static str, id: String },

    /// Connection, timeout or decode failure.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("operation not supported by this store: {0}")]
    Unsupported(&'static str),
}

impl StoreError {
    pub fn unavailable(err: impl std::fmt::Display) -> Self {
        StoreError::Unavailable(err.to_string())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => AppError::NotFound(anyhow::Error::new(err)),
            StoreError::Conflict { .. } => AppError::Conflict(anyhow::Error::new(err)),
            StoreError::Unavailable(_) => AppError::DatabaseError(anyhow::Error::new(err)),
            StoreError::Unsupported(op) => AppError::NotImplemented(op.to_string()),
        }
    }
}

/// CRUD over one collection of `T`.
///
/// Existence is checked before every insert, replace and delete. The check
/// and the write are separate steps, so two writers racing on the same
/// identifier can both pass the check.
#[async_trait]
pub trait DocumentStore<T: Document>: Send + Sync {
    /// Insert `document` under `id`; `Conflict` when the id is taken.
    async fn create_document(&self, id: &str, document: &T) -> Result<(), StoreError>;

    async fn find_document(&self, id: &str) -> Result<T, StoreError>;

    /// Exact-equality lookup on a single field. No match is an empty vector.
    async fn find_documents_by_field(
        &self,
        _field: &str,
        _value: Bson,
    ) -> Result<Vec<T>, StoreError> {
        Err(StoreError::Unsupported("find by field"))
    }

    /// Every document, in whatever order the backend yields them.
    async fn list_documents(&self) -> Result<Vec<T>, StoreError> {
        Err(StoreError::Unsupported("list"))
    }

    /// Replace the whole stored document; `NotFound` when absent.
    async fn update_document(&self, id: &str, document: &T) -> Result<(), StoreError>;

    async fn delete_document(&self, id: &str) -> Result<(), StoreError>;

    /// Release the underlying connection. Safe to call repeatedly.
    async fn disconnect(&self) -> Result<(), StoreError>;
}
