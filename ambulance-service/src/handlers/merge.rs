//! Find, transform, persist-if-changed.
//!
//! Every handler that addresses a single document goes through
//! [`apply_to_document`]: the stored document is loaded, handed to a
//! transformation, written back only when the transformation returns an
//! updated copy, and the transformation's status and body become the response.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use service_core::error::AppError;
use std::future::Future;

use crate::models::Document;
use crate::services::DocumentStore;

/// What a transformation decided: an optional replacement to persist, plus
/// the response to send.
#[derive(Debug)]
pub struct Merge<T> {
    pub updated: Option<T>,
    pub status: StatusCode,
    pub body: Option<Value>,
}

impl<T: Document> Merge<T> {
    /// Respond without persisting anything.
    pub fn read<B: Serialize>(status: StatusCode, body: &B) -> Result<Self, AppError> {
        Ok(Self {
            updated: None,
            status,
            body: Some(encode(body)?),
        })
    }

    /// Persist `updated` and echo it back with `200 OK`.
    pub fn write(updated: T) -> Result<Self, AppError> {
        let body = encode(&updated)?;
        Ok(Self {
            updated: Some(updated),
            status: StatusCode::OK,
            body: Some(body),
        })
    }

    /// Status only, no body.
    pub fn empty(status: StatusCode) -> Self {
        Self {
            updated: None,
            status,
            body: None,
        }
    }
}

impl<T> IntoResponse for Merge<T> {
    fn into_response(self) -> Response {
        match self.body {
            Some(body) => (self.status, Json(body)).into_response(),
            None => self.status.into_response(),
        }
    }
}

fn encode<B: Serialize>(body: &B) -> Result<Value, AppError> {
    serde_json::to_value(body)
        .map_err(|e| AppError::InternalError(anyhow::anyhow!("Failed to encode response: {}", e)))
}

pub async fn apply_to_document<T, S, F, Fut>(
    store: &S,
    id: &str,
    transform: F,
) -> Result<Merge<T>, AppError>
where
    T: Document,
    S: DocumentStore<T> + ?Sized,
    F: FnOnce(T) -> Fut,
    Fut: Future<Output = Result<Merge<T>, AppError>>,
{
    if id.trim().is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "{} id is required",
            T::KIND
        )));
    }

    let existing = store.find_document(id).await?;
    let merge = transform(existing).await?;

    if let Some(updated) = &merge.updated {
        store.update_document(id, updated).await.map_err(|e| {
            tracing::error!(kind = T::KIND, id, error = %e, "Failed to persist updated document");
            AppError::DatabaseError(anyhow::anyhow!("Failed to update {} '{}': {}", T::KIND, id, e))
        })?;
    }

    Ok(merge)
}
