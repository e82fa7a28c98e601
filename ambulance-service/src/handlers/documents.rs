//! CRUD handlers shared by every document kind.
//!
//! Each handler is generic over the document type and picks its store from
//! [`AppState`] through [`StoreFor`], so a route is just
//! `post(documents::create::<Ambulance>)`.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;

use super::merge::{apply_to_document, Merge};
use crate::models::Document;
use crate::{AppState, StoreFor};

/// Insert a new document, generating its id when none was supplied.
pub async fn create<T>(
    State(state): State<AppState>,
    payload: Result<Json<T>, JsonRejection>,
) -> Result<(StatusCode, Json<T>), AppError>
where
    T: Document,
    AppState: StoreFor<T>,
{
    let Json(mut document) = payload?;
    document.ensure_id();

    tracing::info!(kind = T::KIND, id = %document.id(), "Creating document");

    state.store().create_document(document.id(), &document).await?;
    state.events.created(&document);

    Ok((StatusCode::CREATED, Json(document)))
}

pub async fn list<T>(State(state): State<AppState>) -> Result<Json<Vec<T>>, AppError>
where
    T: Document,
    AppState: StoreFor<T>,
{
    let documents = state.store().list_documents().await?;
    tracing::debug!(kind = T::KIND, count = documents.len(), "Listed documents");
    Ok(Json(documents))
}

pub async fn get<T>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Merge<T>, AppError>
where
    T: Document,
    AppState: StoreFor<T>,
{
    apply_to_document(state.store(), &id, |document| async move {
        Merge::read(StatusCode::OK, &document)
    })
    .await
}

/// Field-sparse merge of the request body into the stored document.
pub async fn update<T>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<T>, JsonRejection>,
) -> Result<Merge<T>, AppError>
where
    T: Document,
    AppState: StoreFor<T>,
{
    tracing::info!(kind = T::KIND, id = %id, "Updating document");

    // The body is only looked at once the document is known to exist.
    let merge = apply_to_document(state.store(), &id, |mut existing| async move {
        let Json(incoming) = payload?;
        existing.merge(incoming);
        Merge::write(existing)
    })
    .await?;

    if let Some(updated) = &merge.updated {
        state.events.updated(updated);
    }
    Ok(merge)
}

pub async fn delete<T>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Merge<T>, AppError>
where
    T: Document,
    AppState: StoreFor<T>,
{
    let store = state.store();

    tracing::info!(kind = T::KIND, id = %id, "Deleting document");

    let merge = apply_to_document(store, &id, |existing| async move {
        store.delete_document(existing.id()).await?;
        Ok::<_, AppError>(Merge::empty(StatusCode::NO_CONTENT))
    })
    .await?;

    state.events.deleted::<T>(&id);
    Ok(merge)
}
