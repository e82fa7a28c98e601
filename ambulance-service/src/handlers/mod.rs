//! HTTP handlers for ambulance-service.

pub mod ambulances;
pub mod documents;
pub mod merge;
pub mod payments;
pub mod procedures;

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::services::get_metrics;

pub use ambulances::ambulance_summary;
pub use merge::{apply_to_document, Merge};
pub use payments::list_payments;
pub use procedures::list_procedures;

/// Liveness check.
pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "ambulance-service",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// Readiness check. Stores connect lazily, so this does not touch the database.
pub async fn readiness_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({ "status": "ready" })))
}

pub async fn metrics_endpoint() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        get_metrics(),
    )
}
