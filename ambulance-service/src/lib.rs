pub mod config;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;

use axum::{
    http::{header, Method},
    middleware::from_fn,
    routing::get,
    Router,
};
use service_core::middleware::{
    metrics::metrics_middleware,
    tracing::{request_id_middleware, REQUEST_ID_HEADER},
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use config::ServiceConfig;
use handlers::documents;
use models::{Ambulance, Document, Payment, Procedure};
use services::{DocumentStore, EventNotifier};

pub use startup::Application;

#[derive(Clone)]
pub struct AppState {
    pub config: ServiceConfig,
    pub ambulances: Arc<dyn DocumentStore<Ambulance>>,
    pub payments: Arc<dyn DocumentStore<Payment>>,
    pub procedures: Arc<dyn DocumentStore<Procedure>>,
    pub events: EventNotifier,
}

/// Selects the store holding documents of type `T`.
pub trait StoreFor<T: Document> {
    fn store(&self) -> &dyn DocumentStore<T>;
}

impl StoreFor<Ambulance> for AppState {
    fn store(&self) -> &dyn DocumentStore<Ambulance> {
        self.ambulances.as_ref()
    }
}

impl StoreFor<Payment> for AppState {
    fn store(&self) -> &dyn DocumentStore<Payment> {
        self.payments.as_ref()
    }
}

impl StoreFor<Procedure> for AppState {
    fn store(&self) -> &dyn DocumentStore<Procedure> {
        self.procedures.as_ref()
    }
}

impl AppState {
    /// Release every store connection. Failures are logged; every store is
    /// still attempted.
    pub async fn disconnect_all(&self) {
        let (ambulances, payments, procedures) = tokio::join!(
            self.ambulances.disconnect(),
            self.payments.disconnect(),
            self.procedures.disconnect(),
        );

        for (kind, result) in [
            (Ambulance::KIND, ambulances),
            (Payment::KIND, payments),
            (Procedure::KIND, procedures),
        ] {
            if let Err(e) = result {
                tracing::warn!(kind, error = %e, "Failed to disconnect store");
            }
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_endpoint))
        .route(
            "/api/ambulances",
            get(documents::list::<Ambulance>).post(documents::create::<Ambulance>),
        )
        .route(
            "/api/ambulances/:id",
            get(documents::get::<Ambulance>)
                .put(documents::update::<Ambulance>)
                .delete(documents::delete::<Ambulance>),
        )
        .route(
            "/api/ambulances/:id/summary",
            get(handlers::ambulance_summary),
        )
        .route(
            "/api/payments",
            get(handlers::list_payments).post(documents::create::<Payment>),
        )
        .route(
            "/api/payments/:id",
            get(documents::get::<Payment>)
                .put(documents::update::<Payment>)
                .delete(documents::delete::<Payment>),
        )
        .route(
            "/api/procedures",
            get(handlers::list_procedures).post(documents::create::<Procedure>),
        )
        .route(
            "/api/procedures/:id",
            get(documents::get::<Procedure>)
                .put(documents::update::<Procedure>)
                .delete(documents::delete::<Procedure>),
        )
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        // Outside the trace layer so the span sees the id.
        .layer(from_fn(request_id_middleware))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([
                    Method::GET,
                    Method::PUT,
                    Method::POST,
                    Method::DELETE,
                    Method::PATCH,
                    Method::OPTIONS,
                ])
                .allow_headers([header::ORIGIN, header::AUTHORIZATION, header::CONTENT_TYPE])
                .max_age(Duration::from_secs(12 * 60 * 60)),
        )
        .with_state(state)
}
