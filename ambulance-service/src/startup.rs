//! Application startup and lifecycle management.

use service_core::error::AppError;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::config::{MongoSettings, ServiceConfig, StoreBackend};
use crate::models::{Ambulance, Document, Payment, Procedure};
use crate::services::{DocumentStore, EventNotifier, InMemoryStore, MongoStore};
use crate::{build_router, AppState};

/// Application container for managing server lifecycle.
pub struct Application {
    http_port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build stores, event notifier and listener. MongoDB is only contacted
    /// on first use.
    pub async fn build(config: ServiceConfig) -> Result<Self, AppError> {
        let state = match config.store_backend {
            StoreBackend::Mongo => AppState {
                ambulances: mongo_store::<Ambulance>(&config.mongodb),
                payments: mongo_store::<Payment>(&config.mongodb),
                procedures: mongo_store::<Procedure>(&config.mongodb),
                events: EventNotifier::from_settings(&config.events),
                config: config.clone(),
            },
            StoreBackend::Memory => {
                tracing::warn!("Using in-memory document stores, data is not persisted");
                AppState {
                    ambulances: Arc::new(InMemoryStore::new()),
                    payments: Arc::new(InMemoryStore::new()),
                    procedures: Arc::new(InMemoryStore::new()),
                    events: EventNotifier::from_settings(&config.events),
                    config: config.clone(),
                }
            }
        };

        Self::with_state(state).await
    }

    /// Bind a listener for prebuilt state. Port 0 picks a random port.
    pub async fn with_state(state: AppState) -> Result<Self, AppError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], state.config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let http_port = listener.local_addr()?.port();

        tracing::info!(port = http_port, "Ambulance service bound");

        Ok(Self {
            http_port,
            listener,
            state,
        })
    }

    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests and
    /// disconnect every store.
    pub async fn run_until_stopped<F>(self, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let router = build_router(self.state.clone());

        axum::serve(self.listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| {
                tracing::error!("HTTP server error: {}", e);
                e
            })?;

        self.state.disconnect_all().await;
        tracing::info!("Service shutdown complete");
        Ok(())
    }
}

/// One store per kind, each in its own collection named after the kind.
/// Index creation runs in the background so an unreachable database does not
/// hold up startup.
fn mongo_store<T: Document>(base: &MongoSettings) -> Arc<dyn DocumentStore<T>> {
    let settings = MongoSettings {
        collection: T::KIND.to_string(),
        ..base.clone()
    };
    tracing::info!(kind = T::KIND, location = %settings.location(), "Configuring MongoDB store");

    let store = Arc::new(MongoStore::<T>::new(settings));

    let indexed = store.clone();
    tokio::spawn(async move {
        if let Err(e) = indexed.init_indexes().await {
            tracing::warn!(
                kind = T::KIND,
                error = %e,
                "Could not create id index, continuing without it"
            );
        }
    });

    store
}
