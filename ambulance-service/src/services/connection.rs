//! Lazily established, memoized connection shared by all requests of a store.

use async_trait::async_trait;
use mongodb::{bson::doc, options::ClientOptions, Client};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::Mutex;

use super::store::StoreError;
use crate::config::MongoSettings;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Establishes and tears down the handle a [`ConnectionManager`] caches.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Handle: Clone + Send + Sync + 'static;

    async fn connect(&self) -> Result<Self::Handle, StoreError>;

    async fn disconnect(&self, handle: Self::Handle) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Unconnected,
    Connecting,
    Connected,
}

enum ConnectionState<H> {
    Unconnected,
    Connecting,
    Connected(H),
}

/// Double-checked lazy connection.
///
/// Steady-state callers only take the read side of the state lock, which is
/// never held across an await. Creation and teardown serialize on
/// `transition`, so at most one connect attempt is in flight and a handle is
/// torn down at most once.
pub struct ConnectionManager<C: Connector> {
    connector: C,
    timeout: Duration,
    state: RwLock<ConnectionState<C::Handle>>,
    transition: Mutex<()>,
}

impl<C: Connector> ConnectionManager<C> {
    pub fn new(connector: C, timeout: Duration) -> Self {
        Self {
            connector,
            timeout,
            state: RwLock::new(ConnectionState::Unconnected),
            transition: Mutex::new(()),
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        match &*self.state.read().unwrap_or_else(PoisonError::into_inner) {
            ConnectionState::Unconnected => ConnectionStatus::Unconnected,
            ConnectionState::Connecting => ConnectionStatus::Connecting,
            ConnectionState::Connected(_) => ConnectionStatus::Connected,
        }
    }

    fn cached(&self) -> Option<C::Handle> {
        match &*self.state.read().unwrap_or_else(PoisonError::into_inner) {
            ConnectionState::Connected(handle) => Some(handle.clone()),
            _ => None,
        }
    }

    fn set_state(&self, next: ConnectionState<C::Handle>) -> ConnectionState<C::Handle> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *state, next)
    }

    pub async fn connect(&self) -> Result<C::Handle, StoreError> {
        if let Some(handle) = self.cached() {
            return Ok(handle);
        }

        let _guard = self.transition.lock().await;

        // Another task may have finished connecting while we waited.
        if let Some(handle) = self.cached() {
            return Ok(handle);
        }

        // A cancelled attempt leaves `Connecting` behind; the next caller
        // simply retries under the lock.
        self.set_state(ConnectionState::Connecting);

        match tokio::time::timeout(self.timeout, self.connector.connect()).await {
            Ok(Ok(handle)) => {
                self.set_state(ConnectionState::Connected(handle.clone()));
                Ok(handle)
            }
            Ok(Err(e)) => {
                self.set_state(ConnectionState::Unconnected);
                tracing::error!(error = %e, "Failed to establish store connection");
                Err(e)
            }
            Err(_) => {
                self.set_state(ConnectionState::Unconnected);
                tracing::error!(timeout = ?self.timeout, "Timed out establishing store connection");
                Err(StoreError::Unavailable(format!(
                    "connection attempt timed out after {:?}",
                    self.timeout
                )))
            }
        }
    }

    pub async fn disconnect(&self) -> Result<(), StoreError> {
        if self.status() == ConnectionStatus::Unconnected {
            return Ok(());
        }

        let _guard = self.transition.lock().await;

        match self.set_state(ConnectionState::Unconnected) {
            ConnectionState::Connected(handle) => {
                tracing::info!("Closing store connection");
                self.connector.disconnect(handle).await
            }
            _ => Ok(()),
        }
    }
}

/// Builds `mongodb::Client`s from resolved settings and verifies them with a ping.
pub struct MongoConnector {
    settings: MongoSettings,
}

impl MongoConnector {
    pub fn new(settings: MongoSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl Connector for MongoConnector {
    type Handle = Client;

    async fn connect(&self) -> Result<Client, StoreError> {
        tracing::info!(location = %self.settings.location(), "Connecting to MongoDB");

        let mut options = ClientOptions::parse(self.settings.uri()).await.map_err(|e| {
            tracing::error!(
                location = %self.settings.location(),
                "Failed to parse MongoDB connection string: {}",
                e
            );
            StoreError::unavailable(e)
        })?;
        options.app_name = Some("ambulance-service".to_string());
        options.connect_timeout = Some(CONNECT_TIMEOUT);
        options.server_selection_timeout = Some(self.settings.timeout);

        let client = Client::with_options(options).map_err(StoreError::unavailable)?;

        client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!(location = %self.settings.location(), "MongoDB ping failed: {}", e);
                StoreError::unavailable(e)
            })?;

        tracing::info!(location = %self.settings.location(), "Successfully connected to MongoDB");
        Ok(client)
    }

    async fn disconnect(&self, client: Client) -> Result<(), StoreError> {
        client.shutdown().await;
        tracing::info!(location = %self.settings.location(), "Disconnected from MongoDB");
        Ok(())
    }
}
