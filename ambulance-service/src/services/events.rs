//! Best-effort change notifications.
//!
//! Handlers hand an event to [`EventNotifier::publish`] after a successful
//! mutation and move on. Delivery happens on a detached task under its own
//! timeout; nothing a publisher does can fail or delay the request.

use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;

use super::metrics::record_event_published;
use crate::config::EventSettings;
use crate::models::Document;

const KAFKA_JSON_CONTENT_TYPE: &str = "application/vnd.kafka.json.v2+json";

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("event transport failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("event rejected with status {0}")]
    Rejected(u16),

    #[error("event publishing timed out after {0:?}")]
    Timeout(Duration),

    #[error("event could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Sink for keyed JSON events.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn send(&self, key: &str, value: &Value) -> Result<(), PublishError>;
}

/// Publishes to a topic through the Kafka REST proxy.
#[derive(Clone)]
pub struct RestProxyPublisher {
    client: Client,
    url: String,
}

impl RestProxyPublisher {
    pub fn new(endpoint: &str, topic: &str) -> Self {
        let url = format!("{}/topics/{}", endpoint.trim_end_matches('/'), topic);
        tracing::info!(url = %url, "Event publisher configured");
        Self {
            client: Client::new(),
            url,
        }
    }
}

#[async_trait]
impl EventPublisher for RestProxyPublisher {
    async fn send(&self, key: &str, value: &Value) -> Result<(), PublishError> {
        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, KAFKA_JSON_CONTENT_TYPE)
            .json(&json!({ "records": [{ "key": key, "value": value }] }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PublishError::Rejected(status.as_u16()));
        }
        Ok(())
    }
}

/// Writes events to the log instead of a broker.
#[derive(Clone, Default)]
pub struct LogPublisher;

#[async_trait]
impl EventPublisher for LogPublisher {
    async fn send(&self, key: &str, value: &Value) -> Result<(), PublishError> {
        tracing::debug!(key, event = %value, "Event (no broker configured)");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Created,
    Updated,
    Deleted,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChangeEvent {
    pub kind: &'static str,
    pub action: ChangeAction,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<Value>,
}

impl ChangeEvent {
    pub fn of<T: Document>(action: ChangeAction, document: &T) -> Result<Self, PublishError> {
        Ok(Self {
            kind: T::KIND,
            action,
            id: document.id().to_string(),
            document: Some(serde_json::to_value(document)?),
        })
    }

    pub fn deleted<T: Document>(id: &str) -> Self {
        Self {
            kind: T::KIND,
            action: ChangeAction::Deleted,
            id: id.to_string(),
            document: None,
        }
    }
}

#[derive(Clone)]
pub struct EventNotifier {
    publisher: Arc<dyn EventPublisher>,
    timeout: Duration,
}

impl EventNotifier {
    pub fn new(publisher: Arc<dyn EventPublisher>, timeout: Duration) -> Self {
        Self { publisher, timeout }
    }

    pub fn from_settings(settings: &EventSettings) -> Self {
        let publisher: Arc<dyn EventPublisher> = match settings.endpoint.as_deref() {
            Some(endpoint) => Arc::new(RestProxyPublisher::new(endpoint, &settings.topic)),
            None => {
                tracing::info!("No event endpoint configured, events will only be logged");
                Arc::new(LogPublisher)
            }
        };
        Self::new(publisher, settings.timeout)
    }

    /// Deliver one event and wait for the outcome, bounded by the timeout.
    pub async fn send(&self, key: &str, value: &Value) -> Result<(), PublishError> {
        tokio::time::timeout(self.timeout, self.publisher.send(key, value))
            .await
            .map_err(|_| PublishError::Timeout(self.timeout))?
    }

    /// Fire and forget. The returned handle is only useful to tests.
    pub fn publish(&self, key: String, value: Value) -> JoinHandle<()> {
        let notifier = self.clone();
        tokio::spawn(async move {
            match notifier.send(&key, &value).await {
                Ok(()) => record_event_published("ok"),
                Err(e) => {
                    record_event_published("failed");
                    tracing::warn!(key = %key, error = %e, "Failed to publish event");
                }
            }
        })
    }

    pub fn created<T: Document>(&self, document: &T) {
        self.publish_change(ChangeEvent::of(ChangeAction::Created, document));
    }

    pub fn updated<T: Document>(&self, document: &T) {
        self.publish_change(ChangeEvent::of(ChangeAction::Updated, document));
    }

    pub fn deleted<T: Document>(&self, id: &str) {
        self.publish_change(Ok(ChangeEvent::deleted::<T>(id)));
    }

    fn publish_change(&self, event: Result<ChangeEvent, PublishError>) {
        let encoded = event.and_then(|event| Ok((event.id.clone(), serde_json::to_value(&event)?)));
        match encoded {
            Ok((key, value)) => {
                self.publish(key, value);
            }
            Err(e) => {
                record_event_published("failed");
                tracing::warn!(error = %e, "Failed to encode change event");
            }
        }
    }
}
