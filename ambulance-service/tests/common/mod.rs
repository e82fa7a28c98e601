#![allow(dead_code)]

use ambulance_service::{
    build_router,
    config::{EventSettings, MongoOverrides, MongoSettings, ServiceConfig, StoreBackend},
    models::{Ambulance, Payment, Procedure},
    services::{EventNotifier, EventPublisher, InMemoryStore, PublishError},
    AppState,
};
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::util::ServiceExt;

#[derive(Default)]
pub struct RecordingPublisher {
    pub events: Mutex<Vec<(String, Value)>>,
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn send(&self, key: &str, value: &Value) -> Result<(), PublishError> {
        self.events.lock().unwrap().push((key.to_string(), value.clone()));
        Ok(())
    }
}

pub fn test_config() -> ServiceConfig {
    ServiceConfig {
        common: service_core::config::Config {
            port: 0,
            ..Default::default()
        },
        service_name: "ambulance-service-test".to_string(),
        store_backend: StoreBackend::Memory,
        mongodb: MongoSettings::resolve_with(MongoOverrides::default(), |_| None),
        events: EventSettings::default(),
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub ambulances: Arc<InMemoryStore<Ambulance>>,
    pub payments: Arc<InMemoryStore<Payment>>,
    pub procedures: Arc<InMemoryStore<Procedure>>,
    pub publisher: Arc<RecordingPublisher>,
}

impl TestApp {
    pub fn new() -> Self {
        let ambulances = Arc::new(InMemoryStore::new());
        let payments = Arc::new(InMemoryStore::new());
        let procedures = Arc::new(InMemoryStore::new());
        let publisher = Arc::new(RecordingPublisher::default());

        let state = AppState {
            config: test_config(),
            ambulances: ambulances.clone(),
            payments: payments.clone(),
            procedures: procedures.clone(),
            events: EventNotifier::new(publisher.clone(), Duration::from_secs(1)),
        };

        Self {
            router: build_router(state.clone()),
            state,
            ambulances,
            payments,
            procedures,
            publisher,
        }
    }

    /// Send one request through the router; the body is parsed as JSON when
    /// there is one, otherwise `Value::Null`.
    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::PUT, uri, Some(body)).await
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::DELETE, uri, None).await
    }

    /// Events are published on detached tasks; wait until `count` arrived.
    pub async fn wait_for_events(&self, count: usize) -> Vec<(String, Value)> {
        for _ in 0..100 {
            {
                let events = self.publisher.events.lock().unwrap();
                if events.len() >= count {
                    return events.clone();
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.publisher.events.lock().unwrap().clone()
    }
}
