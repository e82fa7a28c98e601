//! Store tests against a live MongoDB. Run with `--ignored`; the server is
//! taken from `TEST_MONGODB_HOST` / `TEST_MONGODB_PORT` (default localhost:27017).

use ambulance_service::{
    config::{MongoOverrides, MongoSettings},
    models::{Ambulance, Payment},
    services::{ConnectionStatus, DocumentStore, MongoStore, StoreError},
};
use mongodb::bson::Bson;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

fn settings(collection: &str) -> MongoSettings {
    MongoSettings::resolve_with(
        MongoOverrides {
            host: std::env::var("TEST_MONGODB_HOST").ok(),
            port: std::env::var("TEST_MONGODB_PORT").ok().and_then(|p| p.parse().ok()),
            database: Some(format!("ambulance_test_{}", Uuid::new_v4().simple())),
            collection: Some(collection.to_string()),
            timeout: Some(Duration::from_secs(5)),
            ..Default::default()
        },
        |_| None,
    )
}

async fn drop_database(settings: &MongoSettings) {
    let client = mongodb::Client::with_uri_str(settings.uri()).await.unwrap();
    client.database(&settings.database).drop(None).await.unwrap();
}

#[tokio::test]
#[ignore] // Requires MongoDB
async fn crud_round_trip_against_mongodb() {
    let settings = settings("ambulance");
    let store = MongoStore::<Ambulance>::new(settings.clone());
    store.init_indexes().await.unwrap();
    assert_eq!(store.connection_status(), ConnectionStatus::Connected);

    let alpha = Ambulance {
        id: "A1".to_string(),
        name: "Alpha".to_string(),
        capacity: 4,
        ..Default::default()
    };
    store.create_document("A1", &alpha).await.unwrap();
    assert_eq!(store.find_document("A1").await.unwrap(), alpha);

    let err = store.create_document("A1", &alpha).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict { .. }));

    let beta = Ambulance {
        name: "Beta".to_string(),
        ..alpha.clone()
    };
    store.update_document("A1", &beta).await.unwrap();
    assert_eq!(store.find_document("A1").await.unwrap().name, "Beta");

    assert!(store.update_document("nope", &beta).await.unwrap_err().is_not_found());
    assert!(store.delete_document("nope").await.unwrap_err().is_not_found());

    store.delete_document("A1").await.unwrap();
    assert!(store.find_document("A1").await.unwrap_err().is_not_found());
    assert!(store.list_documents().await.unwrap().is_empty());

    store.disconnect().await.unwrap();
    store.disconnect().await.unwrap();
    assert_eq!(store.connection_status(), ConnectionStatus::Unconnected);

    drop_database(&settings).await;
}

#[tokio::test]
#[ignore] // Requires MongoDB
async fn field_lookup_against_mongodb() {
    let settings = settings("payment");
    let store = MongoStore::<Payment>::new(settings.clone());

    for (id, procedure) in [("P1", "PR1"), ("P2", "PR2"), ("P3", "PR1")] {
        let payment = Payment {
            id: id.to_string(),
            procedure_id: procedure.to_string(),
            amount: 10.0,
            ..Default::default()
        };
        store.create_document(id, &payment).await.unwrap();
    }

    let found = store
        .find_documents_by_field(Payment::PROCEDURE_FIELD, Bson::String("PR1".to_string()))
        .await
        .unwrap();
    let mut ids: Vec<_> = found.iter().map(|p| p.id.clone()).collect();
    ids.sort();
    assert_eq!(ids, vec!["P1", "P3"]);

    let none = store
        .find_documents_by_field(Payment::PROCEDURE_FIELD, Bson::String("PR9".to_string()))
        .await
        .unwrap();
    assert!(none.is_empty());

    store.disconnect().await.unwrap();
    drop_database(&settings).await;
}

#[tokio::test]
#[ignore] // Requires MongoDB
async fn racing_creates_against_mongodb_yield_one_winner() {
    let settings = settings("ambulance");
    let store = Arc::new(MongoStore::<Ambulance>::new(settings.clone()));
    store.init_indexes().await.unwrap();

    let writers: Vec<String> = (0..8).map(|i| format!("writer-{}", i)).collect();
    let tasks: Vec<_> = writers
        .iter()
        .map(|name| {
            let store = store.clone();
            let ambulance = Ambulance {
                id: "A1".to_string(),
                name: name.clone(),
                ..Default::default()
            };
            tokio::spawn(async move { store.create_document("A1", &ambulance).await })
        })
        .collect();

    let mut created = 0;
    let mut conflicts = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(()) => created += 1,
            Err(StoreError::Conflict { .. }) => conflicts += 1,
            Err(e) => panic!("unexpected store error: {}", e),
        }
    }
    assert_eq!(created, 1);
    assert_eq!(conflicts, writers.len() - 1);

    let stored = store.find_document("A1").await.unwrap();
    assert!(writers.contains(&stored.name));
    assert_eq!(store.list_documents().await.unwrap().len(), 1);

    store.disconnect().await.unwrap();
    drop_database(&settings).await;
}

#[tokio::test]
async fn unreachable_server_is_unavailable() {
    let settings = MongoSettings::resolve_with(
        MongoOverrides {
            host: Some("127.0.0.1".to_string()),
            port: Some(1),
            timeout: Some(Duration::from_millis(300)),
            ..Default::default()
        },
        |_| None,
    );
    let store = MongoStore::<Ambulance>::new(settings);

    let err = store.find_document("A1").await.unwrap_err();
    assert!(matches!(err, StoreError::Unavailable(_)));
    assert_ne!(store.connection_status(), ConnectionStatus::Connected);
    store.disconnect().await.unwrap();
}
