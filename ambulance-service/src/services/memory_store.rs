use async_trait::async_trait;
use mongodb::bson::{self, Bson};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::metrics::record_store_operation;
use super::store::{DocumentStore, StoreError};
use crate::models::Document;

/// Process-local [`DocumentStore`] with the same existence semantics as the
/// MongoDB store. Used for local runs and by the test suites.
pub struct InMemoryStore<T> {
    documents: RwLock<Vec<T>>,
}

impl<T: Document> Default for InMemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Document> InMemoryStore<T> {
    pub fn new() -> Self {
        Self {
            documents: RwLock::new(Vec::new()),
        }
    }

    /// Seed the store; later duplicates of an identifier are dropped.
    pub fn with_documents(documents: impl IntoIterator<Item = T>) -> Self {
        let mut seeded: Vec<T> = Vec::new();
        for document in documents {
            if !seeded.iter().any(|d| d.id() == document.id()) {
                seeded.push(document);
            }
        }
        Self {
            documents: RwLock::new(seeded),
        }
    }

    pub fn len(&self) -> usize {
        self.read().map(|docs| docs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<T>>, StoreError> {
        self.documents
            .read()
            .map_err(|e| StoreError::Unavailable(format!("in-memory store poisoned: {}", e)))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<T>>, StoreError> {
        self.documents
            .write()
            .map_err(|e| StoreError::Unavailable(format!("in-memory store poisoned: {}", e)))
    }

    fn not_found(id: &str) -> StoreError {
        StoreError::NotFound {
            kind: T::KIND,
            id: id.to_string(),
        }
    }

    fn recorded<R>(operation: &'static str, result: Result<R, StoreError>) -> Result<R, StoreError> {
        record_store_operation(T::KIND, operation, &result);
        result
    }
}

/// Equality as MongoDB applies it to a filter: numbers compare by value
/// across `Int32`, `Int64` and `Double`, everything else must match exactly.
fn bson_equals(stored: &Bson, wanted: &Bson) -> bool {
    match (as_number(stored), as_number(wanted)) {
        (Some(a), Some(b)) => a == b,
        _ => stored == wanted,
    }
}

fn as_number(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(n) => Some(f64::from(*n)),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(n) => Some(*n),
        _ => None,
    }
}

fn field_matches<T: Document>(document: &T, field: &str, value: &Bson) -> bool {
    match bson::to_document(document) {
        Ok(encoded) => encoded
            .get(field)
            .is_some_and(|stored| bson_equals(stored, value)),
        Err(e) => {
            tracing::warn!(kind = T::KIND, id = document.id(), "Failed to encode document: {}", e);
            false
        }
    }
}

#[async_trait]
impl<T: Document> DocumentStore<T> for InMemoryStore<T> {
    async fn create_document(&self, id: &str, document: &T) -> Result<(), StoreError> {
        let result = self.write().and_then(|mut docs| {
            if docs.iter().any(|d| d.id() == id) {
                return Err(StoreError::Conflict {
                    kind: T::KIND,
                    id: id.to_string(),
                });
            }
            docs.push(document.clone());
            Ok(())
        });
        Self::recorded("create", result)
    }

    async fn find_document(&self, id: &str) -> Result<T, StoreError> {
        let result = self.read().and_then(|docs| {
            docs.iter()
                .find(|d| d.id() == id)
                .cloned()
                .ok_or_else(|| Self::not_found(id))
        });
        Self::recorded("find", result)
    }

    async fn find_documents_by_field(&self, field: &str, value: Bson) -> Result<Vec<T>, StoreError> {
        let result = self.read().map(|docs| {
            docs.iter()
                .filter(|d| field_matches(*d, field, &value))
                .cloned()
                .collect()
        });
        Self::recorded("find_by_field", result)
    }

    async fn list_documents(&self) -> Result<Vec<T>, StoreError> {
        let result = self.read().map(|docs| docs.clone());
        Self::recorded("list", result)
    }

    async fn update_document(&self, id: &str, document: &T) -> Result<(), StoreError> {
        let result = self.write().and_then(|mut docs| {
            let slot = docs
                .iter_mut()
                .find(|d| d.id() == id)
                .ok_or_else(|| Self::not_found(id))?;
            *slot = document.clone();
            Ok(())
        });
        Self::recorded("update", result)
    }

    async fn delete_document(&self, id: &str) -> Result<(), StoreError> {
        let result = self.write().and_then(|mut docs| {
            let position = docs
                .iter()
                .position(|d| d.id() == id)
                .ok_or_else(|| Self::not_found(id))?;
            docs.remove(position);
            Ok(())
        });
        Self::recorded("delete", result)
    }

    async fn disconnect(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Ambulance, Payment};
    use std::sync::Arc;

    fn ambulance(id: &str, name: &str) -> Ambulance {
        Ambulance {
            id: id.to_string(),
            name: name.to_string(),
            location: "Kosice".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn created_document_can_be_found() {
        let store = InMemoryStore::<Ambulance>::new();
        let alpha = ambulance("A1", "Alpha");

        store.create_document("A1", &alpha).await.unwrap();
        assert_eq!(store.find_document("A1").await.unwrap(), alpha);
    }

    #[tokio::test]
    async fn duplicate_create_conflicts_and_keeps_original() {
        let store = InMemoryStore::with_documents([ambulance("A1", "Alpha")]);

        let err = store
            .create_document("A1", &ambulance("A1", "Impostor"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
        assert_eq!(store.find_document("A1").await.unwrap().name, "Alpha");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn missing_ids_are_not_found_without_side_effects() {
        let store = InMemoryStore::with_documents([ambulance("A1", "Alpha")]);

        assert!(store.find_document("nope").await.unwrap_err().is_not_found());
        assert!(store
            .update_document("nope", &ambulance("nope", "Ghost"))
            .await
            .unwrap_err()
            .is_not_found());
        assert!(store.delete_document("nope").await.unwrap_err().is_not_found());

        assert_eq!(store.list_documents().await.unwrap(), vec![ambulance("A1", "Alpha")]);
    }

    #[tokio::test]
    async fn update_replaces_whole_document() {
        let store = InMemoryStore::with_documents([ambulance("A1", "Alpha")]);
        let replacement = Ambulance {
            id: "A1".to_string(),
            name: "Beta".to_string(),
            ..Default::default()
        };

        store.update_document("A1", &replacement).await.unwrap();
        let stored = store.find_document("A1").await.unwrap();
        assert_eq!(stored.name, "Beta");
        assert!(stored.location.is_empty());
    }

    #[tokio::test]
    async fn delete_removes_document() {
        let store = InMemoryStore::with_documents([ambulance("A1", "Alpha"), ambulance("A2", "Bravo")]);

        store.delete_document("A1").await.unwrap();
        assert!(store.find_document("A1").await.unwrap_err().is_not_found());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn find_by_field_matches_exactly() {
        let store = InMemoryStore::with_documents([
            Payment {
                id: "P1".to_string(),
                procedure_id: "PR1".to_string(),
                amount: 10.0,
                ..Default::default()
            },
            Payment {
                id: "P2".to_string(),
                procedure_id: "PR2".to_string(),
                ..Default::default()
            },
            Payment {
                id: "P3".to_string(),
                procedure_id: "PR1".to_string(),
                ..Default::default()
            },
        ]);

        let matches = store
            .find_documents_by_field(Payment::PROCEDURE_FIELD, Bson::String("PR1".to_string()))
            .await
            .unwrap();
        let ids: Vec<_> = matches.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["P1", "P3"]);

        let none = store
            .find_documents_by_field(Payment::PROCEDURE_FIELD, Bson::String("PR".to_string()))
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn find_by_numeric_field_ignores_number_type() {
        let store = InMemoryStore::with_documents([
            Ambulance {
                id: "A1".to_string(),
                capacity: 4,
                ..Default::default()
            },
            Ambulance {
                id: "A2".to_string(),
                capacity: 6,
                ..Default::default()
            },
        ]);

        for wanted in [Bson::Int32(4), Bson::Int64(4), Bson::Double(4.0)] {
            let found = store.find_documents_by_field("capacity", wanted).await.unwrap();
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].id, "A1");
        }

        let none = store
            .find_documents_by_field("capacity", Bson::String("4".to_string()))
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn disconnect_twice_is_harmless() {
        let store = InMemoryStore::<Ambulance>::new();
        store.disconnect().await.unwrap();
        store.disconnect().await.unwrap();
    }

    #[tokio::test]
    async fn racing_creates_leave_exactly_one_document() {
        let store = Arc::new(InMemoryStore::<Ambulance>::new());

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .create_document("A1", &ambulance("A1", &format!("writer-{}", i)))
                        .await
                })
            })
            .collect();

        let mut created = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(()) => created += 1,
                Err(e) => assert!(matches!(e, StoreError::Conflict { .. })),
            }
        }
        // Check and insert share one write lock here, so exactly one wins.
        assert_eq!(created, 1);
        assert_eq!(store.len(), 1);
    }
}
