//! In-memory document store for development and tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{
    apply_ops, CollectionName, DocumentStore, Filter, StoreError, StoreResult, StoredDocument,
    UpdateOp,
};

#[derive(Debug, Clone)]
struct Slot {
    sequence: u64,
    document: StoredDocument,
}

/// Every collection lives behind one lock, so a single write is atomic with
/// respect to every other call.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<CollectionName, HashMap<String, Slot>>>,
    sequence: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn find(
        &self,
        collection: CollectionName,
        filter: &Filter,
    ) -> StoreResult<Vec<StoredDocument>> {
        let collections = self.collections.read().await;
        let Some(slots) = collections.get(&collection) else {
            return Ok(Vec::new());
        };

        let mut matched: Vec<&Slot> = slots
            .values()
            .filter(|slot| filter.matches(&slot.document.body))
            .collect();
        matched.sort_by_key(|slot| slot.sequence);

        Ok(matched.into_iter().map(|s| s.document.clone()).collect())
    }

    async fn find_one(
        &self,
        collection: CollectionName,
        id: &str,
    ) -> StoreResult<Option<StoredDocument>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .and_then(|slots| slots.get(id))
            .map(|slot| slot.document.clone()))
    }

    async fn insert_one(
        &self,
        collection: CollectionName,
        id: &str,
        body: Value,
    ) -> StoreResult<StoredDocument> {
        if !body.is_object() {
            return Err(StoreError::NotAnObject);
        }

        let mut collections = self.collections.write().await;
        let slots = collections.entry(collection).or_default();
        if slots.contains_key(id) {
            return Err(StoreError::Duplicate {
                collection,
                id: id.to_string(),
            });
        }

        let document = StoredDocument {
            id: id.to_string(),
            version: 1,
            body,
        };
        slots.insert(
            id.to_string(),
            Slot {
                sequence: self.next_sequence(),
                document: document.clone(),
            },
        );
        Ok(document)
    }

    async fn replace_one(
        &self,
        collection: CollectionName,
        id: &str,
        expected_version: i64,
        body: Value,
    ) -> StoreResult<Option<StoredDocument>> {
        if !body.is_object() {
            return Err(StoreError::NotAnObject);
        }

        let mut collections = self.collections.write().await;
        let Some(slot) = collections
            .get_mut(&collection)
            .and_then(|slots| slots.get_mut(id))
        else {
            return Ok(None);
        };

        if slot.document.version != expected_version {
            return Err(StoreError::VersionConflict {
                collection,
                id: id.to_string(),
            });
        }

        slot.document.version += 1;
        slot.document.body = body;
        Ok(Some(slot.document.clone()))
    }

    async fn update_one(
        &self,
        collection: CollectionName,
        id: &str,
        ops: &[UpdateOp],
    ) -> StoreResult<Option<StoredDocument>> {
        let mut collections = self.collections.write().await;
        let Some(slot) = collections
            .get_mut(&collection)
            .and_then(|slots| slots.get_mut(id))
        else {
            return Ok(None);
        };

        let mut body = slot.document.body.clone();
        apply_ops(&mut body, ops)?;
        slot.document.body = body;
        slot.document.version += 1;
        Ok(Some(slot.document.clone()))
    }

    async fn delete_one(&self, collection: CollectionName, id: &str) -> StoreResult<bool> {
        let mut collections = self.collections.write().await;
        Ok(collections
            .get_mut(&collection)
            .is_some_and(|slots| slots.remove(id).is_some()))
    }

    async fn delete_many(&self, collection: CollectionName, filter: &Filter) -> StoreResult<u64> {
        let mut collections = self.collections.write().await;
        let Some(slots) = collections.get_mut(&collection) else {
            return Ok(0);
        };

        let before = slots.len();
        slots.retain(|_, slot| !filter.matches(&slot.document.body));
        Ok((before - slots.len()) as u64)
    }

    async fn count(&self, collection: CollectionName, filter: &Filter) -> StoreResult<u64> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .map(|slots| {
                slots
                    .values()
                    .filter(|slot| filter.matches(&slot.document.body))
                    .count() as u64
            })
            .unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn find_returns_insertion_order() {
        let store = MemoryStore::new();
        for id in ["c", "a", "b"] {
            store
                .insert_one(CollectionName::Tasks, id, json!({"id": id}))
                .await
                .unwrap();
        }

        let ids: Vec<String> = store
            .find(CollectionName::Tasks, &Filter::new())
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.id)
            .collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn duplicate_ids_are_rejected() {
        let store = MemoryStore::new();
        store
            .insert_one(CollectionName::Users, "u1", json!({}))
            .await
            .unwrap();
        let err = store
            .insert_one(CollectionName::Users, "u1", json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate { .. }));
    }

    #[tokio::test]
    async fn replace_is_version_checked() {
        let store = MemoryStore::new();
        let doc = store
            .insert_one(CollectionName::Resources, "r1", json!({"allocated_hours": 0}))
            .await
            .unwrap();
        assert_eq!(doc.version, 1);

        let updated = store
            .replace_one(CollectionName::Resources, "r1", 1, json!({"allocated_hours": 8}))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.version, 2);

        // A writer still holding version 1 loses.
        let err = store
            .replace_one(CollectionName::Resources, "r1", 1, json!({"allocated_hours": 4}))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::VersionConflict { .. }));

        let missing = store
            .replace_one(CollectionName::Resources, "nope", 1, json!({}))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn update_one_bumps_version_and_delete_many_filters() {
        let store = MemoryStore::new();
        store
            .insert_one(CollectionName::Vendors, "v1", json!({"status": "active", "contracts_active": 0}))
            .await
            .unwrap();
        store
            .insert_one(CollectionName::Vendors, "v2", json!({"status": "blacklisted"}))
            .await
            .unwrap();

        let doc = store
            .update_one(
                CollectionName::Vendors,
                "v1",
                &[UpdateOp::increment("contracts_active", 1)],
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc.version, 2);
        assert_eq!(doc.body["contracts_active"], json!(1));

        let removed = store
            .delete_many(CollectionName::Vendors, &Filter::new().eq("status", "blacklisted"))
            .await
            .unwrap();
        assert_eq!(removed, 1);
        assert_eq!(
            store.count(CollectionName::Vendors, &Filter::new()).await.unwrap(),
            1
        );
        assert!(store.delete_one(CollectionName::Vendors, "v1").await.unwrap());
        assert!(!store.delete_one(CollectionName::Vendors, "v1").await.unwrap());
    }
}
