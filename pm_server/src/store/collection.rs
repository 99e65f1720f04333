//! Typed access to one collection.
//!
//! Every write path runs the record's derivations before the document is
//! stored, so derived fields never depend on which fields a caller touched.

use std::marker::PhantomData;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use super::{CollectionName, DocumentStore, Filter, StoreError, StoredDocument, UpdateOp};
use crate::error::{TrackerError, TrackerResult};

/// Fields no update payload may overwrite.
const IMMUTABLE_FIELDS: [&str; 2] = ["id", "created_at"];

/// A domain record persisted as one document.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const COLLECTION: CollectionName;
    /// Human-readable name used in error messages.
    const LABEL: &'static str;
    /// Fields an update payload may not set directly.
    const READ_ONLY: &'static [&'static str] = &[];

    fn id(&self) -> &str;

    /// Recompute derived fields. Runs after every mutation.
    fn derive(&mut self) {}

    /// Refresh the modification timestamp, if the record keeps one.
    fn touch(&mut self, _now: DateTime<Utc>) {}

    /// Field-level invariants checked before every write.
    fn validate(&self) -> TrackerResult<()> {
        Ok(())
    }

    /// Rules that depend on the previously stored state.
    fn check_transition(&mut self, _previous: &Self, _now: DateTime<Utc>) -> TrackerResult<()> {
        Ok(())
    }
}

pub struct Collection<T> {
    store: Arc<dyn DocumentStore>,
    max_attempts: usize,
    _record: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            max_attempts: self.max_attempts,
            _record: PhantomData,
        }
    }
}

fn decode<T: Record>(document: StoredDocument) -> TrackerResult<T> {
    serde_json::from_value(document.body).map_err(|e| {
        TrackerError::Internal(format!(
            "stored {} {} is malformed: {e}",
            T::LABEL,
            document.id
        ))
    })
}

impl<T: Record> Collection<T> {
    pub fn new(store: Arc<dyn DocumentStore>, max_attempts: usize) -> Self {
        Self {
            store,
            max_attempts,
            _record: PhantomData,
        }
    }

    pub async fn list(&self, filter: &Filter) -> TrackerResult<Vec<T>> {
        self.store
            .find(T::COLLECTION, filter)
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }

    /// Raw documents, for read-side aggregation and export.
    pub async fn documents(&self, filter: &Filter) -> TrackerResult<Vec<Value>> {
        Ok(self
            .store
            .find(T::COLLECTION, filter)
            .await?
            .into_iter()
            .map(|d| d.body)
            .collect())
    }

    pub async fn find_one(&self, id: &str) -> TrackerResult<Option<T>> {
        self.store
            .find_one(T::COLLECTION, id)
            .await?
            .map(decode)
            .transpose()
    }

    pub async fn get(&self, id: &str) -> TrackerResult<T> {
        self.find_one(id)
            .await?
            .ok_or_else(|| TrackerError::not_found(T::LABEL))
    }

    pub async fn count(&self, filter: &Filter) -> TrackerResult<u64> {
        Ok(self.store.count(T::COLLECTION, filter).await?)
    }

    pub async fn insert(&self, mut record: T) -> TrackerResult<T> {
        record.validate()?;
        record.derive();
        let body = serde_json::to_value(&record).map_err(StoreError::from)?;
        self.store
            .insert_one(T::COLLECTION, record.id(), body)
            .await
            .map_err(|e| match e {
                StoreError::Duplicate { .. } => {
                    TrackerError::Conflict(format!("{} already exists", T::LABEL))
                }
                other => other.into(),
            })?;
        Ok(record)
    }

    pub async fn insert_many(&self, records: Vec<T>) -> TrackerResult<usize> {
        let mut documents = Vec::with_capacity(records.len());
        for mut record in records {
            record.validate()?;
            record.derive();
            let body = serde_json::to_value(&record).map_err(StoreError::from)?;
            documents.push((record.id().to_string(), body));
        }
        Ok(self.store.insert_many(T::COLLECTION, documents).await?)
    }

    /// Read-modify-write under an optimistic version check.
    ///
    /// `change` may run more than once: when another writer lands between
    /// the read and the write, the record is re-read and `change` re-applied.
    pub async fn modify<F>(&self, id: &str, mut change: F) -> TrackerResult<T>
    where
        F: FnMut(&mut T) -> TrackerResult<()> + Send,
    {
        for attempt in 1..=self.max_attempts {
            let document = self
                .store
                .find_one(T::COLLECTION, id)
                .await?
                .ok_or_else(|| TrackerError::not_found(T::LABEL))?;
            let version = document.version;
            let previous: T = decode(document)?;

            let now = Utc::now();
            let mut record = previous.clone();
            change(&mut record)?;
            record.check_transition(&previous, now)?;
            record.validate()?;
            record.derive();
            record.touch(now);

            let body = serde_json::to_value(&record).map_err(StoreError::from)?;
            match self.store.replace_one(T::COLLECTION, id, version, body).await {
                Ok(Some(_)) => return Ok(record),
                Ok(None) => return Err(TrackerError::not_found(T::LABEL)),
                Err(StoreError::VersionConflict { .. }) => {
                    tracing::debug!(
                        collection = %T::COLLECTION,
                        id,
                        attempt,
                        "Version conflict, retrying write"
                    );
                    crate::metrics::write_conflict(T::COLLECTION.as_str());
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::warn!(collection = %T::COLLECTION, id, "Write retries exhausted");
        Err(TrackerError::Conflict(format!(
            "{} {id} is being modified concurrently, try again",
            T::LABEL
        )))
    }

    /// Merge a JSON object of field values into the record.
    ///
    /// The merged document must still deserialize as `T`, so unknown enum
    /// values and wrongly typed fields are rejected as validation errors.
    pub async fn patch(&self, id: &str, patch: Map<String, Value>) -> TrackerResult<T> {
        let patch: Map<String, Value> = patch
            .into_iter()
            .filter(|(key, _)| {
                !IMMUTABLE_FIELDS.contains(&key.as_str()) && !T::READ_ONLY.contains(&key.as_str())
            })
            .collect();

        self.modify(id, |record| {
            let mut body = serde_json::to_value(&*record).map_err(StoreError::from)?;
            if let Some(object) = body.as_object_mut() {
                for (key, value) in &patch {
                    object.insert(key.clone(), value.clone());
                }
            }
            *record = serde_json::from_value(body).map_err(|e| {
                TrackerError::Validation(format!("invalid {} update: {e}", T::LABEL))
            })?;
            Ok(())
        })
        .await
    }

    /// Apply store-level update operators atomically.
    pub async fn update(&self, id: &str, ops: &[UpdateOp]) -> TrackerResult<T> {
        let document = self
            .store
            .update_one(T::COLLECTION, id, ops)
            .await?
            .ok_or_else(|| TrackerError::not_found(T::LABEL))?;
        decode(document)
    }

    pub async fn delete(&self, id: &str) -> TrackerResult<()> {
        if self.store.delete_one(T::COLLECTION, id).await? {
            Ok(())
        } else {
            Err(TrackerError::not_found(T::LABEL))
        }
    }

    pub async fn delete_all(&self) -> TrackerResult<u64> {
        Ok(self.store.delete_many(T::COLLECTION, &Filter::new()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Counter {
        id: String,
        hits: i64,
        doubled: i64,
        label: String,
    }

    impl Record for Counter {
        const COLLECTION: CollectionName = CollectionName::Tasks;
        const LABEL: &'static str = "Counter";
        const READ_ONLY: &'static [&'static str] = &["doubled"];

        fn id(&self) -> &str {
            &self.id
        }

        fn derive(&mut self) {
            self.doubled = self.hits * 2;
        }

        fn validate(&self) -> TrackerResult<()> {
            if self.hits < 0 {
                return Err(TrackerError::Validation("hits must be >= 0".into()));
            }
            Ok(())
        }
    }

    fn counters() -> Collection<Counter> {
        Collection::new(Arc::new(MemoryStore::new()), 5)
    }

    fn counter(id: &str) -> Counter {
        Counter {
            id: id.to_string(),
            hits: 1,
            doubled: 0,
            label: "a".into(),
        }
    }

    #[tokio::test]
    async fn insert_runs_derivations() {
        let col = counters();
        let stored = col.insert(counter("c1")).await.unwrap();
        assert_eq!(stored.doubled, 2);
        assert_eq!(col.get("c1").await.unwrap().doubled, 2);
    }

    #[tokio::test]
    async fn patch_ignores_read_only_and_immutable_fields() {
        let col = counters();
        col.insert(counter("c1")).await.unwrap();

        let patch = json!({"hits": 5, "doubled": 99, "id": "other", "label": "b"});
        let updated = col
            .patch("c1", patch.as_object().unwrap().clone())
            .await
            .unwrap();

        assert_eq!(updated.id, "c1");
        assert_eq!(updated.hits, 5);
        assert_eq!(updated.doubled, 10);
        assert_eq!(updated.label, "b");
    }

    #[tokio::test]
    async fn patch_with_wrong_types_is_a_validation_error() {
        let col = counters();
        col.insert(counter("c1")).await.unwrap();

        let patch = json!({"hits": "many"});
        let err = col
            .patch("c1", patch.as_object().unwrap().clone())
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::Validation(_)));

        let patch = json!({"hits": -1});
        let err = col
            .patch("c1", patch.as_object().unwrap().clone())
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::Validation(_)));
        assert_eq!(col.get("c1").await.unwrap().hits, 1);
    }

    #[tokio::test]
    async fn missing_records_are_not_found() {
        let col = counters();
        assert!(matches!(
            col.get("nope").await.unwrap_err(),
            TrackerError::NotFound(_)
        ));
        assert!(matches!(
            col.modify("nope", |_| Ok(())).await.unwrap_err(),
            TrackerError::NotFound(_)
        ));
        assert!(matches!(
            col.delete("nope").await.unwrap_err(),
            TrackerError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn concurrent_modifications_are_not_lost() {
        let col = counters();
        col.insert(counter("c1")).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..4 {
            let col = col.clone();
            handles.push(tokio::spawn(async move {
                col.modify("c1", |c| {
                    c.hits += 1;
                    Ok(())
                })
                .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(col.get("c1").await.unwrap().hits, 5);
    }

    #[tokio::test]
    async fn duplicate_insert_is_a_conflict() {
        let col = counters();
        col.insert(counter("c1")).await.unwrap();
        assert!(matches!(
            col.insert(counter("c1")).await.unwrap_err(),
            TrackerError::Conflict(_)
        ));
    }
}
