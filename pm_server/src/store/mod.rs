//! Document persistence: per-entity collections of JSON documents keyed by id.
//!
//! Every stored document carries a `version` that grows by one on each write.
//! `replace_one` is a compare-and-swap on that version and `update_one`
//! applies its operators atomically to a single document. Nothing spans
//! more than one document.

pub mod collection;
pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

pub use collection::{Collection, Record};
pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::models::approval::Approval;
use crate::models::budget::BudgetEntry;
use crate::models::contract::Contract;
use crate::models::issue::Issue;
use crate::models::program::Program;
use crate::models::project::Project;
use crate::models::resource::Resource;
use crate::models::risk::Risk;
use crate::models::task::Task;
use crate::models::user::User;
use crate::models::vendor::Vendor;

/// The collections the tracker persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CollectionName {
    Users,
    Programs,
    Projects,
    Tasks,
    Resources,
    Budget,
    Risks,
    Vendors,
    Contracts,
    Approvals,
    Issues,
}

impl CollectionName {
    pub const ALL: [CollectionName; 11] = [
        CollectionName::Users,
        CollectionName::Programs,
        CollectionName::Projects,
        CollectionName::Tasks,
        CollectionName::Resources,
        CollectionName::Budget,
        CollectionName::Risks,
        CollectionName::Vendors,
        CollectionName::Contracts,
        CollectionName::Approvals,
        CollectionName::Issues,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionName::Users => "users",
            CollectionName::Programs => "programs",
            CollectionName::Projects => "projects",
            CollectionName::Tasks => "tasks",
            CollectionName::Resources => "resources",
            CollectionName::Budget => "budget",
            CollectionName::Risks => "risks",
            CollectionName::Vendors => "vendors",
            CollectionName::Contracts => "contracts",
            CollectionName::Approvals => "approvals",
            CollectionName::Issues => "issues",
        }
    }
}

impl std::fmt::Display for CollectionName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document as the store sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub version: i64,
    pub body: Value,
}

#[derive(Debug, Clone, PartialEq)]
enum Condition {
    Eq(Value),
    Contains(Value),
}

/// Equality filter over top-level document fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Condition)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Field must equal `value`.
    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.conditions
            .push((field.to_string(), Condition::Eq(value.into())));
        self
    }

    /// Same as [`Filter::eq`], skipped when `value` is `None`. Handy for
    /// optional query parameters.
    pub fn eq_opt<V: Into<Value>>(self, field: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.eq(field, v),
            None => self,
        }
    }

    /// Array field must contain `value`.
    pub fn contains(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.conditions
            .push((field.to_string(), Condition::Contains(value.into())));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn matches(&self, body: &Value) -> bool {
        self.conditions.iter().all(|(field, condition)| {
            let actual = body.get(field);
            match condition {
                Condition::Eq(expected) => actual == Some(expected),
                Condition::Contains(expected) => actual
                    .and_then(Value::as_array)
                    .is_some_and(|items| items.contains(expected)),
            }
        })
    }

    /// The filter as a JSONB containment document (`data @> filter`).
    pub fn to_containment(&self) -> Value {
        let mut object = Map::new();
        for (field, condition) in &self.conditions {
            let value = match condition {
                Condition::Eq(v) => v.clone(),
                Condition::Contains(v) => Value::Array(vec![v.clone()]),
            };
            object.insert(field.clone(), value);
        }
        Value::Object(object)
    }
}

/// Field-level update operators, applied in order.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOp {
    Set(Map<String, Value>),
    Push { field: String, value: Value },
    Increment { field: String, by: Value },
}

impl UpdateOp {
    pub fn set(field: &str, value: impl Into<Value>) -> Self {
        let mut fields = Map::new();
        fields.insert(field.to_string(), value.into());
        UpdateOp::Set(fields)
    }

    pub fn push(field: &str, value: impl Into<Value>) -> Self {
        UpdateOp::Push {
            field: field.to_string(),
            value: value.into(),
        }
    }

    pub fn increment(field: &str, by: impl Into<Value>) -> Self {
        UpdateOp::Increment {
            field: field.to_string(),
            by: by.into(),
        }
    }
}

/// Apply update operators to a document body in place.
pub fn apply_ops(body: &mut Value, ops: &[UpdateOp]) -> StoreResult<()> {
    let object = body.as_object_mut().ok_or(StoreError::NotAnObject)?;

    for op in ops {
        match op {
            UpdateOp::Set(fields) => {
                for (key, value) in fields {
                    object.insert(key.clone(), value.clone());
                }
            }
            UpdateOp::Push { field, value } => {
                let slot = object
                    .entry(field.clone())
                    .or_insert_with(|| Value::Array(Vec::new()));
                if slot.is_null() {
                    *slot = Value::Array(Vec::new());
                }
                let items = slot.as_array_mut().ok_or_else(|| StoreError::FieldType {
                    field: field.clone(),
                    expected: "an array",
                })?;
                items.push(value.clone());
            }
            UpdateOp::Increment { field, by } => {
                let current = object.get(field).cloned().unwrap_or(Value::from(0));
                let next = add_numbers(&current, by).ok_or_else(|| StoreError::FieldType {
                    field: field.clone(),
                    expected: "a number",
                })?;
                object.insert(field.clone(), next);
            }
        }
    }

    Ok(())
}

/// Integer + integer stays an integer so typed fields keep deserializing.
fn add_numbers(current: &Value, by: &Value) -> Option<Value> {
    if let (Some(a), Some(b)) = (current.as_i64(), by.as_i64()) {
        return Some(Value::from(a.checked_add(b)?));
    }
    let sum = current.as_f64()? + by.as_f64()?;
    serde_json::Number::from_f64(sum).map(Value::Number)
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("document {id} already exists in {collection}")]
    Duplicate { collection: CollectionName, id: String },

    #[error("document {id} in {collection} was modified concurrently")]
    VersionConflict { collection: CollectionName, id: String },

    #[error("field {field} is not {expected}")]
    FieldType { field: String, expected: &'static str },

    #[error("document body must be a JSON object")]
    NotAnObject,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("connection pool error: {0}")]
    Pool(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Backend-agnostic document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Documents matching `filter`, in insertion order.
    async fn find(
        &self,
        collection: CollectionName,
        filter: &Filter,
    ) -> StoreResult<Vec<StoredDocument>>;

    async fn find_one(
        &self,
        collection: CollectionName,
        id: &str,
    ) -> StoreResult<Option<StoredDocument>>;

    /// Insert a new document at version 1. Fails with `Duplicate` when the
    /// id (or a unique key enforced by the backend) already exists.
    async fn insert_one(
        &self,
        collection: CollectionName,
        id: &str,
        body: Value,
    ) -> StoreResult<StoredDocument>;

    async fn insert_many(
        &self,
        collection: CollectionName,
        documents: Vec<(String, Value)>,
    ) -> StoreResult<usize> {
        let count = documents.len();
        for (id, body) in documents {
            self.insert_one(collection, &id, body).await?;
        }
        Ok(count)
    }

    /// Replace the body if the stored version still equals
    /// `expected_version`. `Ok(None)` when the document does not exist.
    async fn replace_one(
        &self,
        collection: CollectionName,
        id: &str,
        expected_version: i64,
        body: Value,
    ) -> StoreResult<Option<StoredDocument>>;

    /// Apply update operators atomically. `Ok(None)` when the document does
    /// not exist.
    async fn update_one(
        &self,
        collection: CollectionName,
        id: &str,
        ops: &[UpdateOp],
    ) -> StoreResult<Option<StoredDocument>>;

    async fn delete_one(&self, collection: CollectionName, id: &str) -> StoreResult<bool>;

    async fn delete_many(&self, collection: CollectionName, filter: &Filter) -> StoreResult<u64>;

    async fn count(&self, collection: CollectionName, filter: &Filter) -> StoreResult<u64> {
        Ok(self.find(collection, filter).await?.len() as u64)
    }
}

/// Typed access to every collection over one shared store.
#[derive(Clone)]
pub struct Database {
    store: Arc<dyn DocumentStore>,
    pub users: Collection<User>,
    pub programs: Collection<Program>,
    pub projects: Collection<Project>,
    pub tasks: Collection<Task>,
    pub resources: Collection<Resource>,
    pub budget: Collection<BudgetEntry>,
    pub risks: Collection<Risk>,
    pub vendors: Collection<Vendor>,
    pub contracts: Collection<Contract>,
    pub approvals: Collection<Approval>,
    pub issues: Collection<Issue>,
}

impl Database {
    /// `max_write_attempts` bounds the retries of a version-checked write.
    pub fn new(store: Arc<dyn DocumentStore>, max_write_attempts: usize) -> Self {
        let attempts = max_write_attempts.max(1);
        Self {
            users: Collection::new(store.clone(), attempts),
            programs: Collection::new(store.clone(), attempts),
            projects: Collection::new(store.clone(), attempts),
            tasks: Collection::new(store.clone(), attempts),
            resources: Collection::new(store.clone(), attempts),
            budget: Collection::new(store.clone(), attempts),
            risks: Collection::new(store.clone(), attempts),
            vendors: Collection::new(store.clone(), attempts),
            contracts: Collection::new(store.clone(), attempts),
            approvals: Collection::new(store.clone(), attempts),
            issues: Collection::new(store.clone(), attempts),
            store,
        }
    }

    /// In-memory database, used by tests and when no database URL is set.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()), 5)
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filter_matches_equality_and_array_membership() {
        let doc = json!({"status": "open", "allocated_projects": ["p1", "p2"]});

        assert!(Filter::new().matches(&doc));
        assert!(Filter::new().eq("status", "open").matches(&doc));
        assert!(!Filter::new().eq("status", "closed").matches(&doc));
        assert!(Filter::new().contains("allocated_projects", "p2").matches(&doc));
        assert!(!Filter::new().contains("allocated_projects", "p3").matches(&doc));
        assert!(!Filter::new().eq("missing", "x").matches(&doc));
    }

    #[test]
    fn eq_opt_skips_absent_values() {
        let filter = Filter::new().eq_opt::<String>("project_id", None);
        assert!(filter.is_empty());
    }

    #[test]
    fn containment_wraps_array_conditions() {
        let filter = Filter::new()
            .eq("status", "pending")
            .contains("allocated_projects", "p1");
        assert_eq!(
            filter.to_containment(),
            json!({"status": "pending", "allocated_projects": ["p1"]})
        );
    }

    #[test]
    fn increment_keeps_integers_integral() {
        let mut doc = json!({"contracts_active": 2, "total_value": 10.5});
        apply_ops(
            &mut doc,
            &[
                UpdateOp::increment("contracts_active", 1),
                UpdateOp::increment("total_value", 4.5),
                UpdateOp::increment("penalties", 3),
            ],
        )
        .unwrap();

        assert_eq!(doc["contracts_active"], json!(3));
        assert_eq!(doc["total_value"], json!(15.0));
        assert_eq!(doc["penalties"], json!(3));
    }

    #[test]
    fn push_creates_missing_arrays_and_rejects_scalars() {
        let mut doc = json!({"name": "x"});
        apply_ops(&mut doc, &[UpdateOp::push("scenarios", json!({"id": "s1"}))]).unwrap();
        assert_eq!(doc["scenarios"], json!([{"id": "s1"}]));

        let err = apply_ops(&mut doc, &[UpdateOp::push("name", 1)]).unwrap_err();
        assert!(matches!(err, StoreError::FieldType { .. }));
    }
}
