//! PostgreSQL document store. JSONB rows in `pm_documents`.
//!
//! Writes are compare-and-swap on the `version` column, so two handlers
//! racing on the same document cannot both win.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel::sql_types::{BigInt, Jsonb, Text};
use diesel_async::pooled_connection::deadpool::{Object, Pool};
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::{AsyncPgConnection, RunQueryDsl};
use serde_json::Value;

use super::{
    apply_ops, CollectionName, DocumentStore, Filter, StoreError, StoreResult, StoredDocument,
    UpdateOp,
};
use crate::schema::pm_documents;

/// Attempts `update_one` makes before reporting a version conflict.
const UPDATE_ATTEMPTS: usize = 8;

pub type PgPool = Pool<AsyncPgConnection>;

#[derive(Debug, QueryableByName)]
struct DocumentRow {
    #[diesel(sql_type = Text)]
    id: String,
    #[diesel(sql_type = BigInt)]
    version: i64,
    #[diesel(sql_type = Jsonb)]
    data: Value,
}

#[derive(Debug, QueryableByName)]
struct CountRow {
    #[diesel(sql_type = BigInt)]
    count: i64,
}

impl From<DocumentRow> for StoredDocument {
    fn from(row: DocumentRow) -> Self {
        StoredDocument {
            id: row.id,
            version: row.version,
            body: row.data,
        }
    }
}

impl From<(String, i64, Value)> for StoredDocument {
    fn from((id, version, body): (String, i64, Value)) -> Self {
        StoredDocument { id, version, body }
    }
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn connect(database_url: &str, max_connections: usize) -> StoreResult<Self> {
        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
        let pool = Pool::builder(manager)
            .max_size(max_connections)
            .build()
            .map_err(|e| StoreError::Pool(e.to_string()))?;
        Ok(Self { pool })
    }

    /// Create the document table and indexes.
    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        let mut conn = self.conn().await?;
        tracing::info!("Running tracker migration...");
        crate::migration::run_migration(&mut conn).await?;
        tracing::info!("Tracker migration completed.");
        Ok(())
    }

    async fn conn(&self) -> StoreResult<Object<AsyncPgConnection>> {
        self.pool
            .get()
            .await
            .map_err(|e| StoreError::Pool(e.to_string()))
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn find(
        &self,
        collection: CollectionName,
        filter: &Filter,
    ) -> StoreResult<Vec<StoredDocument>> {
        let mut conn = self.conn().await?;
        let rows: Vec<DocumentRow> = diesel::sql_query(
            "SELECT id, version, data FROM pm_documents \
             WHERE collection = $1 AND data @> $2 \
             ORDER BY seq ASC",
        )
        .bind::<Text, _>(collection.as_str())
        .bind::<Jsonb, _>(filter.to_containment())
        .load(&mut conn)
        .await?;
        Ok(rows.into_iter().map(StoredDocument::from).collect())
    }

    async fn find_one(
        &self,
        collection: CollectionName,
        id: &str,
    ) -> StoreResult<Option<StoredDocument>> {
        let mut conn = self.conn().await?;
        let row = pm_documents::table
            .filter(pm_documents::collection.eq(collection.as_str()))
            .filter(pm_documents::id.eq(id))
            .select((pm_documents::id, pm_documents::version, pm_documents::data))
            .first::<(String, i64, Value)>(&mut conn)
            .await
            .optional()?;
        Ok(row.map(StoredDocument::from))
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

        let mut conn = self.conn().await?;
        let inserted = diesel::insert_into(pm_documents::table)
            .values((
                pm_documents::collection.eq(collection.as_str()),
                pm_documents::id.eq(id),
                pm_documents::version.eq(1_i64),
                pm_documents::data.eq(body),
            ))
            .returning((pm_documents::id, pm_documents::version, pm_documents::data))
            .get_result::<(String, i64, Value)>(&mut conn)
            .await;

        match inserted {
            Ok(row) => Ok(row.into()),
            Err(DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _)) => {
                Err(StoreError::Duplicate {
                    collection,
                    id: id.to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
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

        let mut conn = self.conn().await?;
        let updated = diesel::update(
            pm_documents::table
                .filter(pm_documents::collection.eq(collection.as_str()))
                .filter(pm_documents::id.eq(id))
                .filter(pm_documents::version.eq(expected_version)),
        )
        .set((
            pm_documents::data.eq(body),
            pm_documents::version.eq(pm_documents::version + 1_i64),
            pm_documents::updated_at.eq(chrono::Utc::now()),
        ))
        .returning((pm_documents::id, pm_documents::version, pm_documents::data))
        .get_result::<(String, i64, Value)>(&mut conn)
        .await
        .optional()?;

        if let Some(row) = updated {
            return Ok(Some(row.into()));
        }

        // Nothing matched: either the document is gone or another writer
        // moved the version on.
        let exists: i64 = pm_documents::table
            .filter(pm_documents::collection.eq(collection.as_str()))
            .filter(pm_documents::id.eq(id))
            .count()
            .get_result(&mut conn)
            .await?;

        if exists > 0 {
            Err(StoreError::VersionConflict {
                collection,
                id: id.to_string(),
            })
        } else {
            Ok(None)
        }
    }

    async fn update_one(
        &self,
        collection: CollectionName,
        id: &str,
        ops: &[UpdateOp],
    ) -> StoreResult<Option<StoredDocument>> {
        for attempt in 1..=UPDATE_ATTEMPTS {
            let Some(current) = self.find_one(collection, id).await? else {
                return Ok(None);
            };

            let mut body = current.body;
            apply_ops(&mut body, ops)?;

            match self.replace_one(collection, id, current.version, body).await {
                Err(StoreError::VersionConflict { .. }) => {
                    tracing::debug!(%collection, id, attempt, "update_one lost a version race, retrying");
                    crate::metrics::write_conflict(collection.as_str());
                }
                other => return other,
            }
        }

        Err(StoreError::VersionConflict {
            collection,
            id: id.to_string(),
        })
    }

    async fn delete_one(&self, collection: CollectionName, id: &str) -> StoreResult<bool> {
        let mut conn = self.conn().await?;
        let deleted = diesel::delete(
            pm_documents::table
                .filter(pm_documents::collection.eq(collection.as_str()))
                .filter(pm_documents::id.eq(id)),
        )
        .execute(&mut conn)
        .await?;
        Ok(deleted > 0)
    }

    async fn delete_many(&self, collection: CollectionName, filter: &Filter) -> StoreResult<u64> {
        let mut conn = self.conn().await?;
        let deleted = diesel::sql_query(
            "DELETE FROM pm_documents WHERE collection = $1 AND data @> $2",
        )
        .bind::<Text, _>(collection.as_str())
        .bind::<Jsonb, _>(filter.to_containment())
        .execute(&mut conn)
        .await?;
        Ok(deleted as u64)
    }

    async fn count(&self, collection: CollectionName, filter: &Filter) -> StoreResult<u64> {
        let mut conn = self.conn().await?;
        let row: CountRow = diesel::sql_query(
            "SELECT COUNT(*) AS count FROM pm_documents \
             WHERE collection = $1 AND data @> $2",
        )
        .bind::<Text, _>(collection.as_str())
        .bind::<Jsonb, _>(filter.to_containment())
        .get_result(&mut conn)
        .await?;
        Ok(row.count as u64)
    }
}
