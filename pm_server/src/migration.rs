//! Schema migration for the PostgreSQL document store.

use diesel_async::AsyncPgConnection;
use diesel_async::SimpleAsyncConnection;

/// SQL migration for the tracker's document table.
///
/// Idempotent: every statement uses IF NOT EXISTS.
pub const MIGRATION_SQL: &str = r#"
-- ================================================================
-- Tracker document store
-- ================================================================

CREATE TABLE IF NOT EXISTS pm_documents (
    collection      VARCHAR(64) NOT NULL,
    id              VARCHAR(128) NOT NULL,
    version         BIGINT NOT NULL DEFAULT 1,
    seq             BIGSERIAL,
    data            JSONB NOT NULL,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    PRIMARY KEY (collection, id)
);

CREATE INDEX IF NOT EXISTS idx_pm_documents_seq ON pm_documents (collection, seq);
CREATE INDEX IF NOT EXISTS idx_pm_documents_data ON pm_documents USING GIN (data jsonb_path_ops);

-- Email uniqueness for the users collection
CREATE UNIQUE INDEX IF NOT EXISTS idx_pm_users_email
    ON pm_documents ((data->>'email'))
    WHERE collection = 'users';
"#;

/// Run the tracker migration.
pub async fn run_migration(conn: &mut AsyncPgConnection) -> anyhow::Result<()> {
    conn.batch_execute(MIGRATION_SQL)
        .await
        .map_err(|e| anyhow::anyhow!("tracker migration failed: {e}"))?;
    Ok(())
}
