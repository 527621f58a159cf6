use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    create_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create every table and index. Safe to run on an existing database.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    // Uploaded document metadata; blobs live in the configured store
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL,
            file_name TEXT NOT NULL,
            storage_ref TEXT NOT NULL,
            declared_type TEXT,
            created_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // One row per (owner, entity, field); value NULL or blank means unfilled
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS prefill_fields (
            owner_id TEXT NOT NULL,
            entity TEXT NOT NULL,
            field_name TEXT NOT NULL,
            value TEXT,
            confidence TEXT NOT NULL DEFAULT 'medium',
            updated_at INTEGER NOT NULL,
            PRIMARY KEY (owner_id, entity, field_name)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_documents_owner ON documents(owner_id, created_at DESC)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
