//! SQLite-backed [`DocumentStore`].

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::models::{DocumentRecord, StoredDocument};
use crate::traits::DocumentStore;

const COLUMNS: &str = "id, owner_id, file_name, storage_ref, declared_type, created_at";

pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

impl SqliteDocumentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Every document of `owner_id` with its upload time, newest first.
    pub async fn list(&self, owner_id: &str) -> Result<Vec<StoredDocument>> {
        let rows = sqlx::query(&format!(
            "SELECT {COLUMNS} FROM documents WHERE owner_id = ? ORDER BY created_at DESC, rowid DESC"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| StoredDocument {
                record: record_from_row(row),
                created_at: row.get("created_at"),
            })
            .collect())
    }
}

fn record_from_row(row: &SqliteRow) -> DocumentRecord {
    DocumentRecord {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        file_name: row.get("file_name"),
        storage_ref: row.get("storage_ref"),
        declared_type: row.get("declared_type"),
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn documents_for(&self, owner_id: &str, ids: &[String]) -> Result<Vec<DocumentRecord>> {
        if ids.is_empty() {
            return Ok(self.list(owner_id).await?.into_iter().map(|d| d.record).collect());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT {COLUMNS} FROM documents WHERE owner_id = ? AND id IN ({placeholders})"
        );
        let mut query = sqlx::query(&sql).bind(owner_id);
        for id in ids {
            query = query.bind(id);
        }
        let rows = query.fetch_all(&self.pool).await?;

        let mut records: Vec<DocumentRecord> = rows.iter().map(record_from_row).collect();
        records.sort_by_key(|r| ids.iter().position(|id| *id == r.id));
        Ok(records)
    }

    async fn register(&self, record: &DocumentRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO documents (id, owner_id, file_name, storage_ref, declared_type, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                owner_id = excluded.owner_id,
                file_name = excluded.file_name,
                storage_ref = excluded.storage_ref,
                declared_type = excluded.declared_type
            "#,
        )
        .bind(&record.id)
        .bind(&record.owner_id)
        .bind(&record.file_name)
        .bind(&record.storage_ref)
        .bind(&record.declared_type)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
