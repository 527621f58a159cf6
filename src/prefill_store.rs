//! Persistent prefill fields with the fill-but-never-clobber rule.
//!
//! Each proposal is one `INSERT … ON CONFLICT DO UPDATE … WHERE` statement,
//! so the emptiness check and the write happen atomically inside SQLite.
//! Two concurrent requests proposing values for the same empty field race
//! only on which one lands first; neither can overwrite a filled value.

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::Utc;
use intake_harness_core::prefill::is_filled;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::models::{Confidence, PrefillEntity, PrefillField};

/// Apply proposals, returning the names of the fields actually filled.
pub async fn apply_prefill(
    pool: &SqlitePool,
    owner_id: &str,
    entity: PrefillEntity,
    proposals: &[PrefillField],
) -> Result<Vec<String>> {
    let now = Utc::now().timestamp();
    let mut filled = Vec::new();

    for proposal in proposals {
        let Some(value) = proposal.value.as_deref().filter(|v| is_filled(Some(*v))) else {
            continue;
        };

        let result = sqlx::query(
            r#"
            INSERT INTO prefill_fields (owner_id, entity, field_name, value, confidence, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(owner_id, entity, field_name) DO UPDATE SET
                value = excluded.value,
                confidence = excluded.confidence,
                updated_at = excluded.updated_at
            WHERE prefill_fields.value IS NULL OR trim(prefill_fields.value) = ''
            "#,
        )
        .bind(owner_id)
        .bind(entity.as_str())
        .bind(&proposal.field_name)
        .bind(value)
        .bind(proposal.confidence.as_str())
        .bind(now)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            filled.push(proposal.field_name.clone());
        }
    }

    debug!(
        owner_id,
        entity = %entity,
        proposed = proposals.len(),
        filled = filled.len(),
        "prefill applied"
    );
    Ok(filled)
}

/// A value entered by the user. Always overwrites.
pub async fn set_field(
    pool: &SqlitePool,
    owner_id: &str,
    entity: PrefillEntity,
    field_name: &str,
    value: Option<&str>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO prefill_fields (owner_id, entity, field_name, value, confidence, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(owner_id, entity, field_name) DO UPDATE SET
            value = excluded.value,
            confidence = excluded.confidence,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(owner_id)
    .bind(entity.as_str())
    .bind(field_name)
    .bind(value)
    .bind(Confidence::High.as_str())
    .bind(Utc::now().timestamp())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn load_fields(
    pool: &SqlitePool,
    owner_id: &str,
    entity: PrefillEntity,
) -> Result<BTreeMap<String, Option<String>>> {
    let rows = sqlx::query(
        "SELECT field_name, value FROM prefill_fields WHERE owner_id = ? AND entity = ? ORDER BY field_name",
    )
    .bind(owner_id)
    .bind(entity.as_str())
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| (row.get("field_name"), row.get("value")))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::{db, migrate};

    async fn pool() -> (tempfile::TempDir, SqlitePool) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::minimal();
        config.db.path = dir.path().join("intake.sqlite");
        let pool = db::connect(&config).await.unwrap();
        migrate::create_schema(&pool).await.unwrap();
        (dir, pool)
    }

    #[tokio::test]
    async fn never_overwrites_user_values() {
        let (_dir, pool) = pool().await;
        set_field(&pool, "o1", PrefillEntity::Profile, "city", Some("Lyon"))
            .await
            .unwrap();
        set_field(&pool, "o1", PrefillEntity::Profile, "tagline", Some(" "))
            .await
            .unwrap();

        let proposals = vec![
            PrefillField::new("city", "Paris", Confidence::High),
            PrefillField::new("tagline", "Bols faits main", Confidence::Medium),
            PrefillField::new("business_name", "Atelier Lune", Confidence::High),
        ];
        let filled = apply_prefill(&pool, "o1", PrefillEntity::Profile, &proposals)
            .await
            .unwrap();
        assert_eq!(filled, vec!["tagline", "business_name"]);

        let fields = load_fields(&pool, "o1", PrefillEntity::Profile).await.unwrap();
        assert_eq!(fields["city"].as_deref(), Some("Lyon"));
        assert_eq!(fields["tagline"].as_deref(), Some("Bols faits main"));
        assert_eq!(fields["business_name"].as_deref(), Some("Atelier Lune"));
    }

    #[tokio::test]
    async fn second_apply_is_a_no_op() {
        let (_dir, pool) = pool().await;
        let proposals = vec![PrefillField::new("city", "Lyon", Confidence::High)];
        let first = apply_prefill(&pool, "o1", PrefillEntity::Persona, &proposals)
            .await
            .unwrap();
        let second = apply_prefill(&pool, "o1", PrefillEntity::Persona, &proposals)
            .await
            .unwrap();
        assert_eq!(first, vec!["city"]);
        assert!(second.is_empty());
        assert!(load_fields(&pool, "o1", PrefillEntity::Profile)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn concurrent_applies_fill_once() {
        let (_dir, pool) = pool().await;
        let mut handles = Vec::new();
        for i in 0..8 {
            let pool = pool.clone();
            handles.push(tokio::spawn(async move {
                let city = format!("Ville {i}");
                let proposals = vec![PrefillField::new("city", &city, Confidence::Low)];
                apply_prefill(&pool, "o1", PrefillEntity::Profile, &proposals)
                    .await
                    .unwrap()
            }));
        }

        let mut total_filled = 0;
        for handle in handles {
            total_filled += handle.await.unwrap().len();
        }
        assert_eq!(total_filled, 1);

        let fields = load_fields(&pool, "o1", PrefillEntity::Profile).await.unwrap();
        assert!(fields["city"].as_deref().unwrap().starts_with("Ville "));
    }
}
