use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use std::time::Duration;

use super::RecordStore;
use crate::common::RecordId;
use crate::domains::refresh::models::{cooldown_cutoff, GeneratedContent, RefreshableRecord};

const RECORD_COLUMNS: &str = "id, name, website_url, last_edited_at, scheduled_refresh_at, \
     flagged_at, content_version, generated_content";

/// Raw `products` row. `generated_content` is decoded leniently so one bad
/// payload cannot fail a whole query.
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: RecordId,
    name: String,
    website_url: Option<String>,
    last_edited_at: Option<DateTime<Utc>>,
    scheduled_refresh_at: Option<DateTime<Utc>>,
    flagged_at: Option<DateTime<Utc>>,
    content_version: i32,
    generated_content: Option<serde_json::Value>,
}

impl From<ProductRow> for RefreshableRecord {
    fn from(row: ProductRow) -> Self {
        let generated_content = row.generated_content.and_then(|value| {
            serde_json::from_value::<GeneratedContent>(value)
                .map_err(|e| {
                    tracing::warn!(
                        record_id = %row.id,
                        error = %e,
                        "Ignoring undecodable generated_content"
                    );
                })
                .ok()
        });

        RefreshableRecord {
            id: row.id,
            name: row.name,
            website_url: row.website_url,
            last_edited_at: row.last_edited_at,
            scheduled_refresh_at: row.scheduled_refresh_at,
            flagged_at: row.flagged_at,
            content_version: row.content_version,
            generated_content,
        }
    }
}

/// Record store over the `products` table.
#[derive(Clone)]
pub struct PostgresRecordStore {
    pool: PgPool,
}

impl PostgresRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl RecordStore for PostgresRecordStore {
    async fn find_records_with_expired_cooldown(
        &self,
        now: DateTime<Utc>,
        cooldown: Duration,
    ) -> Result<Vec<RefreshableRecord>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM products
            WHERE scheduled_refresh_at IS NOT NULL
              AND scheduled_refresh_at <= $1
            ORDER BY scheduled_refresh_at, id
            "#
        ))
        .bind(cooldown_cutoff(now, cooldown))
        .fetch_all(&self.pool)
        .await
        .context("Failed to query cooled-down products")?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn flag_for_refresh(
        &self,
        id: RecordId,
        now: DateTime<Utc>,
        cooldown: Duration,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET content_version = 0,
                scheduled_refresh_at = NULL,
                flagged_at = $2,
                updated_at = NOW()
            WHERE id = $1
              AND scheduled_refresh_at IS NOT NULL
              AND scheduled_refresh_at <= $3
            "#,
        )
        .bind(id)
        .bind(now)
        .bind(cooldown_cutoff(now, cooldown))
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to flag product {}", id))?;

        Ok(result.rows_affected() == 1)
    }

    async fn find_flagged(&self, limit: usize) -> Result<Vec<RefreshableRecord>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM products
            WHERE content_version = 0
            ORDER BY flagged_at ASC NULLS FIRST, id
            LIMIT $1
            "#
        ))
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await
        .context("Failed to query flagged products")?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn commit_generated_content(
        &self,
        id: RecordId,
        content: &GeneratedContent,
        expected_prior_version: i32,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET generated_content = $2,
                content_version = $3 + 1,
                flagged_at = NULL,
                updated_at = NOW()
            WHERE id = $1
              AND content_version = $3
            "#,
        )
        .bind(id)
        .bind(Json(content))
        .bind(expected_prior_version)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to commit generated content for product {}", id))?;

        Ok(result.rows_affected() == 1)
    }

    async fn defer_failed(&self, id: RecordId, now: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET flagged_at = GREATEST(flagged_at, $2),
                updated_at = NOW()
            WHERE id = $1
              AND content_version = 0
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to defer product {}", id))?;

        Ok(result.rows_affected() == 1)
    }

    async fn record_edit(&self, id: RecordId, now: DateTime<Utc>) -> Result<bool> {
        // GREATEST ignores NULL, so a first edit simply sets the schedule
        let result = sqlx::query(
            r#"
            UPDATE products
            SET last_edited_at = $2,
                scheduled_refresh_at = GREATEST(scheduled_refresh_at, $2),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to record edit for product {}", id))?;

        Ok(result.rows_affected() == 1)
    }

    async fn find_by_id(&self, id: RecordId) -> Result<Option<RefreshableRecord>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {RECORD_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Failed to load product {}", id))?;

        Ok(row.map(Into::into))
    }

    async fn insert(&self, record: &RefreshableRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, website_url, last_edited_at, scheduled_refresh_at,
                flagged_at, content_version, generated_content
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(record.id)
        .bind(&record.name)
        .bind(&record.website_url)
        .bind(record.last_edited_at)
        .bind(record.scheduled_refresh_at)
        .bind(record.flagged_at)
        .bind(record.content_version)
        .bind(record.generated_content.as_ref().map(Json))
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to insert product {}", record.id))?;

        Ok(())
    }
}
