use crate::sql::{map_read_error, map_write_error, ShortUrlRow};
use async_trait::async_trait;
use snip_core::error::{Result, StorageError};
use snip_core::{BackendKind, ShortId, UrlRecord, UrlRepository};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Connection, PgPool};
use tracing::{debug, info};
use uuid::Uuid;

const SCHEMA: &str = include_str!("../ddl/postgres/short_urls.sql");

/// PostgreSQL implementation of the repository contract.
///
/// Inserts use `ON CONFLICT (original_url) DO NOTHING`, so a URL that is
/// already stored leaves the table untouched and is reported as
/// [`StorageError::Conflict`]. The pool is created once and shared by all
/// callers; no extra locking happens here.
#[derive(Debug, Clone)]
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a repository from an existing PostgreSQL connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates a repository by opening a new PostgreSQL connection pool.
    pub async fn connect(dsn: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(dsn)
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;

        info!("connected to postgres database");
        Ok(Self::new(pool))
    }

    /// Creates the `short_urls` table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(map_write_error)?;
        Ok(())
    }

    async fn insert(&self, short_id: &ShortId, original_url: &str) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(map_write_error)?;

        let result = sqlx::query(
            r#"
            INSERT INTO short_urls (uuid, short_url, original_url)
            VALUES ($1, $2, $3)
            ON CONFLICT (original_url) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(short_id.as_str())
        .bind(original_url)
        .execute(&mut *tx)
        .await
        .map_err(map_write_error)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::Conflict(original_url.to_owned()));
        }

        tx.commit().await.map_err(map_write_error)
    }
}

#[async_trait]
impl UrlRepository for PostgresRepository {
    async fn save_one(&self, short_id: &ShortId, original_url: &str) -> Result<()> {
        self.insert(short_id, original_url).await
    }

    async fn save_batch_item(&self, short_id: &ShortId, original_url: &str) -> Result<()> {
        self.insert(short_id, original_url).await
    }

    async fn lookup_by_short_id(&self, short_id: &ShortId) -> Result<Option<UrlRecord>> {
        let row = sqlx::query_as::<_, ShortUrlRow>(
            r#"
            SELECT uuid, short_url, original_url, is_deleted
            FROM short_urls
            WHERE short_url = $1
            LIMIT 1
            "#,
        )
        .bind(short_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_read_error)?;

        Ok(row.map(UrlRecord::from))
    }

    async fn lookup_by_original_url(&self, original_url: &str) -> Result<Option<UrlRecord>> {
        let row = sqlx::query_as::<_, ShortUrlRow>(
            r#"
            SELECT uuid, short_url, original_url, is_deleted
            FROM short_urls
            WHERE original_url = $1
            LIMIT 1
            "#,
        )
        .bind(original_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_read_error)?;

        Ok(row.map(UrlRecord::from))
    }

    async fn health_check(&self) -> Result<()> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        conn.ping()
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))
    }

    async fn batch_soft_delete(&self, short_ids: &[ShortId]) -> Result<()> {
        if short_ids.is_empty() {
            return Ok(());
        }

        let ids: Vec<String> = short_ids.iter().map(ShortId::to_string).collect();

        let mut tx = self.pool.begin().await.map_err(map_write_error)?;
        let result = sqlx::query(
            r#"
            UPDATE short_urls
            SET is_deleted = TRUE
            WHERE short_url = ANY($1)
              AND NOT is_deleted
            "#,
        )
        .bind(ids)
        .execute(&mut *tx)
        .await
        .map_err(map_write_error)?;
        tx.commit().await.map_err(map_write_error)?;

        debug!(
            requested = short_ids.len(),
            deleted = result.rows_affected(),
            "soft-deleted records in postgres"
        );
        Ok(())
    }

    fn backend(&self) -> BackendKind {
        BackendKind::Postgres
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
