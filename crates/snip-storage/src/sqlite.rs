use crate::sql::{map_read_error, map_write_error, ShortUrlRow};
use async_trait::async_trait;
use snip_core::error::{Result, StorageError};
use snip_core::{BackendKind, ShortId, UrlRecord, UrlRepository};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Connection, QueryBuilder, Sqlite, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

const SCHEMA: &str = include_str!("../ddl/sqlite/short_urls.sql");

/// SQLite implementation of the repository contract.
///
/// Every write runs in its own transaction, which is committed only when the
/// statement succeeds and rolled back on drop otherwise. Inserts are plain
/// inserts: the unique constraints on `short_url` and `original_url` turn a
/// duplicate into [`StorageError::Conflict`].
#[derive(Debug, Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Creates a repository from an existing SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens a pool for `dsn`, creating the database file if it is missing.
    pub async fn connect(dsn: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(dsn)
            .map_err(|e| StorageError::Unavailable(format!("invalid sqlite dsn: {e}")))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;

        info!("connected to sqlite database");
        Ok(Self::new(pool))
    }

    /// Opens a private in-memory database.
    ///
    /// The pool is pinned to a single connection that is never recycled,
    /// since every SQLite in-memory connection is a separate database.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| StorageError::Unavailable(e.to_string()))?;

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

        sqlx::query(
            r#"
            INSERT INTO short_urls (uuid, short_url, original_url)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(short_id.as_str())
        .bind(original_url)
        .execute(&mut *tx)
        .await
        .map_err(map_write_error)?;

        tx.commit().await.map_err(map_write_error)
    }

    async fn fetch_one_where(&self, column: &str, value: &str) -> Result<Option<UrlRecord>> {
        let sql = format!(
            "SELECT uuid, short_url, original_url, is_deleted FROM short_urls WHERE {column} = ? LIMIT 1"
        );
        let row = sqlx::query_as::<_, ShortUrlRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_read_error)?;

        Ok(row.map(UrlRecord::from))
    }
}

#[async_trait]
impl UrlRepository for SqliteRepository {
    async fn save_one(&self, short_id: &ShortId, original_url: &str) -> Result<()> {
        self.insert(short_id, original_url).await
    }

    async fn save_batch_item(&self, short_id: &ShortId, original_url: &str) -> Result<()> {
        self.insert(short_id, original_url).await
    }

    async fn lookup_by_short_id(&self, short_id: &ShortId) -> Result<Option<UrlRecord>> {
        self.fetch_one_where("short_url", short_id.as_str()).await
    }

    async fn lookup_by_original_url(&self, original_url: &str) -> Result<Option<UrlRecord>> {
        self.fetch_one_where("original_url", original_url).await
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

        let mut builder = QueryBuilder::<Sqlite>::new(
            "UPDATE short_urls SET is_deleted = TRUE WHERE short_url IN (",
        );
        {
            let mut separated = builder.separated(", ");
            for short_id in short_ids {
                separated.push_bind(short_id.as_str());
            }
            separated.push_unseparated(") AND NOT is_deleted");
        }

        let mut tx = self.pool.begin().await.map_err(map_write_error)?;
        let result = builder
            .build()
            .execute(&mut *tx)
            .await
            .map_err(map_write_error)?;
        tx.commit().await.map_err(map_write_error)?;

        debug!(
            requested = short_ids.len(),
            deleted = result.rows_affected(),
            "soft-deleted records in sqlite"
        );
        Ok(())
    }

    fn backend(&self) -> BackendKind {
        BackendKind::Sqlite
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
