use crate::{FileRepository, InMemoryRepository, PostgresRepository, SqliteRepository};
use snip_core::error::{Result, StorageError};
use snip_core::{BackendKind, UrlRepository};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use typed_builder::TypedBuilder;

pub const DEFAULT_FILE_STORAGE_PATH: &str = "/tmp/short-url-db.json";
pub const DEFAULT_SQLITE_DSN: &str = "sqlite://urlshortener.db?mode=rwc";

/// Everything needed to open the configured backend.
#[derive(Debug, Clone, TypedBuilder)]
pub struct StorageConfig {
    kind: BackendKind,
    #[builder(default = PathBuf::from(DEFAULT_FILE_STORAGE_PATH), setter(into))]
    file_path: PathBuf,
    #[builder(default, setter(strip_option, into))]
    database_dsn: Option<String>,
}

impl StorageConfig {
    pub fn kind(&self) -> BackendKind {
        self.kind
    }
}

/// Opens the configured backend, prepares its schema and returns it as the
/// single repository the process uses.
///
/// Any failure here is a startup failure: the caller should not serve
/// traffic with a half-opened backend.
pub async fn open_repository(config: &StorageConfig) -> Result<Arc<dyn UrlRepository>> {
    let repository: Arc<dyn UrlRepository> = match config.kind {
        BackendKind::Memory => Arc::new(InMemoryRepository::new()),
        BackendKind::File => Arc::new(FileRepository::open(&config.file_path)?),
        BackendKind::Sqlite => {
            let dsn = config.database_dsn.as_deref().unwrap_or(DEFAULT_SQLITE_DSN);
            let repository = SqliteRepository::connect(dsn).await?;
            repository.ensure_schema().await?;
            Arc::new(repository)
        }
        BackendKind::Postgres => {
            let dsn = config.database_dsn.as_deref().ok_or_else(|| {
                StorageError::Unavailable("a database dsn is required for postgres".to_string())
            })?;
            let repository = PostgresRepository::connect(dsn).await?;
            repository.ensure_schema().await?;
            Arc::new(repository)
        }
    };

    info!(backend = %config.kind, "storage backend ready");
    Ok(repository)
}
