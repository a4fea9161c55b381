use crate::batch_delete::BatchDeleter;
use crate::config::{DeletedUrlPolicy, ServiceConfig};
use crate::generator::{Generator, HashTimeGenerator};
use async_trait::async_trait;
use snip_core::{
    BatchItem, BatchShortened, Resolution, ShortId, Shortener, ShortenerError, StorageError,
    UrlRepository,
};
use std::sync::Arc;
use tokio::time::{self, Instant};
use tracing::{debug, error, info, trace, warn};

type Result<T> = std::result::Result<T, ShortenerError>;

/// Which repository entry point a save goes through.
#[derive(Debug, Clone, Copy)]
enum SavePath {
    Single,
    Batch,
}

/// A concrete implementation of the `Shortener` trait.
///
/// This service wraps one repository and a `Generator` to handle:
/// - Deduplication of URLs that were shortened before
/// - Short id generation for new URLs
/// - Gated resolution with a caller deadline
/// - Bulk soft deletes through a [`BatchDeleter`]
///
/// Uniqueness of URLs is enforced by the repository. When a concurrent caller
/// stores the same URL between our lookup and our insert, the repository
/// reports a conflict and the winner's id is returned instead.
#[derive(Clone)]
pub struct ShortenerService<G = HashTimeGenerator> {
    repository: Arc<dyn UrlRepository>,
    generator: Arc<G>,
    deleter: BatchDeleter,
    config: ServiceConfig,
}

impl ShortenerService<HashTimeGenerator> {
    /// Creates a service that generates ids with [`HashTimeGenerator`].
    pub fn new(repository: Arc<dyn UrlRepository>, config: ServiceConfig) -> Self {
        Self::with_generator(repository, HashTimeGenerator::new(), config)
    }
}

impl<G: Generator> ShortenerService<G> {
    /// Creates a service with a custom generator.
    pub fn with_generator(
        repository: Arc<dyn UrlRepository>,
        generator: G,
        config: ServiceConfig,
    ) -> Self {
        let deleter = BatchDeleter::new(Arc::clone(&repository), config.delete_chunk_size);
        Self {
            repository,
            generator: Arc::new(generator),
            deleter,
            config,
        }
    }

    /// Returns the id already assigned to `original_url`, if any.
    async fn existing(&self, original_url: &str) -> Result<Option<ShortId>> {
        let record = self
            .repository
            .lookup_by_original_url(original_url)
            .await
            .map_err(ShortenerError::Lookup)?;

        match record {
            None => Ok(None),
            Some(record)
                if record.deleted && self.config.deleted_url_policy == DeletedUrlPolicy::Reject =>
            {
                debug!(short_id = %record.short_id, "refusing to reuse deleted url");
                Err(ShortenerError::DeletedUrl(record.short_id.into_string()))
            }
            Some(record) => Ok(Some(record.short_id)),
        }
    }

    async fn shorten_via(&self, original_url: &str, path: SavePath) -> Result<ShortId> {
        if let Some(short_id) = self.existing(original_url).await? {
            trace!(%short_id, "url already shortened");
            return Ok(short_id);
        }

        let short_id = self.generator.generate(original_url);
        let saved = match path {
            SavePath::Single => self.repository.save_one(&short_id, original_url).await,
            SavePath::Batch => {
                self.repository
                    .save_batch_item(&short_id, original_url)
                    .await
            }
        };

        match saved {
            Ok(()) => {
                debug!(%short_id, ?path, "shortened url");
                Ok(short_id)
            }
            Err(conflict @ StorageError::Conflict(_)) => {
                // Lost the race for this URL; hand out whatever won.
                match self.existing(original_url).await? {
                    Some(winner) => {
                        debug!(short_id = %winner, "url stored concurrently, reusing its id");
                        Ok(winner)
                    }
                    None => Err(ShortenerError::Save(conflict)),
                }
            }
            Err(e) => Err(ShortenerError::Save(e)),
        }
    }
}

#[async_trait]
impl<G: Generator> Shortener for ShortenerService<G> {
    async fn shorten(&self, original_url: &str) -> Result<ShortId> {
        self.shorten_via(original_url, SavePath::Single).await
    }

    async fn shorten_batch_item(
        &self,
        correlation_id: &str,
        original_url: &str,
    ) -> Result<ShortId> {
        trace!(%correlation_id, "shortening batch item");
        self.shorten_via(original_url, SavePath::Batch).await
    }

    async fn shorten_batch(&self, items: Vec<BatchItem>) -> Result<Vec<BatchShortened>> {
        if items.is_empty() {
            return Err(ShortenerError::EmptyBatch);
        }

        let mut shortened = Vec::with_capacity(items.len());
        for item in items {
            let short_id = self
                .shorten_batch_item(&item.correlation_id, &item.original_url)
                .await?;
            shortened.push(BatchShortened {
                correlation_id: item.correlation_id,
                short_id,
            });
        }

        info!(count = shortened.len(), "shortened batch");
        Ok(shortened)
    }

    async fn resolve(&self, short_id: &ShortId, deadline: Instant) -> Resolution {
        if Instant::now() >= deadline {
            debug!(%short_id, "deadline passed before resolve started");
            return Resolution::DeadlineExceeded;
        }

        tokio::select! {
            biased;
            _ = time::sleep_until(deadline) => {
                debug!(%short_id, "deadline passed during resolve gate");
                return Resolution::DeadlineExceeded;
            }
            _ = time::sleep(self.config.resolve_min_latency) => {}
        }

        match self.repository.lookup_by_short_id(short_id).await {
            Ok(Some(record)) if record.deleted => {
                trace!(%short_id, "short id was deleted");
                Resolution::Gone
            }
            Ok(Some(record)) => {
                trace!(%short_id, "resolved short id");
                Resolution::Found(record.original_url)
            }
            Ok(None) => {
                trace!(%short_id, "short id not found");
                Resolution::NotFound
            }
            Err(e) => {
                error!(%short_id, error = %e, "failed to resolve short id");
                Resolution::NotFound
            }
        }
    }

    async fn delete_batch(&self, short_ids: Vec<ShortId>) -> Result<()> {
        match short_ids.len() {
            0 => Err(ShortenerError::EmptyBatch),
            1 => self
                .repository
                .batch_soft_delete(&short_ids)
                .await
                .map_err(ShortenerError::Delete),
            n => {
                debug!(ids = n, chunk_size = self.deleter.chunk_size(), "dispatching batch delete");
                self.deleter.delete(short_ids).await
            }
        }
    }

    async fn health_check(&self) -> Result<()> {
        self.repository.health_check().await.map_err(|e| {
            warn!(backend = %self.repository.backend(), error = %e, "health check failed");
            ShortenerError::Unavailable(e)
        })
    }

    fn backend_name(&self) -> &'static str {
        self.repository.backend().as_str()
    }
}
