use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use snip_core::error::{Result, StorageError};
use snip_core::{BackendKind, ShortId, UrlRecord, UrlRepository};
use tracing::trace;

/// In-memory implementation of [`UrlRepository`] using DashMap.
///
/// Each instance owns its maps; nothing is shared between instances or
/// persisted across restarts. Soft delete is not supported in memory mode:
/// [`batch_soft_delete`](UrlRepository::batch_soft_delete) succeeds without
/// changing anything.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    by_short_id: DashMap<ShortId, String>,
    by_original_url: DashMap<String, ShortId>,
}

impl InMemoryRepository {
    /// Creates a new in-memory repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory repository with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            by_short_id: DashMap::with_capacity(capacity),
            by_original_url: DashMap::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.by_short_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_short_id.is_empty()
    }

    fn insert(&self, short_id: &ShortId, original_url: &str) -> Result<()> {
        // Lock order is always original URL first, then short id.
        let Entry::Vacant(by_url) = self.by_original_url.entry(original_url.to_owned()) else {
            return Err(StorageError::Conflict(original_url.to_owned()));
        };
        let Entry::Vacant(by_id) = self.by_short_id.entry(short_id.clone()) else {
            return Err(StorageError::Conflict(short_id.to_string()));
        };

        by_id.insert(original_url.to_owned());
        by_url.insert(short_id.clone());
        trace!(short_id = %short_id, "stored mapping in memory");
        Ok(())
    }
}

#[async_trait]
impl UrlRepository for InMemoryRepository {
    async fn save_one(&self, short_id: &ShortId, original_url: &str) -> Result<()> {
        self.insert(short_id, original_url)
    }

    async fn save_batch_item(&self, short_id: &ShortId, original_url: &str) -> Result<()> {
        self.insert(short_id, original_url)
    }

    async fn lookup_by_short_id(&self, short_id: &ShortId) -> Result<Option<UrlRecord>> {
        Ok(self
            .by_short_id
            .get(short_id)
            .map(|url| UrlRecord::new(short_id.clone(), url.value().clone())))
    }

    async fn lookup_by_original_url(&self, original_url: &str) -> Result<Option<UrlRecord>> {
        Ok(self
            .by_original_url
            .get(original_url)
            .map(|id| UrlRecord::new(id.value().clone(), original_url)))
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }

    async fn batch_soft_delete(&self, short_ids: &[ShortId]) -> Result<()> {
        trace!(count = short_ids.len(), "soft delete is a no-op for the memory backend");
        Ok(())
    }

    fn backend(&self) -> BackendKind {
        BackendKind::Memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn id(s: &str) -> ShortId {
        ShortId::new(s)
    }

    #[tokio::test]
    async fn save_and_lookup_both_ways() {
        let repo = InMemoryRepository::new();

        repo.save_one(&id("abc123"), "https://example.com")
            .await
            .unwrap();

        let by_id = repo.lookup_by_short_id(&id("abc123")).await.unwrap().unwrap();
        assert_eq!(by_id.original_url, "https://example.com");
        assert!(!by_id.deleted);
        assert_eq!(by_id.id, None);

        let by_url = repo
            .lookup_by_original_url("https://example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_url.short_id, id("abc123"));
    }

    #[tokio::test]
    async fn lookups_miss_without_error() {
        let repo = InMemoryRepository::new();

        assert!(repo.lookup_by_short_id(&id("nope")).await.unwrap().is_none());
        assert!(repo
            .lookup_by_original_url("https://nowhere.example")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn duplicate_original_url_conflicts() {
        let repo = InMemoryRepository::new();

        repo.save_one(&id("first"), "https://example.com")
            .await
            .unwrap();
        let err = repo
            .save_batch_item(&id("second"), "https://example.com")
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::Conflict(_)));
        assert!(repo.lookup_by_short_id(&id("second")).await.unwrap().is_none());
        assert_eq!(repo.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_short_id_conflicts_without_partial_write() {
        let repo = InMemoryRepository::new();

        repo.save_one(&id("abc123"), "https://one.example")
            .await
            .unwrap();
        let err = repo
            .save_one(&id("abc123"), "https://two.example")
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::Conflict(_)));
        assert!(repo
            .lookup_by_original_url("https://two.example")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn soft_delete_is_a_noop() {
        let repo = InMemoryRepository::new();
        repo.save_one(&id("abc123"), "https://example.com")
            .await
            .unwrap();

        repo.batch_soft_delete(&[id("abc123"), id("missing")])
            .await
            .unwrap();

        let record = repo.lookup_by_short_id(&id("abc123")).await.unwrap().unwrap();
        assert!(!record.deleted);
    }

    #[tokio::test]
    async fn health_check_always_succeeds() {
        let repo = InMemoryRepository::with_capacity(8);
        assert!(repo.health_check().await.is_ok());
        assert_eq!(repo.backend(), BackendKind::Memory);
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn concurrent_saves_of_one_url_have_a_single_winner() {
        let repo = Arc::new(InMemoryRepository::new());
        let mut handles = vec![];

        for i in 0..16u64 {
            let repo = Arc::clone(&repo);
            handles.push(tokio::spawn(async move {
                repo.save_one(&ShortId::new(format!("code-{i:03}")), "https://race.example")
                    .await
            }));
        }

        let mut winners = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(()) => winners += 1,
                Err(err) => assert!(matches!(err, StorageError::Conflict(_))),
            }
        }

        assert_eq!(winners, 1);
        assert_eq!(repo.len(), 1);
    }
}
