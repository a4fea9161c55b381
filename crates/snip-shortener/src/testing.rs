//! Repository doubles shared by the unit tests in this crate.

use async_trait::async_trait;
use snip_core::error::{Result, StorageError};
use snip_core::{BackendKind, ShortId, UrlRecord, UrlRepository};
use snip_storage::InMemoryRepository;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// Wraps an in-memory repository and records how it is driven.
///
/// Unlike the real memory backend it remembers soft deletes, so resolution
/// of deleted ids can be exercised.
#[derive(Debug, Default)]
pub(crate) struct SpyRepository {
    inner: InMemoryRepository,
    saves: AtomicUsize,
    batch_saves: AtomicUsize,
    short_id_lookups: AtomicUsize,
    delete_calls: Mutex<Vec<Vec<ShortId>>>,
    deleted: Mutex<HashSet<ShortId>>,
    fail_delete_containing: Option<ShortId>,
    panic_delete_containing: Option<ShortId>,
    fail_lookups: AtomicBool,
    sneak_in: Mutex<Option<(ShortId, String)>>,
}

impl SpyRepository {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Any delete chunk containing `short_id` fails.
    pub(crate) fn failing_delete_of(short_id: &str) -> Self {
        Self {
            fail_delete_containing: Some(ShortId::new(short_id)),
            ..Self::default()
        }
    }

    /// Any delete chunk containing `short_id` panics.
    pub(crate) fn panicking_delete_of(short_id: &str) -> Self {
        Self {
            panic_delete_containing: Some(ShortId::new(short_id)),
            ..Self::default()
        }
    }

    /// Every lookup fails from now on.
    pub(crate) fn fail_lookups(&self) {
        self.fail_lookups.store(true, Ordering::SeqCst);
    }

    /// The next save stores `(short_id, original_url)` first, as if a
    /// concurrent caller had won the race for that URL.
    pub(crate) fn lose_next_save_to(&self, short_id: &str, original_url: &str) {
        *self.sneak_in.lock().unwrap() = Some((ShortId::new(short_id), original_url.to_owned()));
    }

    pub(crate) fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub(crate) fn batch_saves(&self) -> usize {
        self.batch_saves.load(Ordering::SeqCst)
    }

    pub(crate) fn short_id_lookups(&self) -> usize {
        self.short_id_lookups.load(Ordering::SeqCst)
    }

    /// Every delete call received, sorted so assertions don't depend on
    /// task scheduling.
    pub(crate) fn delete_calls(&self) -> Vec<Vec<ShortId>> {
        let mut calls = self.delete_calls.lock().unwrap().clone();
        calls.sort();
        calls
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.len()
    }

    async fn save(&self, short_id: &ShortId, original_url: &str) -> Result<()> {
        let winner = self.sneak_in.lock().unwrap().take();
        if let Some((winner_id, winner_url)) = winner {
            self.inner.save_one(&winner_id, &winner_url).await?;
        }
        self.inner.save_one(short_id, original_url).await
    }

    fn check_lookups(&self) -> Result<()> {
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(StorageError::Query("lookup refused by test".to_string()));
        }
        Ok(())
    }

    fn mark_deleted(&self, record: Option<UrlRecord>) -> Option<UrlRecord> {
        let deleted = self.deleted.lock().unwrap();
        record.map(|mut record| {
            record.deleted = deleted.contains(&record.short_id);
            record
        })
    }
}

#[async_trait]
impl UrlRepository for SpyRepository {
    async fn save_one(&self, short_id: &ShortId, original_url: &str) -> Result<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.save(short_id, original_url).await
    }

    async fn save_batch_item(&self, short_id: &ShortId, original_url: &str) -> Result<()> {
        self.batch_saves.fetch_add(1, Ordering::SeqCst);
        self.save(short_id, original_url).await
    }

    async fn lookup_by_short_id(&self, short_id: &ShortId) -> Result<Option<UrlRecord>> {
        self.short_id_lookups.fetch_add(1, Ordering::SeqCst);
        self.check_lookups()?;
        let record = self.inner.lookup_by_short_id(short_id).await?;
        Ok(self.mark_deleted(record))
    }

    async fn lookup_by_original_url(&self, original_url: &str) -> Result<Option<UrlRecord>> {
        self.check_lookups()?;
        let record = self.inner.lookup_by_original_url(original_url).await?;
        Ok(self.mark_deleted(record))
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }

    async fn batch_soft_delete(&self, short_ids: &[ShortId]) -> Result<()> {
        self.delete_calls.lock().unwrap().push(short_ids.to_vec());

        if let Some(poison) = &self.panic_delete_containing {
            if short_ids.contains(poison) {
                panic!("delete of {poison} blew up");
            }
        }
        if let Some(failing) = &self.fail_delete_containing {
            if short_ids.contains(failing) {
                return Err(StorageError::WriteFailed(format!("cannot delete {failing}")));
            }
        }

        self.deleted.lock().unwrap().extend(short_ids.iter().cloned());
        Ok(())
    }

    fn backend(&self) -> BackendKind {
        BackendKind::Memory
    }
}
