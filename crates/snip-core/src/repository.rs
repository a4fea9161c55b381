use crate::backend::BackendKind;
use crate::error::Result;
use crate::short_id::ShortId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A stored URL mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlRecord {
    /// Internal record marker. Only durable backends assign one.
    pub id: Option<String>,
    /// The identifier the record is exposed under.
    pub short_id: ShortId,
    /// The original URL that was shortened.
    pub original_url: String,
    /// Whether the record has been soft-deleted.
    pub deleted: bool,
}

impl UrlRecord {
    /// Creates a live record without an internal id.
    pub fn new(short_id: ShortId, original_url: impl Into<String>) -> Self {
        Self {
            id: None,
            short_id,
            original_url: original_url.into(),
            deleted: false,
        }
    }
}

/// The capability set every storage backend provides.
///
/// All backends report failures through the same
/// [`StorageError`](crate::error::StorageError) variants, so callers never
/// branch on the backend type. A missing record is `Ok(None)`, never an error.
#[async_trait]
pub trait UrlRepository: Send + Sync + 'static {
    /// Stores one new mapping.
    ///
    /// The write is an atomic insert-if-absent: if either the short id or the
    /// original URL is already stored, nothing is written and
    /// `Err(StorageError::Conflict)` is returned.
    async fn save_one(&self, short_id: &ShortId, original_url: &str) -> Result<()>;

    /// Stores one mapping on behalf of a batch request.
    ///
    /// Same contract as [`save_one`](Self::save_one); backends may use a
    /// different write path but never leave a partial write for the item.
    async fn save_batch_item(&self, short_id: &ShortId, original_url: &str) -> Result<()>;

    /// Retrieves the record stored under a short id, including soft-deleted
    /// records.
    async fn lookup_by_short_id(&self, short_id: &ShortId) -> Result<Option<UrlRecord>>;

    /// Retrieves the record for an original URL, including soft-deleted
    /// records. `Ok(None)` means nothing was found.
    async fn lookup_by_original_url(&self, original_url: &str) -> Result<Option<UrlRecord>>;

    /// Liveness probe into the backend.
    async fn health_check(&self) -> Result<()>;

    /// Marks the given records deleted where they are not already.
    /// Unknown ids are ignored.
    async fn batch_soft_delete(&self, short_ids: &[ShortId]) -> Result<()>;

    /// Which backend this is.
    fn backend(&self) -> BackendKind;

    /// Releases the backend handle. Called once at shutdown.
    async fn close(&self) {}
}
