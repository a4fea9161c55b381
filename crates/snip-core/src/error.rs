use thiserror::Error;

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors returned by every storage backend, regardless of the technology
/// behind it.
///
/// "Not found" is never an error: lookups return `Ok(None)` instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("record already exists: {0}")]
    Conflict(String),
    #[error("storage write failed: {0}")]
    WriteFailed(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
    #[error("unknown storage backend '{0}', expected one of: memory, file, sqlite, postgres")]
    UnknownBackend(String),
}

/// Errors surfaced by the shortening service.
///
/// Resolution never produces one of these; read failures are folded into
/// [`Resolution::NotFound`](crate::shortener::Resolution::NotFound).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShortenerError {
    #[error("error checking existing URL: {0}")]
    Lookup(#[source] StorageError),
    #[error("error saving URL: {0}")]
    Save(#[source] StorageError),
    #[error("error deleting URLs: {0}")]
    Delete(#[source] StorageError),
    #[error("batch delete failed: {source}")]
    PartialBatchFailure {
        /// The first chunk failure observed by the coordinator.
        #[source]
        source: StorageError,
        /// How many chunks failed in total.
        failed_chunks: usize,
        /// How many chunks were dispatched.
        total_chunks: usize,
    },
    #[error("storage health check failed: {0}")]
    Unavailable(#[source] StorageError),
    #[error("batch must contain at least one item")]
    EmptyBatch,
    #[error("url was shortened before and has since been deleted: {0}")]
    DeletedUrl(String),
}

impl ShortenerError {
    /// Returns the storage error behind this failure, if there is one.
    pub fn storage_error(&self) -> Option<&StorageError> {
        match self {
            Self::Lookup(e) | Self::Save(e) | Self::Delete(e) | Self::Unavailable(e) => Some(e),
            Self::PartialBatchFailure { source, .. } => Some(source),
            Self::EmptyBatch | Self::DeletedUrl(_) => None,
        }
    }
}
