use crate::error::ShortenerError;
use crate::short_id::ShortId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

type Result<T> = std::result::Result<T, ShortenerError>;

/// One entry of a batch shorten request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchItem {
    pub correlation_id: String,
    pub original_url: String,
}

/// The outcome for one entry of a batch shorten request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchShortened {
    pub correlation_id: String,
    pub short_id: ShortId,
}

/// The outcome of resolving a short id.
///
/// Only [`Resolution::Found`] carries a URL. The other variants all mean
/// "not found" to a caller that only wants `(url, found)`, but stay
/// distinguishable for callers that report them differently.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The short id maps to this original URL.
    Found(String),
    /// The short id is unknown, or the lookup failed.
    NotFound,
    /// The short id existed but has been soft-deleted.
    Gone,
    /// The caller's deadline passed before the lookup was attempted.
    DeadlineExceeded,
}

impl Resolution {
    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found(_))
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            Resolution::Found(url) => Some(url),
            _ => None,
        }
    }

    /// Projects the resolution onto `(original_url, found)`; anything but
    /// [`Resolution::Found`] becomes `("", false)`.
    pub fn into_parts(self) -> (String, bool) {
        match self {
            Resolution::Found(url) => (url, true),
            _ => (String::new(), false),
        }
    }
}

/// The entry points a transport layer calls into.
#[async_trait]
pub trait Shortener: Send + Sync + 'static {
    /// Shortens a URL, returning the existing id if it was shortened before.
    async fn shorten(&self, original_url: &str) -> Result<ShortId>;

    /// Shortens one entry of a batch request.
    async fn shorten_batch_item(&self, correlation_id: &str, original_url: &str)
        -> Result<ShortId>;

    /// Shortens every entry in input order, stopping at the first failure.
    /// Entries saved before the failure stay saved.
    async fn shorten_batch(&self, items: Vec<BatchItem>) -> Result<Vec<BatchShortened>>;

    /// Resolves a short id, giving up if `deadline` passes before the lookup
    /// starts. Never fails.
    async fn resolve(&self, short_id: &ShortId, deadline: Instant) -> Resolution;

    /// Soft-deletes the given short ids.
    async fn delete_batch(&self, short_ids: Vec<ShortId>) -> Result<()>;

    /// Liveness probe into the active backend.
    async fn health_check(&self) -> Result<()>;

    /// Name of the active backend.
    fn backend_name(&self) -> &'static str;
}
