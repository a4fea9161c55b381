use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::time::Duration;
use typed_builder::TypedBuilder;

pub const DEFAULT_RESOLVE_MIN_LATENCY: Duration = Duration::from_millis(100);
pub const DEFAULT_DELETE_CHUNK_SIZE: usize = 2;

/// What `shorten` does with a URL whose only record has been soft-deleted.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeletedUrlPolicy {
    /// Hand back the deleted record's id.
    #[default]
    Reuse,
    /// Refuse with [`ShortenerError::DeletedUrl`](snip_core::ShortenerError::DeletedUrl).
    Reject,
}

impl Display for DeletedUrlPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DeletedUrlPolicy::Reuse => write!(f, "reuse"),
            DeletedUrlPolicy::Reject => write!(f, "reject"),
        }
    }
}

/// Tunables for [`ShortenerService`](crate::ShortenerService).
#[derive(Debug, Clone, TypedBuilder)]
pub struct ServiceConfig {
    /// Minimum time every resolve waits before it touches storage.
    #[builder(default = DEFAULT_RESOLVE_MIN_LATENCY)]
    pub resolve_min_latency: Duration,
    /// How many ids each concurrent delete task handles. Zero is treated as one.
    #[builder(default = DEFAULT_DELETE_CHUNK_SIZE)]
    pub delete_chunk_size: usize,
    #[builder(default)]
    pub deleted_url_policy: DeletedUrlPolicy,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.resolve_min_latency, Duration::from_millis(100));
        assert_eq!(config.delete_chunk_size, 2);
        assert_eq!(config.deleted_url_policy, DeletedUrlPolicy::Reuse);
    }

    #[test]
    fn builder_overrides() {
        let config = ServiceConfig::builder()
            .resolve_min_latency(Duration::ZERO)
            .delete_chunk_size(10)
            .deleted_url_policy(DeletedUrlPolicy::Reject)
            .build();
        assert_eq!(config.resolve_min_latency, Duration::ZERO);
        assert_eq!(config.delete_chunk_size, 10);
        assert_eq!(config.deleted_url_policy.to_string(), "reject");
    }
}
