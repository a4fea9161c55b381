//! Helpers shared by the SQL backends.

use snip_core::error::StorageError;
use snip_core::{ShortId, UrlRecord};

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

/// Classifies failures that mean the same thing for reads and writes.
fn classify(err: &sqlx::Error) -> Option<StorageError> {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Configuration(_) => Some(StorageError::Unavailable(message)),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_) => Some(StorageError::InvalidData(message)),
        _ => None,
    }
}

pub(crate) fn map_read_error(err: sqlx::Error) -> StorageError {
    classify(&err).unwrap_or_else(|| StorageError::Query(err.to_string()))
}

pub(crate) fn map_write_error(err: sqlx::Error) -> StorageError {
    if is_unique_violation(&err) {
        return StorageError::Conflict(err.to_string());
    }
    classify(&err).unwrap_or_else(|| StorageError::WriteFailed(err.to_string()))
}

/// A `short_urls` row as both SQL backends select it.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ShortUrlRow {
    uuid: String,
    short_url: String,
    original_url: String,
    is_deleted: bool,
}

impl From<ShortUrlRow> for UrlRecord {
    fn from(row: ShortUrlRow) -> Self {
        UrlRecord {
            id: Some(row.uuid),
            short_id: ShortId::new(row.short_url),
            original_url: row.original_url,
            deleted: row.is_deleted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_failures_are_unavailable() {
        assert!(matches!(
            map_read_error(sqlx::Error::PoolTimedOut),
            StorageError::Unavailable(_)
        ));
        assert!(matches!(
            map_write_error(sqlx::Error::PoolClosed),
            StorageError::Unavailable(_)
        ));
    }

    #[test]
    fn fallback_depends_on_direction() {
        assert!(matches!(
            map_read_error(sqlx::Error::RowNotFound),
            StorageError::Query(_)
        ));
        assert!(matches!(
            map_write_error(sqlx::Error::RowNotFound),
            StorageError::WriteFailed(_)
        ));
    }

    #[test]
    fn decode_failures_are_invalid_data() {
        let err = sqlx::Error::ColumnNotFound("is_deleted".to_string());
        assert!(matches!(map_read_error(err), StorageError::InvalidData(_)));
    }
}
