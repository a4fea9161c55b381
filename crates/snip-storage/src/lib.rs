//! Storage backends for the snip URL shortener.
//!
//! Every backend implements [`UrlRepository`]; [`open_repository`] turns a
//! [`StorageConfig`] into the one repository a process runs with.

pub mod factory;
pub mod file;
pub mod memory;
pub mod postgres;
mod sql;
pub mod sqlite;

pub use factory::{open_repository, StorageConfig};
pub use file::FileRepository;
pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;
pub use sqlite::SqliteRepository;

pub use snip_core::{BackendKind, ShortId, StorageError, UrlRecord, UrlRepository};
