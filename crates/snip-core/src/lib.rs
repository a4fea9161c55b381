//! Core types and traits for the snip URL shortener.
//!
//! This crate provides the repository contract implemented by every storage
//! backend, the shortener contract consumed by transport layers, and the
//! error taxonomy shared by both.

pub mod backend;
pub mod error;
pub mod repository;
pub mod short_id;
pub mod shortener;

pub use backend::BackendKind;
pub use error::{ShortenerError, StorageError};
pub use repository::{UrlRecord, UrlRepository};
pub use short_id::ShortId;
pub use shortener::{BatchItem, BatchShortened, Resolution, Shortener};
