//! URL shortener service implementation.
//!
//! This crate provides [`ShortenerService`], the id generator it uses and the
//! concurrent bulk-delete coordinator. Core types are re-exported from
//! `snip_core`.

pub mod batch_delete;
pub mod config;
pub mod generator;
pub mod service;

#[cfg(test)]
mod testing;

pub use batch_delete::BatchDeleter;
pub use config::{DeletedUrlPolicy, ServiceConfig};
pub use generator::{Clock, Generator, HashTimeGenerator, SystemClock};
pub use service::ShortenerService;

pub use snip_core::{
    BatchItem, BatchShortened, Resolution, ShortId, Shortener, ShortenerError,
};
