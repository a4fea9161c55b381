pub mod clock;
pub mod hash_time;

pub use clock::{Clock, SystemClock};
pub use hash_time::HashTimeGenerator;

use snip_core::ShortId;

/// Trait for generating short ids.
///
/// Implementations are pure generators that don't interact with storage.
/// Whether an id is already taken is settled by the repository on insert.
pub trait Generator: Send + Sync + 'static {
    /// Generates a short id for `original_url`.
    fn generate(&self, original_url: &str) -> ShortId;
}
