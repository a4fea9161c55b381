use crate::generator::clock::{Clock, SystemClock};
use crate::generator::Generator;
use sha2::{Digest, Sha256};
use snip_core::ShortId;
use tracing::trace;

const HASH_PREFIX_LEN: usize = 8;
const TIME_SUFFIX_LEN: usize = 8;

/// Builds ids from the URL digest and the current time.
///
/// An id is the first 8 hex characters of `SHA-256(original_url)` followed
/// by the first 8 hex characters of the clock's nanosecond timestamp, printed
/// as 16 zero-padded hex digits. Ids are therefore always 16 lowercase hex
/// characters long.
///
/// The time suffix only changes every 2^32 nanoseconds (about 4.3 seconds),
/// so the same URL shortened twice inside that window yields the same id.
/// Different URLs in the same window differ in their hash prefix.
#[derive(Debug, Clone, Default)]
pub struct HashTimeGenerator<C = SystemClock> {
    clock: C,
}

impl HashTimeGenerator<SystemClock> {
    pub fn new() -> Self {
        Self { clock: SystemClock }
    }
}

impl<C: Clock> HashTimeGenerator<C> {
    pub fn with_clock(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> Generator for HashTimeGenerator<C> {
    fn generate(&self, original_url: &str) -> ShortId {
        let digest = format!("{:x}", Sha256::digest(original_url.as_bytes()));
        // A clock before the epoch has no meaningful suffix; pin it to zero.
        let nanos = u64::try_from(self.clock.now().as_nanosecond()).unwrap_or(0);
        let stamp = format!("{nanos:016x}");

        let mut id = String::with_capacity(HASH_PREFIX_LEN + TIME_SUFFIX_LEN);
        id.push_str(&digest[..HASH_PREFIX_LEN]);
        id.push_str(&stamp[..TIME_SUFFIX_LEN]);

        trace!(%original_url, short_id = %id, "generated short id");
        ShortId::from(id)
    }
}
