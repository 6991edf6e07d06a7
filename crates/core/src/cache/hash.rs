//! Cache entry key generation.

use sha2::{Digest, Sha256};

/// Compute the storage key for a request inside one cache.
///
/// `url` is expected to already have its fragment removed.
pub fn compute_entry_key(method: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.to_ascii_uppercase().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}
