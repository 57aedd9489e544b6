//! Cache Module
//!
//! Cache keys, the cached response envelope, and the backends that hold it.

mod envelope;
mod key;
mod lru;
mod memcached;
mod memory;

#[cfg(test)]
mod property_tests;

use async_trait::async_trait;

use crate::error::{CacheError, CacheResult};

// Re-export public types
pub use envelope::CachedResponse;
pub use key::{KeyDeriver, KEY_DELIMITER};
pub use lru::LruTracker;
pub use memcached::MemcachedBackend;
pub use memory::{MemoryBackend, MemoryStore};

// == Public Constants ==
/// Maximum allowed key length in bytes (memcached's limit)
pub const MAX_KEY_LENGTH: usize = 250;

/// Default maximum value size in bytes
pub const MAX_VALUE_SIZE: usize = 1024 * 1024; // 1 MB

// == Cache Backend ==
/// A shared key-value cache service.
///
/// Keys are ASCII strings without whitespace; values are opaque bytes with no
/// expiry. Implementations must be safe to call from many requests at once.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Fetches a value, `None` when the key is not present.
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Stores a value, replacing any previous one.
    async fn set(&self, key: &str, value: Vec<u8>) -> CacheResult<()>;

    /// Removes a value, returning `false` when the key was not present.
    async fn delete(&self, key: &str) -> CacheResult<bool>;
}

// == Key Validation ==
/// Rejects keys the cache service cannot address.
pub fn validate_key(key: &str) -> CacheResult<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidKey("key is empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(CacheError::InvalidKey(format!(
            "key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    if key.bytes().any(|b| b.is_ascii_whitespace() || b.is_ascii_control()) {
        return Err(CacheError::InvalidKey(format!(
            "key '{}' contains whitespace or control characters",
            key.escape_default()
        )));
    }
    Ok(())
}
