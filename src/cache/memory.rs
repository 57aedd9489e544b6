//! In-Memory Backend Module
//!
//! A bounded, process-local stand-in for the shared cache service. Values
//! never expire; the least recently used entry is evicted at capacity.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::cache::{validate_key, CacheBackend, LruTracker};
use crate::error::{CacheError, CacheResult};

// == Memory Store ==
/// Key-value storage with LRU eviction.
#[derive(Debug)]
pub struct MemoryStore {
    /// Key-value storage
    entries: HashMap<String, Vec<u8>>,
    /// LRU access tracker
    lru: LruTracker,
    /// Maximum number of entries allowed
    max_entries: usize,
    /// Maximum size of a single value in bytes
    max_value_size: usize,
    /// Number of entries evicted so far
    evictions: u64,
}

impl MemoryStore {
    // == Constructor ==
    /// Creates a new store.
    ///
    /// # Arguments
    /// * `max_entries` - Maximum number of entries the store can hold
    /// * `max_value_size` - Largest value accepted, in bytes
    pub fn new(max_entries: usize, max_value_size: usize) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            max_entries: max_entries.max(1),
            max_value_size,
            evictions: 0,
        }
    }

    // == Set ==
    /// Stores a value, evicting the least recently used entry when full.
    pub fn set(&mut self, key: &str, value: Vec<u8>) -> CacheResult<()> {
        validate_key(key)?;

        if value.len() > self.max_value_size {
            return Err(CacheError::ValueTooLarge {
                size: value.len(),
                limit: self.max_value_size,
            });
        }

        let is_overwrite = self.entries.contains_key(key);
        if !is_overwrite && self.entries.len() >= self.max_entries {
            if let Some(evicted_key) = self.lru.evict_oldest() {
                self.entries.remove(&evicted_key);
                self.evictions += 1;
            }
        }

        self.entries.insert(key.to_string(), value);
        self.lru.touch(key);

        Ok(())
    }

    // == Get ==
    /// Retrieves a value and marks it recently used.
    pub fn get(&mut self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        validate_key(key)?;

        match self.entries.get(key) {
            Some(value) => {
                let value = value.clone();
                self.lru.touch(key);
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    // == Delete ==
    /// Removes a value, returning whether it was present.
    pub fn delete(&mut self, key: &str) -> CacheResult<bool> {
        validate_key(key)?;

        if self.entries.remove(key).is_some() {
            self.lru.remove(key);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries evicted to make room.
    pub fn evictions(&self) -> u64 {
        self.evictions
    }
}

// == Memory Backend ==
/// [`CacheBackend`] over a shared [`MemoryStore`].
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    store: Arc<RwLock<MemoryStore>>,
}

impl MemoryBackend {
    pub fn new(max_entries: usize, max_value_size: usize) -> Self {
        Self {
            store: Arc::new(RwLock::new(MemoryStore::new(max_entries, max_value_size))),
        }
    }

    /// Current number of stored entries.
    pub async fn len(&self) -> usize {
        self.store.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.read().await.is_empty()
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        // Write lock: a read refreshes the LRU position
        self.store.write().await.get(key)
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> CacheResult<()> {
        self.store.write().await.set(key, value)
    }

    async fn delete(&self, key: &str) -> CacheResult<bool> {
        self.store.write().await.delete(key)
    }
}
