//! Bounded in-memory cache tier.
//!
//! Renditions are cheap to recompute relative to their originals, so the
//! cache tier does not need to be durable. `LruStore` keeps encoded
//! renditions in memory and evicts least-recently-used entries once either
//! the byte budget or the entry budget is exceeded.
//!
//! An evicted entry simply reappears as a cache miss; the repository then
//! recomputes it from the original.

use std::num::NonZeroUsize;

use async_trait::async_trait;
use bytes::Bytes;
use lru::LruCache;
use tokio::sync::Mutex;
use tracing::debug;

use super::BlobStore;
use crate::error::StoreError;

/// Default cache capacity: 100MB
pub const DEFAULT_LRU_CAPACITY: usize = 100 * 1024 * 1024;

/// Default maximum number of entries (to bound LRU overhead)
const DEFAULT_MAX_ENTRIES: usize = 10_000;

struct LruState {
    entries: LruCache<String, Bytes>,
    current_size: usize,
}

/// LRU blob store with size-based capacity.
///
/// # Thread Safety
///
/// The store is thread-safe and can be shared across async tasks via `Arc`.
pub struct LruStore {
    state: Mutex<LruState>,

    /// Maximum total size in bytes
    max_size: usize,
}

impl LruStore {
    /// Create a store with the default capacity (100MB).
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_LRU_CAPACITY)
    }

    /// Create a store holding at most `max_size` bytes.
    pub fn with_capacity(max_size: usize) -> Self {
        Self::with_capacity_and_entries(max_size, DEFAULT_MAX_ENTRIES)
    }

    /// Create a store bounded both in bytes and in entry count.
    ///
    /// An entry budget of zero is treated as one.
    pub fn with_capacity_and_entries(max_size: usize, max_entries: usize) -> Self {
        let max_entries = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            state: Mutex::new(LruState {
                entries: LruCache::new(max_entries),
                current_size: 0,
            }),
            max_size,
        }
    }

    /// Number of cached entries.
    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.entries.is_empty()
    }

    /// Current total size of cached entries in bytes.
    pub async fn size(&self) -> usize {
        self.state.lock().await.current_size
    }

    /// Maximum capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.max_size
    }
}

impl Default for LruStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for LruStore {
    /// Does not update recency.
    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.state.lock().await.entries.contains(key))
    }

    async fn read(&self, key: &str) -> Result<Bytes, StoreError> {
        self.state
            .lock()
            .await
            .entries
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn write(&self, key: &str, data: Bytes) -> Result<(), StoreError> {
        let data_size = data.len();
        let mut state = self.state.lock().await;

        if let Some(old) = state.entries.peek(key) {
            state.current_size = state.current_size.saturating_sub(old.len());
        }

        // `push` also hands back whatever the entry budget pushed out
        if let Some((evicted_key, evicted)) = state.entries.push(key.to_string(), data) {
            if evicted_key != key {
                state.current_size = state.current_size.saturating_sub(evicted.len());
                debug!(key = %evicted_key, "lru store evicted entry (entry budget)");
            }
        }
        state.current_size += data_size;

        while state.current_size > self.max_size {
            match state.entries.pop_lru() {
                Some((evicted_key, evicted)) => {
                    state.current_size = state.current_size.saturating_sub(evicted.len());
                    debug!(key = %evicted_key, "lru store evicted entry (size budget)");
                }
                None => break,
            }
        }

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        match state.entries.pop(key) {
            Some(data) => {
                state.current_size = state.current_size.saturating_sub(data.len());
                Ok(())
            }
            None => Err(StoreError::NotFound(key.to_string())),
        }
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.entries.clear();
        state.current_size = 0;
        Ok(())
    }

    fn identifier(&self) -> &str {
        "memory+lru://"
    }
}
