//! In-memory derived-data cache backend.
//!
//! [`MemoryDdc`] is the reference [`DerivedDataCache`] backend: a
//! size-bounded LRU map from key to payload. Eviction under memory pressure
//! is legal for any backend (an evicted artifact simply reads as a miss and
//! gets rebuilt), and keys hinted transient are evicted before anything
//! else.

use std::collections::HashSet;
use std::num::NonZeroUsize;

use async_trait::async_trait;
use bytes::Bytes;
use lru::LruCache;
use tokio::sync::RwLock;
use tracing::trace;

use super::DerivedDataCache;

/// Default cache capacity: 256MB.
pub const DEFAULT_MEMORY_DDC_CAPACITY: usize = 256 * 1024 * 1024;

/// Default maximum number of entries (to bound LRU overhead).
const DEFAULT_MAX_ENTRIES: usize = 16_384;

/// LRU-bounded in-memory derived-data cache.
///
/// Thread-safe; share across tasks via `Arc`.
pub struct MemoryDdc {
    /// The underlying LRU map.
    cache: RwLock<LruCache<String, Bytes>>,

    /// Keys hinted as transient, evicted before the LRU tail.
    transient: RwLock<HashSet<String>>,

    /// Maximum total payload size in bytes.
    max_size: usize,

    /// Current total payload size in bytes.
    current_size: RwLock<usize>,
}

impl MemoryDdc {
    /// Create a cache with default capacity (256MB).
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MEMORY_DDC_CAPACITY)
    }

    /// Create a cache with the given payload capacity in bytes.
    pub fn with_capacity(max_size: usize) -> Self {
        Self::with_capacity_and_entries(max_size, DEFAULT_MAX_ENTRIES)
    }

    /// Create a cache with explicit payload and entry bounds.
    pub fn with_capacity_and_entries(max_size: usize, max_entries: usize) -> Self {
        Self {
            cache: RwLock::new(LruCache::new(
                NonZeroUsize::new(max_entries.max(1)).unwrap(),
            )),
            transient: RwLock::new(HashSet::new()),
            max_size,
            current_size: RwLock::new(0),
        }
    }

    /// Remove an entry outright. Returns the payload if it existed.
    pub async fn remove(&self, key: &str) -> Option<Bytes> {
        let mut cache = self.cache.write().await;
        let mut current_size = self.current_size.write().await;
        self.transient.write().await.remove(key);

        if let Some(data) = cache.pop(key) {
            *current_size = current_size.saturating_sub(data.len());
            Some(data)
        } else {
            None
        }
    }

    /// Drop every entry.
    pub async fn clear(&self) {
        let mut cache = self.cache.write().await;
        let mut current_size = self.current_size.write().await;
        cache.clear();
        self.transient.write().await.clear();
        *current_size = 0;
    }

    /// Number of cached entries.
    pub async fn len(&self) -> usize {
        self.cache.read().await.len()
    }

    /// Whether the cache holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.cache.read().await.is_empty()
    }

    /// Current total payload size in bytes.
    pub async fn size(&self) -> usize {
        *self.current_size.read().await
    }

    /// Maximum payload capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.max_size
    }
}

impl Default for MemoryDdc {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DerivedDataCache for MemoryDdc {
    async fn put(&self, key: &str, data: Bytes) {
        let data_size = data.len();
        let mut cache = self.cache.write().await;
        let mut current_size = self.current_size.write().await;
        let mut transient = self.transient.write().await;

        // If the key exists, subtract its old size first.
        if let Some(old) = cache.peek(key) {
            *current_size = current_size.saturating_sub(old.len());
        }

        cache.put(key.to_string(), data);
        *current_size += data_size;
        trace!(key, bytes = data_size, "ddc put");

        // Evict until within capacity: transient keys first, then the LRU
        // tail.
        while *current_size > self.max_size {
            let transient_victim = transient
                .iter()
                .find(|candidate| candidate.as_str() != key && cache.contains(candidate.as_str()))
                .cloned();

            let evicted = match transient_victim {
                Some(victim) => {
                    transient.remove(&victim);
                    cache.pop(&victim)
                }
                None => cache.pop_lru().map(|(evicted_key, data)| {
                    transient.remove(&evicted_key);
                    data
                }),
            };

            match evicted {
                Some(data) => {
                    *current_size = current_size.saturating_sub(data.len());
                }
                None => break,
            }
        }
    }

    async fn get(&self, key: &str) -> Option<Bytes> {
        let mut cache = self.cache.write().await;
        cache.get(key).cloned()
    }

    async fn probably_exists(&self, key: &str) -> bool {
        // Existence probe must not perturb LRU order.
        self.cache.read().await.contains(key)
    }

    async fn mark_transient(&self, key: &str) {
        self.transient.write().await.insert(key.to_string());
    }
}

// =============================================================================
// Tests
// =============================================================================
