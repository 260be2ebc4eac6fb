//! Chunk cache for populated voxel buffers.
//!
//! Populated chunks are handed here once their download completes; the cache
//! then owns the buffer and decides when to evict it.
//!
//! # Cache Key
//!
//! Chunks are cached by:
//! - Source key (base URL of the scale or pyramid level)
//! - Level index
//! - Chunk extent (one scale may be served at several chunk sizes)
//! - Grid position
//!
//! # Size-Based Eviction
//!
//! The cache tracks the total size of cached buffers in bytes and evicts
//! least-recently-used entries when the capacity is exceeded.

use std::num::NonZeroUsize;
use std::sync::Arc;

use bytes::Bytes;
use lru::LruCache;
use tokio::sync::Mutex;

use crate::format::Vec3;

/// Default cache capacity: 256MB
pub const DEFAULT_CHUNK_CACHE_CAPACITY: usize = 256 * 1024 * 1024;

/// Default maximum number of entries (to bound LRU overhead)
const DEFAULT_MAX_ENTRIES: usize = 65_536;

// =============================================================================
// Cache Key
// =============================================================================

/// Identifies one chunk of one source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChunkKey {
    pub source: Arc<str>,
    pub level: usize,
    pub chunk_extent: Vec3,
    pub grid_position: Vec3,
}

impl ChunkKey {
    pub fn new(
        source: impl Into<Arc<str>>,
        level: usize,
        chunk_extent: Vec3,
        grid_position: Vec3,
    ) -> Self {
        Self {
            source: source.into(),
            level,
            chunk_extent,
            grid_position,
        }
    }
}

// =============================================================================
// Chunk Cache
// =============================================================================

struct CacheInner {
    entries: LruCache<ChunkKey, Bytes>,
    current_size: usize,
}

/// LRU cache for populated chunk buffers with size-based capacity.
///
/// Thread-safe; share it across tasks via `Arc`.
pub struct ChunkCache {
    inner: Mutex<CacheInner>,
    max_size: usize,
}

impl ChunkCache {
    /// Create a cache with default capacity (256MB).
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHUNK_CACHE_CAPACITY)
    }

    /// Create a cache holding at most `max_size` bytes.
    pub fn with_capacity(max_size: usize) -> Self {
        Self::with_capacity_and_entries(max_size, DEFAULT_MAX_ENTRIES)
    }

    /// Create a cache with a byte capacity and an entry limit.
    ///
    /// An entry limit of 0 is treated as 1.
    pub fn with_capacity_and_entries(max_size: usize, max_entries: usize) -> Self {
        let max_entries = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(CacheInner {
                entries: LruCache::new(max_entries),
                current_size: 0,
            }),
            max_size,
        }
    }

    /// Get a buffer, marking it recently used.
    pub async fn get(&self, key: &ChunkKey) -> Option<Bytes> {
        let mut inner = self.inner.lock().await;
        inner.entries.get(key).cloned()
    }

    /// Store a buffer, evicting least-recently-used entries past capacity.
    pub async fn put(&self, key: ChunkKey, data: Bytes) {
        let mut guard = self.inner.lock().await;
        let inner = &mut *guard;

        let data_size = data.len();
        if let Some(old) = inner.entries.peek(&key) {
            inner.current_size = inner.current_size.saturating_sub(old.len());
        }

        // Entry-count eviction happens inside put()
        if let Some((evicted_key, evicted)) = inner.entries.push(key.clone(), data) {
            if evicted_key != key {
                inner.current_size = inner.current_size.saturating_sub(evicted.len());
            }
        }
        inner.current_size += data_size;

        while inner.current_size > self.max_size {
            match inner.entries.pop_lru() {
                Some((_, evicted)) => {
                    inner.current_size = inner.current_size.saturating_sub(evicted.len());
                }
                None => break,
            }
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.entries.is_empty()
    }

    /// Total size of cached buffers in bytes.
    pub async fn size(&self) -> usize {
        self.inner.lock().await.current_size
    }

    /// Maximum capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.max_size
    }
}

impl Default for ChunkCache {
    fn default() -> Self {
        Self::new()
    }
}
