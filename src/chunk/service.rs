//! Chunk Service for serving populated chunks.
//!
//! The ChunkService is the entry point a scheduler talks to. It orchestrates:
//! - Source lookup and grid validation
//! - Cache lookups
//! - One download per miss (fetch + decode)
//! - Result caching
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                       ChunkService                         │
//! │  ┌──────────────────────────────────────────────────────┐  │
//! │  │                    get_chunk()                       │  │
//! │  │  1. Resolve source   3. Download (fetch + decode)    │  │
//! │  │  2. Check cache      4. Cache & return               │  │
//! │  └──────────────────────────────────────────────────────┘  │
//! │          │                     │                  │        │
//! │          ▼                     ▼                  ▼        │
//! │   ┌─────────────┐     ┌────────────────┐   ┌────────────┐  │
//! │   │ ChunkSource │     │  ChunkFetcher  │   │ ChunkCache │  │
//! │   └─────────────┘     └────────────────┘   └────────────┘  │
//! └────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use super::cache::{ChunkCache, ChunkKey};
use super::source::{ChunkSource, SourceParameters};
use super::state::DownloadOutcome;
use crate::error::{ChunkError, ValidationError};
use crate::format::{MultiscaleSource, SourceOptions, Vec3};
use crate::io::{CancellationToken, ChunkFetcher};

// =============================================================================
// Chunk Response
// =============================================================================

/// A populated chunk buffer.
#[derive(Debug, Clone)]
pub struct ChunkResponse {
    /// Channel-planar voxel buffer
    pub data: Bytes,

    /// Voxel dimensions of `data`
    pub data_size: Vec3,

    /// Whether this chunk was served from cache
    pub cache_hit: bool,
}

/// Result of a chunk request that did not fail.
#[derive(Debug, Clone)]
pub enum ChunkResult {
    Ready(ChunkResponse),
    /// The request was cancelled before a buffer was produced
    Cancelled,
}

// =============================================================================
// Chunk Service
// =============================================================================

/// Serves chunks of one manifest, caching populated buffers.
///
/// # Type Parameters
///
/// * `P` - Addressing parameters of the manifest's sources
/// * `F` - The fetcher used for every download
///
/// # Example
///
/// ```ignore
/// let manifest = load_manifest(&fetcher, "https://host/volume").await?;
/// let service = ChunkService::from_manifest(&volume, &SourceOptions::default(), fetcher);
///
/// let token = CancellationToken::new();
/// match service.get_chunk(0, 0, [1, 2, 0], &token).await? {
///     ChunkResult::Ready(response) => println!("{} bytes", response.data.len()),
///     ChunkResult::Cancelled => {}
/// }
/// ```
pub struct ChunkService<P: SourceParameters, F: ChunkFetcher> {
    sources: Vec<Vec<ChunkSource<P>>>,
    fetcher: Arc<F>,
    cache: ChunkCache,
}

impl<P: SourceParameters, F: ChunkFetcher> ChunkService<P, F> {
    /// Create a service with the default cache capacity.
    pub fn new(sources: Vec<Vec<ChunkSource<P>>>, fetcher: Arc<F>) -> Self {
        Self {
            sources,
            fetcher,
            cache: ChunkCache::new(),
        }
    }

    /// Create a service with a cache holding at most `cache_capacity` bytes.
    pub fn with_cache_capacity(
        sources: Vec<Vec<ChunkSource<P>>>,
        fetcher: Arc<F>,
        cache_capacity: usize,
    ) -> Self {
        Self {
            sources,
            fetcher,
            cache: ChunkCache::with_capacity(cache_capacity),
        }
    }

    /// Create a service over every source of a manifest.
    pub fn from_manifest<M>(manifest: &M, options: &SourceOptions, fetcher: Arc<F>) -> Self
    where
        M: MultiscaleSource<Parameters = P>,
    {
        Self::new(manifest.get_sources(options), fetcher)
    }

    /// Sources, one inner list per scale.
    pub fn sources(&self) -> &[Vec<ChunkSource<P>>] {
        &self.sources
    }

    /// Look up the source at `(scale, index)`.
    pub fn source(&self, scale: usize, index: usize) -> Result<&ChunkSource<P>, ValidationError> {
        self.sources
            .get(scale)
            .and_then(|per_scale| per_scale.get(index))
            .ok_or(ValidationError::UnknownSource { scale, index })
    }

    pub fn cache(&self) -> &ChunkCache {
        &self.cache
    }

    /// Get a chunk, using the cache when available.
    ///
    /// Grid positions are validated before the cache or the network is
    /// touched. Cached buffers are served even when `token` is already
    /// cancelled; misses run exactly one download.
    pub async fn get_chunk(
        &self,
        scale: usize,
        index: usize,
        grid_position: Vec3,
        token: &CancellationToken,
    ) -> Result<ChunkResult, ChunkError> {
        let source = self.source(scale, index)?;
        let chunk = source.create_chunk(grid_position)?;
        let data_size = chunk.data_size();

        let key = ChunkKey::new(
            source.parameters().key(),
            chunk.level(),
            source.level().chunk_extent(),
            grid_position,
        );
        if let Some(data) = self.cache.get(&key).await {
            debug!(source = %key.source, grid = ?grid_position, "chunk cache hit");
            return Ok(ChunkResult::Ready(ChunkResponse {
                data,
                data_size,
                cache_hit: true,
            }));
        }

        match source.download(chunk, self.fetcher.as_ref(), token).await {
            DownloadOutcome::Populated(chunk) => {
                let data = chunk.into_buffer().unwrap_or_default();
                self.cache.put(key, data.clone()).await;
                Ok(ChunkResult::Ready(ChunkResponse {
                    data,
                    data_size,
                    cache_hit: false,
                }))
            }
            DownloadOutcome::Failed { error, .. } => Err(error),
            DownloadOutcome::Cancelled(_) => Ok(ChunkResult::Cancelled),
        }
    }
}
