//! Chunk requests: addressing, download orchestration and caching.
//!
//! A request flows through:
//!
//! ```text
//! ChunkService::get_chunk
//!     -> ChunkSource::create_chunk   (grid validation, bounds)
//!     -> ChunkCache::get             (hit: done)
//!     -> ChunkSource::download       (address, fetch, decode)
//!     -> ChunkCache::put             (on Populated)
//! ```

mod cache;
mod service;
mod source;
mod state;

pub use cache::{ChunkCache, ChunkKey, DEFAULT_CHUNK_CACHE_CAPACITY};
pub use service::{ChunkResponse, ChunkResult, ChunkService};
pub use source::{
    offset_range_address, tile_address, ChunkSource, OffsetRangeParameters, SourceParameters,
    TileParameters,
};
pub use state::{Chunk, ChunkState, DownloadOutcome};
