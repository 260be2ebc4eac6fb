//! # Pyramid Chunks
//!
//! A chunk resolver and decoder for multiscale image pyramids served over
//! HTTP.
//!
//! Given a level and a grid position, this library answers one question:
//! what bytes does the chunk's voxel buffer contain? It resolves pyramid
//! levels from a manifest, computes the remote address of each chunk, fetches
//! it, and decodes the payload into a flat, channel-planar buffer.
//!
//! ## Features
//!
//! - **Two manifest shapes**: explicit-scale JSON volumes and Deep Zoom (DZI)
//!   dyadic pyramids
//! - **Four encodings**: raw, compressed segmentation, JPEG slabs and tiled
//!   JPEG/PNG images with overlap trimming
//! - **Cooperative cancellation**: a per-request token raced against the
//!   network fetch
//! - **Chunk caching**: size-bounded LRU of populated buffers
//!
//! ## Architecture
//!
//! - [`mod@format`] - Manifests and pyramid geometry
//! - [`chunk`] - Chunk sources, download orchestration, cache and service
//! - [`decode`] - Payload decoders, one per encoding
//! - [`io`] - Fetcher trait, HTTP fetcher and cancellation token
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use pyramid_chunks::{
//!     load_manifest, CancellationToken, ChunkService, HttpFetcher, Manifest, SourceOptions,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let fetcher = Arc::new(HttpFetcher::new(Duration::from_secs(30))?);
//!     let manifest = load_manifest(fetcher.as_ref(), "https://host/slide.dzi").await?;
//!
//!     if let Manifest::Dzi(pyramid) = manifest {
//!         let service = ChunkService::from_manifest(&pyramid, &SourceOptions::default(), fetcher);
//!         let _chunk = service
//!             .get_chunk(0, 0, [0, 0, 0], &CancellationToken::new())
//!             .await?;
//!     }
//!     Ok(())
//! }
//! ```

pub mod chunk;
pub mod config;
pub mod decode;
pub mod error;
pub mod format;
pub mod io;

// Re-export commonly used types
pub use chunk::{
    offset_range_address, tile_address, Chunk, ChunkCache, ChunkKey, ChunkResponse, ChunkResult,
    ChunkService, ChunkSource, ChunkState, DownloadOutcome, OffsetRangeParameters,
    SourceParameters, TileParameters, DEFAULT_CHUNK_CACHE_CAPACITY,
};
pub use config::{Cli, Command, FetchConfig, LevelsConfig, SourceConfig};
pub use decode::{
    decode_compressed_segmentation, decode_jpeg, decode_payload, decode_raw, decode_tile,
    encode_compressed_segmentation,
};
pub use error::{ChunkError, DecodeError, FetchError, ManifestError, ValidationError};
pub use format::{
    chunk_bounds, dyadic_level_count, grid_shape, load_manifest, ChunkBounds, DataType,
    DziDescriptor, DziPyramid, Encoding, Level, LevelSpec, Manifest, MultiscaleSource,
    PrecomputedVolume, ScaleInfo, SourceOptions, Vec3, VolumeType,
};
pub use io::{CancellationToken, ChunkFetcher, HttpFetcher, DEFAULT_FETCH_TIMEOUT_SECS};
