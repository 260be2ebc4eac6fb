//! Chunk sources: one level plus the parameters that address its resources.
//!
//! # Addressing
//!
//! - Offset-range (explicit-scale volumes):
//!   `<base>/<x0>-<x1>_<y0>-<y1>_<z0>-<z1>`, half-open voxel ranges
//! - Tile-index (dyadic pyramids): `<level base>/<column>_<row>.<format>`
//!
//! # Download
//!
//! [`ChunkSource::download`] drives one chunk through
//! `AddressComputed -> Fetching -> Decoding -> Populated`. The address is
//! derived once from the bounds captured when the chunk was created, and the
//! fetch is issued exactly once.
//!
//! Cancellation policy: while the fetch is pending, cancellation drops the
//! fetch future (aborting the transfer). If cancellation is observed after the
//! fetch completed but before decoding, the payload is discarded. Either way
//! no decoder runs and the chunk buffer stays unwritten.

use std::fmt::Debug;
use std::sync::Arc;

use tracing::{debug, warn};

use super::state::{Chunk, ChunkState, DownloadOutcome};
use crate::decode::decode_payload;
use crate::error::{ChunkError, ValidationError};
use crate::format::{chunk_bounds, ChunkBounds, Encoding, Level, Vec3};
use crate::io::{CancellationToken, ChunkFetcher};

// =============================================================================
// Parameters
// =============================================================================

/// Per-format addressing parameters of a [`ChunkSource`].
pub trait SourceParameters: Clone + Debug + Send + Sync {
    /// Remote address of the resource holding the chunk.
    ///
    /// `bounds` are the chunk's own bounds, computed before this call.
    fn address(&self, grid_position: Vec3, bounds: &ChunkBounds) -> String;

    /// Stable identifier of the source, used in cache keys and logs.
    fn key(&self) -> &str;
}

/// Offset-range addressing under a base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetRangeParameters {
    pub url: String,
}

impl SourceParameters for OffsetRangeParameters {
    fn address(&self, _grid_position: Vec3, bounds: &ChunkBounds) -> String {
        offset_range_address(&self.url, bounds)
    }

    fn key(&self) -> &str {
        &self.url
    }
}

/// Tile-index addressing under one pyramid level's URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileParameters {
    pub level_url: String,
    pub format: String,
}

impl SourceParameters for TileParameters {
    fn address(&self, grid_position: Vec3, _bounds: &ChunkBounds) -> String {
        tile_address(&self.level_url, grid_position[0], grid_position[1], &self.format)
    }

    fn key(&self) -> &str {
        &self.level_url
    }
}

/// `<base>/<x0>-<x1>_<y0>-<y1>_<z0>-<z1>`
pub fn offset_range_address(base: &str, bounds: &ChunkBounds) -> String {
    let start = bounds.start;
    let end = bounds.end();
    format!(
        "{}/{}-{}_{}-{}_{}-{}",
        base, start[0], end[0], start[1], end[1], start[2], end[2]
    )
}

/// `<level_base>/<column>_<row>.<format>`
pub fn tile_address(level_base: &str, column: u32, row: u32, format: &str) -> String {
    format!("{}/{}_{}.{}", level_base, column, row, format)
}

// =============================================================================
// Chunk Source
// =============================================================================

/// A level of a multiscale volume, addressed by `P`.
///
/// Cheap to clone; the level is shared read-only between all chunks and
/// concurrent downloads.
#[derive(Debug, Clone)]
pub struct ChunkSource<P> {
    level: Arc<Level>,
    parameters: P,
}

impl<P: SourceParameters> ChunkSource<P> {
    pub fn new(level: Arc<Level>, parameters: P) -> Self {
        Self { level, parameters }
    }

    pub fn level(&self) -> &Level {
        &self.level
    }

    pub fn parameters(&self) -> &P {
        &self.parameters
    }

    pub fn grid_shape(&self) -> Vec3 {
        self.level.grid_shape()
    }

    /// Create an empty chunk for `grid_position`.
    ///
    /// Bounds are computed here, once. Tiled levels always use the full tile
    /// as data size so edge tiles keep the same buffer layout; other encodings
    /// use the clipped bounds.
    pub fn create_chunk(&self, grid_position: Vec3) -> Result<Chunk, ValidationError> {
        let bounds = chunk_bounds(&self.level, grid_position)?;
        let data_size = match self.level.encoding() {
            Encoding::TiledImage { .. } => self.level.chunk_extent(),
            Encoding::Raw | Encoding::CompressedSegmentation { .. } | Encoding::Jpeg => {
                bounds.size
            }
        };
        Ok(Chunk::new(grid_position, self.level.index(), bounds, data_size))
    }

    /// Remote address for a chunk of this source.
    pub fn chunk_address(&self, chunk: &Chunk) -> String {
        self.parameters.address(chunk.grid_position(), &chunk.bounds())
    }

    /// Fetch and decode one chunk.
    ///
    /// Never returns early with an error: every path ends in a
    /// [`DownloadOutcome`] carrying the chunk in its terminal state.
    pub async fn download<F>(
        &self,
        mut chunk: Chunk,
        fetcher: &F,
        token: &CancellationToken,
    ) -> DownloadOutcome
    where
        F: ChunkFetcher + ?Sized,
    {
        let address = self.chunk_address(&chunk);
        chunk.set_address(address.clone());
        debug!(
            source = self.parameters.key(),
            grid = ?chunk.grid_position(),
            address = %address,
            "chunk address computed"
        );

        if token.is_cancelled() {
            return cancelled(chunk, "before fetch");
        }

        chunk.set_state(ChunkState::Fetching);
        let payload = tokio::select! {
            biased;
            _ = token.cancelled() => return cancelled(chunk, "during fetch"),
            result = fetcher.fetch(&address) => result,
        };

        let payload = match payload {
            Ok(payload) => payload,
            Err(e) => {
                warn!(address = %address, error = %e, "chunk fetch failed");
                return failed(chunk, e.into());
            }
        };

        if token.is_cancelled() {
            return cancelled(chunk, "after fetch");
        }

        chunk.set_state(ChunkState::Decoding);
        match decode_payload(
            &self.level,
            chunk.grid_position(),
            chunk.data_size(),
            &payload,
        ) {
            Ok(buffer) => {
                chunk.populate(buffer);
                debug!(address = %address, "chunk populated");
                DownloadOutcome::Populated(chunk)
            }
            Err(e) => {
                warn!(
                    address = %address,
                    encoding = self.level.encoding().name(),
                    error = %e,
                    "chunk decode failed"
                );
                failed(chunk, e.into())
            }
        }
    }
}

fn cancelled(mut chunk: Chunk, stage: &'static str) -> DownloadOutcome {
    debug!(grid = ?chunk.grid_position(), stage, "chunk cancelled");
    chunk.set_state(ChunkState::Cancelled);
    DownloadOutcome::Cancelled(chunk)
}

fn failed(mut chunk: Chunk, error: ChunkError) -> DownloadOutcome {
    chunk.set_state(ChunkState::Failed);
    DownloadOutcome::Failed { chunk, error }
}
