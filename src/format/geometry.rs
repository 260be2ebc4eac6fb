//! Pyramid level geometry.
//!
//! Everything here is a pure function of immutable [`Level`] data. Grid shapes
//! and chunk bounds are recomputed on demand rather than cached, and chunk
//! bounds are returned by value so no caller can observe state left behind by
//! another chunk's computation.

use crate::error::ValidationError;

/// Per-axis unsigned extent `(x, y, z)`.
pub type Vec3 = [u32; 3];

// =============================================================================
// Sample Types
// =============================================================================

/// Sample type of a voxel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float32,
}

impl DataType {
    /// Parse the manifest spelling (`"uint8"`, `"float32"`, ...).
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "uint8" => Some(DataType::Uint8),
            "uint16" => Some(DataType::Uint16),
            "uint32" => Some(DataType::Uint32),
            "uint64" => Some(DataType::Uint64),
            "float32" => Some(DataType::Float32),
            _ => None,
        }
    }

    /// Manifest spelling of this type.
    pub fn name(self) -> &'static str {
        match self {
            DataType::Uint8 => "uint8",
            DataType::Uint16 => "uint16",
            DataType::Uint32 => "uint32",
            DataType::Uint64 => "uint64",
            DataType::Float32 => "float32",
        }
    }

    /// Width of one sample in bytes.
    pub fn bytes_per_sample(self) -> usize {
        match self {
            DataType::Uint8 => 1,
            DataType::Uint16 => 2,
            DataType::Uint32 | DataType::Float32 => 4,
            DataType::Uint64 => 8,
        }
    }
}

// =============================================================================
// Encodings
// =============================================================================

/// Payload encoding of a level. Closed set; decoding matches on it exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Dense little-endian voxel buffer, already channel-planar
    Raw,
    /// Block-compressed label volume
    CompressedSegmentation { block_size: Vec3 },
    /// JPEG image with z slices stacked vertically
    Jpeg,
    /// One tile of a dyadic image pyramid, overlapping its neighbours
    TiledImage { overlap: u32 },
}

impl Encoding {
    /// Short name used in logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            Encoding::Raw => "raw",
            Encoding::CompressedSegmentation { .. } => "compressed_segmentation",
            Encoding::Jpeg => "jpeg",
            Encoding::TiledImage { .. } => "tiled_image",
        }
    }
}

// =============================================================================
// Level
// =============================================================================

/// One resolution stage of a multiscale pyramid.
///
/// Immutable once constructed; [`Level::new`] rejects zero extents.
#[derive(Debug, Clone, PartialEq)]
pub struct Level {
    index: usize,
    voxel_extent: Vec3,
    voxel_offset: [i64; 3],
    chunk_extent: Vec3,
    resolution: [f64; 3],
    data_type: DataType,
    num_channels: u32,
    encoding: Encoding,
}

/// Builder-style inputs for [`Level::new`].
#[derive(Debug, Clone, PartialEq)]
pub struct LevelSpec {
    pub index: usize,
    pub voxel_extent: Vec3,
    pub voxel_offset: [i64; 3],
    pub chunk_extent: Vec3,
    pub resolution: [f64; 3],
    pub data_type: DataType,
    pub num_channels: u32,
    pub encoding: Encoding,
}

impl Level {
    /// Validate and freeze a level.
    pub fn new(params: LevelSpec) -> Result<Self, ValidationError> {
        check_positive("voxel extent", params.voxel_extent)?;
        check_positive("chunk extent", params.chunk_extent)?;
        if let Encoding::CompressedSegmentation { block_size } = params.encoding {
            check_positive("compressed segmentation block size", block_size)?;
        }

        Ok(Self {
            index: params.index,
            voxel_extent: params.voxel_extent,
            voxel_offset: params.voxel_offset,
            chunk_extent: params.chunk_extent,
            resolution: params.resolution,
            data_type: params.data_type,
            num_channels: params.num_channels,
            encoding: params.encoding,
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn voxel_extent(&self) -> Vec3 {
        self.voxel_extent
    }

    pub fn voxel_offset(&self) -> [i64; 3] {
        self.voxel_offset
    }

    pub fn chunk_extent(&self) -> Vec3 {
        self.chunk_extent
    }

    /// Physical size of one voxel along each axis.
    ///
    /// For dyadic pyramids this is the scale factor relative to the finest level.
    pub fn resolution(&self) -> [f64; 3] {
        self.resolution
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn num_channels(&self) -> u32 {
        self.num_channels
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Number of chunks along each axis. Recomputed on every call.
    pub fn grid_shape(&self) -> Vec3 {
        grid_shape(self.voxel_extent, self.chunk_extent)
    }

    /// Byte length of a voxel buffer holding `data_size` voxels at this level.
    pub fn buffer_len(&self, data_size: Vec3) -> usize {
        buffer_len(data_size, self.num_channels, self.data_type)
    }
}

fn check_positive(what: &'static str, value: Vec3) -> Result<(), ValidationError> {
    if value.iter().any(|&v| v == 0) {
        return Err(ValidationError::NonPositiveExtent {
            what,
            value: value.map(i64::from),
        });
    }
    Ok(())
}

// =============================================================================
// Grid Math
// =============================================================================

/// `ceil(voxel_extent[i] / chunk_extent[i])` on each axis.
pub fn grid_shape(voxel_extent: Vec3, chunk_extent: Vec3) -> Vec3 {
    [
        voxel_extent[0].div_ceil(chunk_extent[0]),
        voxel_extent[1].div_ceil(chunk_extent[1]),
        voxel_extent[2].div_ceil(chunk_extent[2]),
    ]
}

/// Byte length of a channel-planar buffer.
pub fn buffer_len(data_size: Vec3, num_channels: u32, data_type: DataType) -> usize {
    data_size.iter().map(|&v| v as usize).product::<usize>()
        * num_channels as usize
        * data_type.bytes_per_sample()
}

/// Voxel-space box covered by one chunk: `[start, start + size)` per axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkBounds {
    /// First voxel, including the level's voxel offset
    pub start: [i64; 3],
    /// True size of the chunk, narrower than the chunk extent at the far edge
    pub size: Vec3,
}

impl ChunkBounds {
    /// Exclusive upper corner.
    pub fn end(&self) -> [i64; 3] {
        [
            self.start[0] + self.size[0] as i64,
            self.start[1] + self.size[1] as i64,
            self.start[2] + self.size[2] as i64,
        ]
    }
}

/// Compute the bounds of the chunk at `grid_position`.
///
/// Fails if the position lies outside the level's grid.
pub fn chunk_bounds(level: &Level, grid_position: Vec3) -> Result<ChunkBounds, ValidationError> {
    let grid_shape = level.grid_shape();
    if (0..3).any(|i| grid_position[i] >= grid_shape[i]) {
        return Err(ValidationError::GridOutOfBounds {
            position: grid_position,
            grid_shape,
        });
    }

    let mut start = [0i64; 3];
    let mut size = [0u32; 3];
    for i in 0..3 {
        let chunk = level.chunk_extent[i] as u64;
        let local_start = grid_position[i] as u64 * chunk;
        let remaining = level.voxel_extent[i] as u64 - local_start;
        start[i] = level.voxel_offset[i] + local_start as i64;
        size[i] = chunk.min(remaining) as u32;
    }

    Ok(ChunkBounds { start, size })
}

// =============================================================================
// Dyadic Pyramids
// =============================================================================

/// One halving step with ceil-on-odd semantics.
#[inline]
pub fn halve(v: u32) -> u32 {
    ((v as u64 + 1) >> 1) as u32
}

/// Number of halvings needed to bring `max(width, height)` down to 1.
///
/// Equals `ceil(log2(max(width, height)))`. A pyramid has one more level than
/// this count.
pub fn dyadic_level_count(width: u32, height: u32) -> u32 {
    let mut v = width.max(height);
    let mut count = 0;
    while v > 1 {
        v = halve(v);
        count += 1;
    }
    count
}
