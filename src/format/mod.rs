//! Manifest formats and pyramid geometry.
//!
//! Two manifest shapes are supported:
//!
//! - **Explicit-scale volumes** ([`precomputed`]): a JSON `info` file listing
//!   every scale with its own size, chunk sizes and encoding
//! - **Dyadic pyramids** ([`dzi`]): a Deep Zoom descriptor from which every
//!   level is synthesized by repeated halving
//!
//! Use [`load_manifest`] to fetch and resolve either one from a URL.

pub mod dzi;
pub mod geometry;
pub mod manifest;
pub mod precomputed;

pub use dzi::{is_dzi_url, tile_root, DziDescriptor, DziPyramid};
pub use geometry::{
    buffer_len, chunk_bounds, dyadic_level_count, grid_shape, halve, ChunkBounds, DataType,
    Encoding, Level, LevelSpec, Vec3,
};
pub use manifest::{info_url, load_manifest, Manifest, MultiscaleSource, SourceOptions};
pub use precomputed::{resolve_path, PrecomputedVolume, ScaleInfo, VolumeType};
