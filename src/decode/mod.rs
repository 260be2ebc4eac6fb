//! Payload decoders.
//!
//! Each encoding turns a fetched payload into a channel-planar voxel buffer of
//! exactly `data_size.x * data_size.y * data_size.z * channels * bytes_per_sample`
//! bytes: all of channel 0, then all of channel 1, row-major within a plane.
//!
//! # Components
//!
//! - [`decode_raw`]: verbatim copy with a length check
//! - [`decode_compressed_segmentation`]: block-compressed label volumes
//! - [`decode_jpeg`]: JPEG chunks with z slices stacked vertically
//! - [`decode_tile`]: overlapping pyramid tiles, cropped and planarized
//!
//! [`decode_payload`] picks one by matching on the level's [`Encoding`].

mod compressed_segmentation;
mod jpeg;
mod raw;
mod tiled;

pub use compressed_segmentation::{decode_compressed_segmentation, encode_compressed_segmentation};
pub use jpeg::decode_jpeg;
pub use raw::decode_raw;
pub use tiled::decode_tile;

use crate::error::DecodeError;
use crate::format::{DataType, Encoding, Level, Vec3};

/// Channels written by the tiled-image decoder (alpha is dropped).
pub const PLANAR_RGB_CHANNELS: usize = 3;

/// Decode `payload` for the chunk at `grid_position` whose buffer holds
/// `data_size` voxels.
pub fn decode_payload(
    level: &Level,
    grid_position: Vec3,
    data_size: Vec3,
    payload: &[u8],
) -> Result<Vec<u8>, DecodeError> {
    let buffer = match level.encoding() {
        Encoding::Raw => decode_raw(payload, level.buffer_len(data_size))?,
        Encoding::CompressedSegmentation { block_size } => decode_compressed_segmentation(
            payload,
            data_size,
            level.num_channels(),
            block_size,
            level.data_type(),
        )?,
        Encoding::Jpeg => {
            require_uint8(level.data_type(), "jpeg")?;
            decode_jpeg(payload, data_size, level.num_channels())?
        }
        Encoding::TiledImage { overlap } => {
            require_uint8(level.data_type(), "tiled_image")?;
            if level.num_channels() as usize != PLANAR_RGB_CHANNELS {
                return Err(DecodeError::UnsupportedChannels(level.num_channels()));
            }
            decode_tile(payload, grid_position, data_size, overlap)?
        }
    };

    debug_assert_eq!(buffer.len(), level.buffer_len(data_size));
    Ok(buffer)
}

fn require_uint8(data_type: DataType, encoding: &'static str) -> Result<(), DecodeError> {
    if data_type != DataType::Uint8 {
        return Err(DecodeError::UnsupportedDataType {
            data_type: data_type.name(),
            encoding,
        });
    }
    Ok(())
}

/// Split interleaved samples into planes, keeping the first `keep` channels.
pub fn deinterleave(interleaved: &[u8], channels: usize, keep: usize) -> Vec<u8> {
    let pixels = interleaved.len() / channels;
    let mut out = vec![0u8; pixels * keep];
    for (i, pixel) in interleaved.chunks_exact(channels).enumerate() {
        for c in 0..keep {
            out[c * pixels + i] = pixel[c];
        }
    }
    out
}
