//! JPEG-encoded volume chunks.
//!
//! A chunk of `x * y * z` voxels is stored as one JPEG image `x` pixels wide
//! and `y * z` pixels tall (z slices stacked vertically), with one component
//! per channel.

use std::io::Cursor;

use image::{ImageFormat, ImageReader};

use super::deinterleave;
use crate::error::DecodeError;
use crate::format::Vec3;

/// Decode a JPEG chunk into a channel-planar `uint8` buffer.
pub fn decode_jpeg(
    payload: &[u8],
    data_size: Vec3,
    num_channels: u32,
) -> Result<Vec<u8>, DecodeError> {
    if num_channels != 1 && num_channels != 3 {
        return Err(DecodeError::UnsupportedChannels(num_channels));
    }

    let reader = ImageReader::with_format(Cursor::new(payload), ImageFormat::Jpeg);
    let img = reader.decode().map_err(|e| DecodeError::CorruptImage(e.to_string()))?;

    let expected_width = data_size[0];
    let expected_height = u64::from(data_size[1]) * u64::from(data_size[2]);
    if img.width() != expected_width || u64::from(img.height()) != expected_height {
        return Err(DecodeError::ImageSizeMismatch {
            expected_width,
            expected_height,
            actual_width: img.width(),
            actual_height: img.height(),
        });
    }

    if num_channels == 1 {
        return Ok(img.to_luma8().into_raw());
    }

    let rgb = img.to_rgb8();
    Ok(deinterleave(rgb.as_raw(), 3, 3))
}
