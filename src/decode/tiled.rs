//! Tiles of a dyadic image pyramid.
//!
//! Tiles overlap their neighbours by `overlap` pixels. A tile in column or row
//! 0 starts at the image edge; any other tile carries `overlap` extra leading
//! pixels on that axis, which are discarded before the tile is written into a
//! full `width x height` RGB plane set. Pixels past the end of the rendered
//! tile (right and bottom image edges) are zero-filled.

use super::PLANAR_RGB_CHANNELS;
use crate::error::DecodeError;
use crate::format::Vec3;

/// Decode a tile image into three `uint8` planes of `data_size[0] * data_size[1]`.
///
/// The alpha channel, if any, is dropped.
pub fn decode_tile(
    payload: &[u8],
    grid_position: Vec3,
    data_size: Vec3,
    overlap: u32,
) -> Result<Vec<u8>, DecodeError> {
    let img = image::load_from_memory(payload)
        .map_err(|e| DecodeError::CorruptImage(e.to_string()))?
        .to_rgba8();

    let (src_width, src_height) = img.dimensions();
    let crop_x = if grid_position[0] > 0 { overlap } else { 0 };
    let crop_y = if grid_position[1] > 0 { overlap } else { 0 };

    let tile_width = data_size[0] as usize;
    let tile_height = data_size[1] as usize;
    let plane = tile_width * tile_height;
    let mut out = vec![0u8; plane * PLANAR_RGB_CHANNELS];

    // Rendered content available after the leading crop
    let copy_width = (src_width.saturating_sub(crop_x) as usize).min(tile_width);
    let copy_height = (src_height.saturating_sub(crop_y) as usize).min(tile_height);

    let rgba = img.as_raw();
    for y in 0..copy_height {
        let src_row = (y + crop_y as usize) * src_width as usize;
        for x in 0..copy_width {
            let src = (src_row + x + crop_x as usize) * 4;
            let dst = y * tile_width + x;
            for c in 0..PLANAR_RGB_CHANNELS {
                out[c * plane + dst] = rgba[src + c];
            }
        }
    }

    Ok(out)
}
