//! Compressed segmentation label volumes.
//!
//! # Layout
//!
//! The payload is a sequence of little-endian `u32` words:
//!
//! ```text
//! [channel offsets: one word per channel]
//! per channel, starting at its offset:
//!   [block headers: 2 words per block, block index = bx + gx * (by + gy * bz)]
//!   [encoded values and lookup tables, in any order]
//! ```
//!
//! Header word 0 holds the lookup table offset in its low 24 bits and the
//! encoded bit width in its high 8 bits; word 1 holds the encoded values
//! offset. Both are relative to the channel start. Each voxel's index within its
//! block is `(z * by + y) * bx + x` over the full block size, packed LSB-first.
//! Lookup entries are one word for `uint32` labels and two words (low first) for
//! `uint64` labels.

use crate::error::DecodeError;
use crate::format::{DataType, Vec3};

const VALID_BITS: [u32; 7] = [0, 1, 2, 4, 8, 16, 32];

fn words_per_element(data_type: DataType) -> Result<usize, DecodeError> {
    match data_type {
        DataType::Uint32 => Ok(1),
        DataType::Uint64 => Ok(2),
        other => Err(DecodeError::UnsupportedDataType {
            data_type: other.name(),
            encoding: "compressed_segmentation",
        }),
    }
}

fn malformed(message: impl Into<String>) -> DecodeError {
    DecodeError::MalformedSegmentation(message.into())
}

fn word_at(words: &[u32], index: usize) -> Result<u32, DecodeError> {
    words
        .get(index)
        .copied()
        .ok_or_else(|| malformed(format!("word {} out of range ({} words)", index, words.len())))
}

fn volume(data_size: Vec3) -> usize {
    data_size.iter().map(|&v| v as usize).product()
}

fn block_grid(data_size: Vec3, block_size: Vec3) -> Vec3 {
    [
        data_size[0].div_ceil(block_size[0]),
        data_size[1].div_ceil(block_size[1]),
        data_size[2].div_ceil(block_size[2]),
    ]
}

/// Decode a compressed segmentation payload into a channel-planar label buffer.
pub fn decode_compressed_segmentation(
    payload: &[u8],
    data_size: Vec3,
    num_channels: u32,
    block_size: Vec3,
    data_type: DataType,
) -> Result<Vec<u8>, DecodeError> {
    let wpe = words_per_element(data_type)?;
    if block_size.iter().any(|&b| b == 0) {
        return Err(malformed("block size must be positive"));
    }
    if payload.len() % 4 != 0 {
        return Err(malformed(format!(
            "payload length {} is not a multiple of 4",
            payload.len()
        )));
    }

    let words: Vec<u32> = payload
        .chunks_exact(4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();

    let voxels = volume(data_size);
    let mut output = vec![0u32; voxels * num_channels as usize * wpe];

    for channel in 0..num_channels as usize {
        let base = word_at(&words, channel)? as usize;
        let out = &mut output[channel * voxels * wpe..(channel + 1) * voxels * wpe];
        decode_channel(out, &words, base, data_size, block_size, wpe)?;
    }

    Ok(output.iter().flat_map(|w| w.to_le_bytes()).collect())
}

fn decode_channel(
    out: &mut [u32],
    words: &[u32],
    base: usize,
    data_size: Vec3,
    block_size: Vec3,
    wpe: usize,
) -> Result<(), DecodeError> {
    let grid = block_grid(data_size, block_size);
    let [bs0, bs1, bs2] = block_size.map(|v| v as usize);
    let [ds0, ds1, ds2] = data_size.map(|v| v as usize);

    for bz in 0..grid[2] as usize {
        for by in 0..grid[1] as usize {
            for bx in 0..grid[0] as usize {
                let block_index = bx + grid[0] as usize * (by + grid[1] as usize * bz);
                let header = base + block_index * 2;
                let h0 = word_at(words, header)?;
                let h1 = word_at(words, header + 1)?;

                let lookup_base = base + (h0 & 0x00FF_FFFF) as usize;
                let bits = h0 >> 24;
                let encoded_base = base + h1 as usize;
                if !VALID_BITS.contains(&bits) {
                    return Err(malformed(format!(
                        "block {} has unsupported bit width {}",
                        block_index, bits
                    )));
                }
                let mask: u32 = if bits == 32 { u32::MAX } else { (1u32 << bits) - 1 };

                let x_end = bs0.min(ds0 - bx * bs0);
                let y_end = bs1.min(ds1 - by * bs1);
                let z_end = bs2.min(ds2 - bz * bs2);

                for z in 0..z_end {
                    for y in 0..y_end {
                        for x in 0..x_end {
                            let within = (z * bs1 + y) * bs0 + x;
                            let index = if bits == 0 {
                                0
                            } else {
                                let bit_offset = within * bits as usize;
                                let word = word_at(words, encoded_base + bit_offset / 32)?;
                                ((word >> (bit_offset % 32)) & mask) as usize
                            };

                            let entry = lookup_base + index * wpe;
                            if entry + wpe > words.len() {
                                return Err(malformed(format!(
                                    "lookup entry {} of block {} out of range",
                                    index, block_index
                                )));
                            }

                            let ox = bx * bs0 + x;
                            let oy = by * bs1 + y;
                            let oz = bz * bs2 + z;
                            let out_index = ((oz * ds1 + oy) * ds0 + ox) * wpe;
                            out[out_index..out_index + wpe]
                                .copy_from_slice(&words[entry..entry + wpe]);
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

// =============================================================================
// Encoding
// =============================================================================

/// Encode a channel-planar label volume.
///
/// `input` holds `num_channels * volume * words_per_element` words in the same
/// layout [`decode_compressed_segmentation`] produces. The crate itself only
/// decodes; this builds payloads for tests and fixtures.
pub fn encode_compressed_segmentation(
    input: &[u32],
    data_size: Vec3,
    num_channels: u32,
    block_size: Vec3,
    data_type: DataType,
) -> Result<Vec<u8>, DecodeError> {
    let wpe = words_per_element(data_type)?;
    let voxels = volume(data_size);
    let expected = voxels * num_channels as usize * wpe;
    if input.len() != expected {
        return Err(DecodeError::LengthMismatch {
            expected: expected * 4,
            actual: input.len() * 4,
        });
    }
    if block_size.iter().any(|&b| b == 0) {
        return Err(malformed("block size must be positive"));
    }

    let mut words = vec![0u32; num_channels as usize];
    for channel in 0..num_channels as usize {
        let base = words.len();
        words[channel] = base as u32;
        let channel_input = &input[channel * voxels * wpe..(channel + 1) * voxels * wpe];
        encode_channel(&mut words, base, channel_input, data_size, block_size, wpe);
    }

    Ok(words.iter().flat_map(|w| w.to_le_bytes()).collect())
}

fn encode_channel(
    words: &mut Vec<u32>,
    base: usize,
    input: &[u32],
    data_size: Vec3,
    block_size: Vec3,
    wpe: usize,
) {
    let grid = block_grid(data_size, block_size);
    let [bs0, bs1, bs2] = block_size.map(|v| v as usize);
    let [ds0, ds1, _] = data_size.map(|v| v as usize);
    let num_blocks = grid.iter().map(|&g| g as usize).product::<usize>();
    words.resize(base + num_blocks * 2, 0);

    let value_at = |index: usize| -> u64 {
        let low = input[index * wpe] as u64;
        if wpe == 2 {
            low | (input[index * wpe + 1] as u64) << 32
        } else {
            low
        }
    };

    for bz in 0..grid[2] as usize {
        for by in 0..grid[1] as usize {
            for bx in 0..grid[0] as usize {
                let block_index = bx + grid[0] as usize * (by + grid[1] as usize * bz);
                let x_end = bs0.min(ds0 - bx * bs0);
                let y_end = bs1.min(ds1 - by * bs1);
                let z_end = bs2.min(data_size[2] as usize - bz * bs2);

                let mut voxels = Vec::with_capacity(x_end * y_end * z_end);
                for z in 0..z_end {
                    for y in 0..y_end {
                        for x in 0..x_end {
                            let within = (z * bs1 + y) * bs0 + x;
                            let source = ((bz * bs2 + z) * ds1 + by * bs1 + y) * ds0 + bx * bs0 + x;
                            voxels.push((within, value_at(source)));
                        }
                    }
                }

                let mut table: Vec<u64> = voxels.iter().map(|&(_, v)| v).collect();
                table.sort_unstable();
                table.dedup();

                let bits = VALID_BITS
                    .iter()
                    .copied()
                    .find(|&b| b == 32 || (1usize << b) >= table.len())
                    .unwrap_or(32);

                let encoded_offset = words.len() - base;
                let encoded_words = (bs0 * bs1 * bs2 * bits as usize).div_ceil(32);
                let encoded_start = words.len();
                words.resize(encoded_start + encoded_words, 0);
                if bits > 0 {
                    for &(within, value) in &voxels {
                        let index = table.binary_search(&value).unwrap_or(0) as u32;
                        let bit_offset = within * bits as usize;
                        words[encoded_start + bit_offset / 32] |= index << (bit_offset % 32);
                    }
                }

                let lookup_offset = words.len() - base;
                for value in &table {
                    words.push(*value as u32);
                    if wpe == 2 {
                        words.push((*value >> 32) as u32);
                    }
                }

                words[base + block_index * 2] = lookup_offset as u32 | (bits << 24);
                words[base + block_index * 2 + 1] = encoded_offset as u32;
            }
        }
    }
}
