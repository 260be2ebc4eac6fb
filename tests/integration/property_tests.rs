//! Property-based tests for pyramid geometry and addressing.

use proptest::prelude::*;
use std::sync::Arc;

use pyramid_chunks::chunk::{ChunkSource, OffsetRangeParameters};
use pyramid_chunks::decode::decode_raw;
use pyramid_chunks::format::{
    chunk_bounds, dyadic_level_count, grid_shape, halve, DataType, DziDescriptor, DziPyramid,
    Encoding, Level, LevelSpec,
};

fn ceil_log2(v: u32) -> u32 {
    if v <= 1 {
        0
    } else {
        32 - (v - 1).leading_zeros()
    }
}

fn raw_level(extent: [u32; 3], chunk: [u32; 3]) -> Level {
    Level::new(LevelSpec {
        index: 0,
        voxel_extent: extent,
        voxel_offset: [0, 0, 0],
        chunk_extent: chunk,
        resolution: [1.0, 1.0, 1.0],
        data_type: DataType::Uint8,
        num_channels: 1,
        encoding: Encoding::Raw,
    })
    .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_level_count_is_ceil_log2(w in 1u32..=1_000_000, h in 1u32..=1_000_000) {
        let count = dyadic_level_count(w, h);
        prop_assert_eq!(count, ceil_log2(w.max(h)));

        let mut v = w.max(h);
        for _ in 0..count {
            v = halve(v);
        }
        prop_assert_eq!(v, 1);
    }

    #[test]
    fn prop_pyramid_has_one_full_resolution_level(w in 1i64..=5000, h in 1i64..=5000) {
        let descriptor = DziDescriptor::new(w, h, 256, 1, "jpg").unwrap();
        let pyramid = DziPyramid::new(descriptor, "http://h/p.dzi").unwrap();
        let levels = pyramid.levels();

        let finest = levels[pyramid.max_level()].voxel_extent();
        prop_assert_eq!(finest, [w as u32, h as u32, 1]);
        prop_assert_eq!(levels[0].voxel_extent(), [1, 1, 1]);
        for pair in levels.windows(2) {
            let (coarse, fine) = (pair[0].voxel_extent(), pair[1].voxel_extent());
            prop_assert_eq!(coarse[0], halve(fine[0]));
            prop_assert_eq!(coarse[1], halve(fine[1]));
        }
    }

    #[test]
    fn prop_grid_covers_extent(
        extent in prop::array::uniform3(1u32..=10_000),
        chunk in prop::array::uniform3(1u32..=512),
    ) {
        let shape = grid_shape(extent, chunk);
        for i in 0..3 {
            let covered = shape[i] as u64 * chunk[i] as u64;
            prop_assert!(covered >= extent[i] as u64);
            prop_assert!(covered < extent[i] as u64 + chunk[i] as u64);
        }
        prop_assert_eq!(shape, raw_level(extent, chunk).grid_shape());
    }

    #[test]
    fn prop_offset_range_address_is_clipped(
        extent in prop::array::uniform3(1u32..=2_000),
        chunk in prop::array::uniform3(1u32..=300),
        pick in prop::array::uniform3(0.0f64..1.0),
    ) {
        let level = raw_level(extent, chunk);
        let shape = level.grid_shape();
        let grid = [
            (pick[0] * shape[0] as f64) as u32,
            (pick[1] * shape[1] as f64) as u32,
            (pick[2] * shape[2] as f64) as u32,
        ];

        let bounds = chunk_bounds(&level, grid).unwrap();
        let source = ChunkSource::new(
            Arc::new(level),
            OffsetRangeParameters { url: "b".to_string() },
        );
        let chunk_record = source.create_chunk(grid).unwrap();
        let address = source.chunk_address(&chunk_record);

        let mut expected = Vec::new();
        for i in 0..3 {
            let lo = grid[i] as i64 * chunk[i] as i64;
            let hi = (lo + chunk[i] as i64).min(extent[i] as i64);
            prop_assert_eq!(bounds.start[i], lo);
            prop_assert_eq!(bounds.end()[i], hi);
            expected.push(format!("{}-{}", lo, hi));
        }
        prop_assert_eq!(address, format!("b/{}", expected.join("_")));
        prop_assert_eq!(chunk_record.data_size(), bounds.size);
    }

    #[test]
    fn prop_raw_decode_is_identity(payload in prop::collection::vec(any::<u8>(), 0..512)) {
        let decoded = decode_raw(&payload, payload.len()).unwrap();
        prop_assert_eq!(decoded, payload.clone());
        prop_assert!(decode_raw(&payload, payload.len() + 1).is_err());
    }
}
