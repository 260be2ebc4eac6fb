//! Manifest discovery integration tests.
//!
//! Tests verify:
//! - DZI descriptors resolve into the full halving pyramid
//! - Explicit-scale manifests are fetched from `<url>/info`
//! - Invalid manifests fail with a manifest error before any chunk request

use pyramid_chunks::error::{FetchError, ManifestError, ValidationError};
use pyramid_chunks::format::{load_manifest, Encoding, Manifest, MultiscaleSource, SourceOptions};

use super::test_utils::{dzi_xml, volume_manifest, TrackingMockFetcher};

// =============================================================================
// DZI Pyramids
// =============================================================================

#[tokio::test]
async fn test_dzi_thousand_pixel_scenario() {
    let fetcher = TrackingMockFetcher::new()
        .with_resource("http://h/slide.dzi", dzi_xml(1000, 1000, 256, 1, "jpg"));

    let manifest = load_manifest(&fetcher, "http://h/slide.dzi").await.unwrap();
    let levels = manifest.describe();

    let extents: Vec<(u32, u32)> = levels
        .iter()
        .map(|l| (l.voxel_extent()[0], l.voxel_extent()[1]))
        .collect();
    assert_eq!(
        extents,
        vec![
            (1000, 1000),
            (500, 500),
            (250, 250),
            (125, 125),
            (63, 63),
            (32, 32),
            (16, 16),
            (8, 8),
            (4, 4),
            (2, 2),
            (1, 1),
        ]
    );
    assert_eq!(
        levels.iter().filter(|l| l.voxel_extent()[0] == 1000).count(),
        1
    );
    assert!(levels
        .iter()
        .all(|l| l.encoding() == Encoding::TiledImage { overlap: 1 }));
    assert_eq!(fetcher.get_requests().await, vec!["http://h/slide.dzi"]);
}

#[tokio::test]
async fn test_dzi_level_order_and_urls() {
    let fetcher = TrackingMockFetcher::new()
        .with_resource("http://h/a/b.dzi", dzi_xml(600, 300, 254, 1, "png"));

    let Manifest::Dzi(pyramid) = load_manifest(&fetcher, "http://h/a/b.dzi").await.unwrap()
    else {
        panic!("expected a DZI pyramid");
    };

    // Internal order is coarsest first, index equals DZI level
    assert_eq!(pyramid.levels()[0].voxel_extent(), [1, 1, 1]);
    assert_eq!(pyramid.levels()[pyramid.max_level()].voxel_extent(), [600, 300, 1]);
    for (i, level) in pyramid.levels().iter().enumerate() {
        assert_eq!(level.index(), i);
    }

    let sources = pyramid.get_sources(&SourceOptions::default());
    assert_eq!(sources.len(), pyramid.levels().len());
    assert_eq!(
        sources[0][0].parameters().level_url,
        format!("http://h/a/b_files/{}", pyramid.max_level())
    );
}

#[tokio::test]
async fn test_dzi_rejects_zero_tile_size() {
    let fetcher = TrackingMockFetcher::new()
        .with_resource("http://h/bad.dzi", dzi_xml(100, 100, 0, 0, "jpg"));

    let err = load_manifest(&fetcher, "http://h/bad.dzi").await.unwrap_err();
    assert_eq!(
        err,
        ManifestError::Validation(ValidationError::NonPositiveTileSize(0))
    );
}

#[tokio::test]
async fn test_dzi_rejects_unknown_format() {
    let fetcher = TrackingMockFetcher::new()
        .with_resource("http://h/bad.dzi", dzi_xml(100, 100, 256, 0, "tiff"));

    assert!(matches!(
        load_manifest(&fetcher, "http://h/bad.dzi").await,
        Err(ManifestError::InvalidField { field: "Format", .. })
    ));
}

// =============================================================================
// Explicit-Scale Volumes
// =============================================================================

#[tokio::test]
async fn test_volume_manifest_from_info() {
    let body = volume_manifest(
        "uint16",
        2,
        "raw",
        &[
            ("s0", [100, 80, 10], [32, 32, 8]),
            ("s1", [50, 40, 10], [32, 32, 8]),
        ],
    );
    let fetcher = TrackingMockFetcher::new().with_resource("http://h/vol/info", body);

    let manifest = load_manifest(&fetcher, "http://h/vol").await.unwrap();
    assert_eq!(manifest.kind(), "precomputed");
    assert_eq!(fetcher.get_requests().await, vec!["http://h/vol/info"]);

    let levels = manifest.describe();
    assert_eq!(levels.len(), 2);
    assert_eq!(levels[0].grid_shape(), [4, 3, 2]);
    assert_eq!(levels[1].grid_shape(), [2, 2, 2]);
    assert_eq!(levels[0].num_channels(), 2);
}

#[tokio::test]
async fn test_volume_manifest_redirect() {
    let fetcher = TrackingMockFetcher::new()
        .with_resource("http://h/vol/info", r#"{"redirect":"http://other/vol"}"#);

    assert_eq!(
        load_manifest(&fetcher, "http://h/vol").await.unwrap_err(),
        ManifestError::Redirect("http://other/vol".to_string())
    );
}

#[tokio::test]
async fn test_volume_manifest_missing_scales() {
    let fetcher = TrackingMockFetcher::new().with_resource(
        "http://h/vol/info",
        r#"{"data_type":"uint8","num_channels":1,"type":"image"}"#,
    );

    assert_eq!(
        load_manifest(&fetcher, "http://h/vol").await.unwrap_err(),
        ManifestError::MissingField("scales")
    );
}

#[tokio::test]
async fn test_volume_manifest_not_found() {
    let fetcher = TrackingMockFetcher::new();

    assert_eq!(
        load_manifest(&fetcher, "http://h/missing").await.unwrap_err(),
        ManifestError::Fetch(FetchError::Status {
            address: "http://h/missing/info".to_string(),
            status: 404,
        })
    );
}

#[tokio::test]
async fn test_segmentation_requires_label_type() {
    let body = volume_manifest(
        "uint8",
        1,
        "compressed_segmentation",
        &[("s0", [8, 8, 1], [4, 4, 1])],
    );
    let fetcher = TrackingMockFetcher::new().with_resource("http://h/seg/info", body);

    assert!(matches!(
        load_manifest(&fetcher, "http://h/seg").await,
        Err(ManifestError::InvalidField { field: "encoding", .. })
    ));
}
