//! Test utilities for integration tests.
//!
//! This module provides a mock fetcher serving pre-configured resources and
//! helpers for building manifests and image payloads.

use async_trait::async_trait;
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, Rgb, RgbImage, Rgba, RgbaImage};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use pyramid_chunks::error::FetchError;
use pyramid_chunks::io::{CancellationToken, ChunkFetcher};

// =============================================================================
// Mock Fetcher with Request Tracking
// =============================================================================

/// A mock fetcher that serves resources from a map and tracks every request.
///
/// Unknown addresses answer with HTTP 404.
pub struct TrackingMockFetcher {
    resources: HashMap<String, Bytes>,
    delay: Option<Duration>,
    request_count: Arc<AtomicUsize>,
    completed_count: Arc<AtomicUsize>,
    requests: Arc<RwLock<Vec<String>>>,
}

impl TrackingMockFetcher {
    pub fn new() -> Self {
        Self {
            resources: HashMap::new(),
            delay: None,
            request_count: Arc::new(AtomicUsize::new(0)),
            completed_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn with_resource(mut self, address: impl Into<String>, data: impl Into<Bytes>) -> Self {
        self.resources.insert(address.into(), data.into());
        self
    }

    /// Delay every response, leaving room to cancel mid-fetch.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of fetches started.
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Number of fetches that ran to completion.
    pub fn completed_count(&self) -> usize {
        self.completed_count.load(Ordering::SeqCst)
    }

    pub async fn get_requests(&self) -> Vec<String> {
        self.requests.read().await.clone()
    }
}

#[async_trait]
impl ChunkFetcher for TrackingMockFetcher {
    async fn fetch(&self, address: &str) -> Result<Bytes, FetchError> {
        self.request_count.fetch_add(1, Ordering::SeqCst);
        self.requests.write().await.push(address.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.completed_count.fetch_add(1, Ordering::SeqCst);

        self.resources
            .get(address)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                address: address.to_string(),
                status: 404,
            })
    }

    fn identifier(&self) -> &str {
        "tracking-mock"
    }
}

// =============================================================================
// Cancelling Fetcher
// =============================================================================

/// A fetcher that cancels the request's token while completing the fetch.
///
/// Models cancellation that lands after the transfer finished but before
/// decoding starts.
pub struct CancelOnCompleteFetcher {
    pub payload: Bytes,
    pub token: CancellationToken,
}

#[async_trait]
impl ChunkFetcher for CancelOnCompleteFetcher {
    async fn fetch(&self, _address: &str) -> Result<Bytes, FetchError> {
        self.token.cancel();
        Ok(self.payload.clone())
    }

    fn identifier(&self) -> &str {
        "cancel-on-complete"
    }
}

// =============================================================================
// Manifests
// =============================================================================

/// DZI descriptor XML.
pub fn dzi_xml(width: u32, height: u32, tile_size: u32, overlap: u32, format: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Image xmlns="http://schemas.microsoft.com/deepzoom/2008"
       TileSize="{tile_size}"
       Overlap="{overlap}"
       Format="{format}">
  <Size Width="{width}" Height="{height}" />
</Image>"#
    )
}

/// Explicit-scale manifest with one scale per `(key, size, chunk size)`.
pub fn volume_manifest(
    data_type: &str,
    num_channels: u32,
    encoding: &str,
    scales: &[(&str, [u32; 3], [u32; 3])],
) -> String {
    let scales: Vec<serde_json::Value> = scales
        .iter()
        .map(|(key, size, chunk)| {
            let mut scale = serde_json::json!({
                "key": key,
                "resolution": [1, 1, 1],
                "voxel_offset": [0, 0, 0],
                "size": size,
                "chunk_sizes": [chunk],
                "encoding": encoding,
            });
            if encoding == "compressed_segmentation" {
                scale["compressed_segmentation_block_size"] = serde_json::json!([2, 2, 1]);
            }
            scale
        })
        .collect();

    let volume_type = if encoding == "compressed_segmentation" {
        "segmentation"
    } else {
        "image"
    };
    serde_json::json!({
        "@type": "neuroglancer_multiscale_volume",
        "data_type": data_type,
        "num_channels": num_channels,
        "type": volume_type,
        "scales": scales,
    })
    .to_string()
}

// =============================================================================
// Image Payloads
// =============================================================================

/// JPEG of a solid RGB colour.
pub fn solid_rgb_jpeg(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |_, _| Rgb(color));
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, 100)
        .encode_image(&img)
        .unwrap();
    buf
}

/// PNG whose red channel holds `x + x_base`, green holds `y + y_base`.
pub fn coordinate_png(width: u32, height: u32, x_base: u32, y_base: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x + x_base) as u8, (y + y_base) as u8, 200, 255])
    });
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgba8)
        .unwrap();
    buf
}

/// Whether every byte of `values` is within `tolerance` of `expected`.
pub fn all_near(values: &[u8], expected: u8, tolerance: u8) -> bool {
    values.iter().all(|&v| v.abs_diff(expected) <= tolerance)
}
