//! Explicit-scale volume manifests.
//!
//! The manifest is a JSON object listing every scale with its own geometry and
//! encoding:
//!
//! ```json
//! {
//!   "@type": "neuroglancer_multiscale_volume",
//!   "data_type": "uint32",
//!   "num_channels": 1,
//!   "type": "segmentation",
//!   "scales": [{
//!     "key": "8_8_8",
//!     "resolution": [8, 8, 8],
//!     "voxel_offset": [0, 0, 0],
//!     "size": [1024, 1024, 512],
//!     "chunk_sizes": [[64, 64, 64]],
//!     "encoding": "compressed_segmentation",
//!     "compressed_segmentation_block_size": [8, 8, 8]
//!   }]
//! }
//! ```
//!
//! Scale order is preserved as given; nothing here infers which scale is
//! finest.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use super::geometry::{DataType, Encoding, Level, LevelSpec, Vec3};
use super::manifest::{MultiscaleSource, SourceOptions};
use crate::chunk::{ChunkSource, OffsetRangeParameters};
use crate::error::{ManifestError, ValidationError};

/// Expected value of the optional `@type` field.
pub const MULTISCALE_VOLUME_TYPE: &str = "neuroglancer_multiscale_volume";

/// Whether voxel values are intensities or labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeType {
    Image,
    Segmentation,
}

// =============================================================================
// Raw JSON shape
// =============================================================================

#[derive(Debug, Deserialize)]
struct RawManifest {
    redirect: Option<String>,
    #[serde(rename = "@type")]
    kind: Option<String>,
    data_type: Option<String>,
    num_channels: Option<i64>,
    #[serde(rename = "type")]
    volume_type: Option<String>,
    scales: Option<Vec<RawScale>>,
}

#[derive(Debug, Deserialize)]
struct RawScale {
    key: Option<String>,
    resolution: Option<Vec<f64>>,
    voxel_offset: Option<Vec<i64>>,
    size: Option<Vec<i64>>,
    chunk_sizes: Option<Vec<Vec<i64>>>,
    encoding: Option<String>,
    compressed_segmentation_block_size: Option<Vec<i64>>,
}

// =============================================================================
// Scale
// =============================================================================

/// One validated scale of the manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaleInfo {
    pub key: String,
    pub url: String,
    pub encoding: Encoding,
    pub resolution: [f64; 3],
    pub voxel_offset: [i64; 3],
    pub size: Vec3,
    pub chunk_sizes: Vec<Vec3>,
}

fn fixed3<T: Copy>(field: &'static str, values: &[T]) -> Result<[T; 3], ManifestError> {
    match values {
        [a, b, c] => Ok([*a, *b, *c]),
        _ => Err(ManifestError::InvalidField {
            field,
            message: format!("expected 3 components, got {}", values.len()),
        }),
    }
}

fn positive3(field: &'static str, values: &[i64]) -> Result<Vec3, ManifestError> {
    let v = fixed3(field, values)?;
    if v.iter().any(|&x| x <= 0 || x > u32::MAX as i64) {
        return Err(ValidationError::NonPositiveExtent {
            what: field,
            value: v,
        }
        .into());
    }
    Ok(v.map(|x| x as u32))
}

impl ScaleInfo {
    fn from_raw(raw: RawScale, base_url: &str) -> Result<Self, ManifestError> {
        let resolution = fixed3(
            "resolution",
            &raw.resolution.ok_or(ManifestError::MissingField("resolution"))?,
        )?;
        if resolution.iter().any(|r| !r.is_finite() || *r <= 0.0) {
            return Err(ManifestError::InvalidField {
                field: "resolution",
                message: format!("components must be finite and positive, got {:?}", resolution),
            });
        }

        let voxel_offset = match raw.voxel_offset {
            Some(offset) => fixed3("voxel_offset", &offset)?,
            None => [0, 0, 0],
        };

        let size = positive3("size", &raw.size.ok_or(ManifestError::MissingField("size"))?)?;

        let chunk_sizes = raw
            .chunk_sizes
            .ok_or(ManifestError::MissingField("chunk_sizes"))?
            .iter()
            .map(|c| positive3("chunk_sizes", c))
            .collect::<Result<Vec<_>, _>>()?;
        if chunk_sizes.is_empty() {
            return Err(ManifestError::InvalidField {
                field: "chunk_sizes",
                message: "no chunk sizes specified".to_string(),
            });
        }

        let encoding = match raw
            .encoding
            .as_deref()
            .ok_or(ManifestError::MissingField("encoding"))?
        {
            "raw" => Encoding::Raw,
            "jpeg" => Encoding::Jpeg,
            "compressed_segmentation" => {
                let block_size = raw
                    .compressed_segmentation_block_size
                    .ok_or(ManifestError::MissingField(
                        "compressed_segmentation_block_size",
                    ))?;
                Encoding::CompressedSegmentation {
                    block_size: positive3("compressed_segmentation_block_size", &block_size)?,
                }
            }
            other => {
                return Err(ManifestError::InvalidField {
                    field: "encoding",
                    message: format!("unknown encoding {:?}", other),
                })
            }
        };

        let key = raw.key.ok_or(ManifestError::MissingField("key"))?;
        let url = resolve_path(base_url, &key);

        Ok(Self {
            key,
            url,
            encoding,
            resolution,
            voxel_offset,
            size,
            chunk_sizes,
        })
    }
}

/// Join `relative` onto `base`, treating each `..` part as "drop one part".
pub fn resolve_path(base: &str, relative: &str) -> String {
    let mut parts: Vec<&str> = base.split('/').collect();
    for part in relative.split('/') {
        if part == ".." && !parts.is_empty() {
            parts.pop();
            continue;
        }
        parts.push(part);
    }
    parts.join("/")
}

// =============================================================================
// Volume
// =============================================================================

/// A validated explicit-scale manifest.
#[derive(Debug, Clone)]
pub struct PrecomputedVolume {
    url: String,
    data_type: DataType,
    num_channels: u32,
    volume_type: VolumeType,
    scales: Vec<ScaleInfo>,
    /// One level per (scale, chunk size), in manifest order
    levels: Vec<Vec<Arc<Level>>>,
}

impl PrecomputedVolume {
    /// Parse a manifest body fetched from `<url>/info`.
    pub fn parse(url: &str, body: &[u8]) -> Result<Self, ManifestError> {
        let value: Value =
            serde_json::from_slice(body).map_err(|e| ManifestError::Malformed(e.to_string()))?;
        Self::from_json(url, value)
    }

    /// Validate an already parsed JSON manifest.
    pub fn from_json(url: &str, value: Value) -> Result<Self, ManifestError> {
        if !value.is_object() {
            return Err(ManifestError::Malformed(
                "manifest must be a JSON object".to_string(),
            ));
        }
        let raw: RawManifest =
            serde_json::from_value(value).map_err(|e| ManifestError::Malformed(e.to_string()))?;

        if let Some(redirect) = raw.redirect {
            return Err(ManifestError::Redirect(redirect));
        }
        if let Some(kind) = raw.kind {
            if kind != MULTISCALE_VOLUME_TYPE {
                return Err(ManifestError::InvalidField {
                    field: "@type",
                    message: format!("invalid type {:?}", kind),
                });
            }
        }

        let data_type_name = raw
            .data_type
            .ok_or(ManifestError::MissingField("data_type"))?;
        let data_type =
            DataType::parse(&data_type_name).ok_or_else(|| ManifestError::InvalidField {
                field: "data_type",
                message: format!("unknown data type {:?}", data_type_name),
            })?;

        let num_channels = raw
            .num_channels
            .ok_or(ManifestError::MissingField("num_channels"))?;
        if num_channels <= 0 || num_channels > u32::MAX as i64 {
            return Err(ManifestError::InvalidField {
                field: "num_channels",
                message: format!("must be a positive integer, got {}", num_channels),
            });
        }
        let num_channels = num_channels as u32;

        let volume_type = match raw
            .volume_type
            .as_deref()
            .ok_or(ManifestError::MissingField("type"))?
        {
            "image" => VolumeType::Image,
            "segmentation" => VolumeType::Segmentation,
            other => {
                return Err(ManifestError::InvalidField {
                    field: "type",
                    message: format!("unknown volume type {:?}", other),
                })
            }
        };

        let scales = raw
            .scales
            .ok_or(ManifestError::MissingField("scales"))?
            .into_iter()
            .map(|s| ScaleInfo::from_raw(s, url))
            .collect::<Result<Vec<_>, _>>()?;

        let mut levels = Vec::with_capacity(scales.len());
        for (index, scale) in scales.iter().enumerate() {
            check_encoding(scale.encoding, data_type, num_channels)?;
            let per_chunk_size = scale
                .chunk_sizes
                .iter()
                .map(|&chunk_extent| {
                    Level::new(LevelSpec {
                        index,
                        voxel_extent: scale.size,
                        voxel_offset: scale.voxel_offset,
                        chunk_extent,
                        resolution: scale.resolution,
                        data_type,
                        num_channels,
                        encoding: scale.encoding,
                    })
                    .map(Arc::new)
                })
                .collect::<Result<Vec<_>, _>>()?;
            levels.push(per_chunk_size);
        }

        Ok(Self {
            url: url.to_string(),
            data_type,
            num_channels,
            volume_type,
            scales,
            levels,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn num_channels(&self) -> u32 {
        self.num_channels
    }

    pub fn volume_type(&self) -> VolumeType {
        self.volume_type
    }

    pub fn scales(&self) -> &[ScaleInfo] {
        &self.scales
    }

    /// Voxel box of the first scale: `(offset, offset + size)`.
    pub fn data_bounds(&self) -> Option<([i64; 3], [i64; 3])> {
        let base = self.scales.first()?;
        let upper = [
            base.voxel_offset[0] + base.size[0] as i64,
            base.voxel_offset[1] + base.size[1] as i64,
            base.voxel_offset[2] + base.size[2] as i64,
        ];
        Some((base.voxel_offset, upper))
    }
}

fn check_encoding(
    encoding: Encoding,
    data_type: DataType,
    num_channels: u32,
) -> Result<(), ManifestError> {
    match encoding {
        Encoding::CompressedSegmentation { .. }
            if !matches!(data_type, DataType::Uint32 | DataType::Uint64) =>
        {
            Err(ManifestError::InvalidField {
                field: "encoding",
                message: format!(
                    "compressed_segmentation requires uint32 or uint64, got {}",
                    data_type.name()
                ),
            })
        }
        Encoding::Jpeg if data_type != DataType::Uint8 || !(num_channels == 1 || num_channels == 3) => {
            Err(ManifestError::InvalidField {
                field: "encoding",
                message: format!(
                    "jpeg requires uint8 with 1 or 3 channels, got {} with {}",
                    data_type.name(),
                    num_channels
                ),
            })
        }
        _ => Ok(()),
    }
}

impl MultiscaleSource for PrecomputedVolume {
    type Parameters = OffsetRangeParameters;

    /// One level per scale, using the scale's first chunk size.
    fn describe(&self) -> Vec<Level> {
        self.levels
            .iter()
            .filter_map(|per_chunk_size| per_chunk_size.first())
            .map(|level| (**level).clone())
            .collect()
    }

    fn get_sources(&self, options: &SourceOptions) -> Vec<Vec<ChunkSource<OffsetRangeParameters>>> {
        self.levels
            .iter()
            .zip(&self.scales)
            .map(|(per_chunk_size, scale)| {
                let preferred: Vec<&Arc<Level>> = match options.chunk_size {
                    Some(wanted) => per_chunk_size
                        .iter()
                        .filter(|l| l.chunk_extent() == wanted)
                        .collect(),
                    None => Vec::new(),
                };
                let selected = if preferred.is_empty() {
                    per_chunk_size.iter().collect()
                } else {
                    preferred
                };
                selected
                    .into_iter()
                    .map(|level| {
                        ChunkSource::new(
                            Arc::clone(level),
                            OffsetRangeParameters {
                                url: scale.url.clone(),
                            },
                        )
                    })
                    .collect()
            })
            .collect()
    }
}
