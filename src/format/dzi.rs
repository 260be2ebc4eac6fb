//! Deep Zoom (DZI) dyadic tile pyramids.
//!
//! A DZI descriptor names only the base image size, tile size, overlap and
//! tile format:
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <Image xmlns="http://schemas.microsoft.com/deepzoom/2008"
//!        TileSize="254"
//!        Overlap="1"
//!        Format="jpg">
//!   <Size Width="46920" Height="33600" />
//! </Image>
//! ```
//!
//! Every other level is synthesized by repeated halving. Deep Zoom numbers
//! levels from the coarsest:
//! - DZI level 0 = fully reduced (1x1 pixel)
//! - DZI max level = full resolution
//!
//! [`DziPyramid::levels`] keeps that internal order; the rest of the system
//! wants finest first, which [`DziPyramid::levels_finest_first`] and
//! [`MultiscaleSource::describe`] provide. Tiles live under
//! `<descriptor url without suffix>_files/<dzi level>/<column>_<row>.<format>`.

use std::sync::Arc;

use super::geometry::{dyadic_level_count, halve, DataType, Encoding, Level, LevelSpec, Vec3};
use super::manifest::{MultiscaleSource, SourceOptions};
use crate::chunk::{ChunkSource, TileParameters};
use crate::decode::PLANAR_RGB_CHANNELS;
use crate::error::{ManifestError, ValidationError};

/// Descriptor suffixes recognised for dyadic pyramids.
pub const DZI_SUFFIXES: [&str; 2] = [".dzi", ".xml"];

/// Tile formats a pyramid may declare.
pub const SUPPORTED_TILE_FORMATS: [&str; 3] = ["jpg", "jpeg", "png"];

// =============================================================================
// Descriptor
// =============================================================================

/// Validated DZI descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DziDescriptor {
    pub width: u32,
    pub height: u32,
    pub tile_size: u32,
    pub overlap: u32,
    pub format: String,
}

impl DziDescriptor {
    /// Validate raw descriptor values.
    pub fn new(
        width: i64,
        height: i64,
        tile_size: i64,
        overlap: i64,
        format: &str,
    ) -> Result<Self, ManifestError> {
        if tile_size <= 0 || tile_size > u32::MAX as i64 {
            return Err(ValidationError::NonPositiveTileSize(tile_size).into());
        }
        if overlap < 0 || overlap > u32::MAX as i64 {
            return Err(ValidationError::NegativeOverlap(overlap).into());
        }
        if width <= 0 || height <= 0 || width > u32::MAX as i64 || height > u32::MAX as i64 {
            return Err(ValidationError::NonPositiveDimensions { width, height }.into());
        }
        let format = format.to_ascii_lowercase();
        if !SUPPORTED_TILE_FORMATS.contains(&format.as_str()) {
            return Err(ManifestError::InvalidField {
                field: "Format",
                message: format!("unsupported tile format {:?}", format),
            });
        }
        Ok(Self {
            width: width as u32,
            height: height as u32,
            tile_size: tile_size as u32,
            overlap: overlap as u32,
            format,
        })
    }

    /// Read a descriptor from its XML text.
    pub fn from_xml(xml: &str) -> Result<Self, ManifestError> {
        let xml = strip_unparsed(xml);
        let xml = xml.as_str();
        let image = find_element(xml, "Image")
            .ok_or_else(|| ManifestError::Malformed("no <Image> element".to_string()))?;
        let size = find_element(xml, "Size")
            .ok_or_else(|| ManifestError::Malformed("no <Size> element".to_string()))?;

        let tile_size = int_attribute(image, "TileSize")?;
        let overlap = int_attribute(image, "Overlap")?;
        let format = attribute(image, "Format").ok_or(ManifestError::MissingField("Format"))?;
        let width = int_attribute(size, "Width")?;
        let height = int_attribute(size, "Height")?;

        Self::new(width, height, tile_size, overlap, format)
    }

    /// Number of DZI levels, `ceil(log2(max(width, height))) + 1`.
    pub fn level_count(&self) -> usize {
        dyadic_level_count(self.width, self.height) as usize + 1
    }
}

/// Drop comments and CDATA sections, which may contain tag-like text.
///
/// An unterminated section swallows the rest of the document.
fn strip_unparsed(xml: &str) -> String {
    const SECTIONS: [(&str, &str); 2] = [("<!--", "-->"), ("<![CDATA[", "]]>")];

    let mut out = String::with_capacity(xml.len());
    let mut rest = xml;
    loop {
        let next = SECTIONS
            .iter()
            .filter_map(|(open, close)| rest.find(open).map(|pos| (pos, *open, *close)))
            .min_by_key(|(pos, _, _)| *pos);
        let Some((pos, open, close)) = next else {
            out.push_str(rest);
            return out;
        };
        out.push_str(&rest[..pos]);
        out.push(' ');
        let body = &rest[pos + open.len()..];
        match body.find(close) {
            Some(end) => rest = &body[end + close.len()..],
            None => return out,
        }
    }
}

/// Contents of the opening tag `<name ...>`, attributes only.
fn find_element<'a>(xml: &'a str, name: &str) -> Option<&'a str> {
    let pattern = format!("<{}", name);
    let mut from = 0;
    while let Some(pos) = xml[from..].find(&pattern) {
        let start = from + pos + pattern.len();
        let rest = &xml[start..];
        match rest.chars().next() {
            Some(c) if c.is_whitespace() || c == '>' || c == '/' => {
                let end = rest.find('>')?;
                return Some(rest[..end].trim_end_matches('/'));
            }
            // Prefix of a longer element name, e.g. <ImageData
            _ => from = start,
        }
    }
    None
}

fn attribute<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    let pattern = format!("{}=", name);
    let mut from = 0;
    while let Some(pos) = tag[from..].find(&pattern) {
        let at = from + pos;
        let preceded_by_space = tag[..at]
            .chars()
            .next_back()
            .is_some_and(char::is_whitespace);
        let value_start = at + pattern.len();
        if preceded_by_space {
            let rest = &tag[value_start..];
            let quote = rest.chars().next()?;
            if quote != '"' && quote != '\'' {
                return None;
            }
            let end = rest[1..].find(quote)?;
            return Some(&rest[1..1 + end]);
        }
        from = value_start;
    }
    None
}

fn int_attribute(tag: &str, name: &'static str) -> Result<i64, ManifestError> {
    let value = attribute(tag, name).ok_or(ManifestError::MissingField(name))?;
    value.trim().parse().map_err(|_| ManifestError::InvalidField {
        field: name,
        message: format!("expected an integer, got {:?}", value),
    })
}

/// Tile root for a descriptor URL: suffix replaced with `_files`.
pub fn tile_root(descriptor_url: &str) -> String {
    let stem = DZI_SUFFIXES
        .iter()
        .find_map(|suffix| descriptor_url.strip_suffix(suffix))
        .unwrap_or(descriptor_url);
    format!("{}_files", stem)
}

/// Whether a URL names a DZI descriptor.
pub fn is_dzi_url(url: &str) -> bool {
    DZI_SUFFIXES.iter().any(|suffix| url.ends_with(suffix))
}

// =============================================================================
// Pyramid
// =============================================================================

/// A dyadic pyramid resolved from a descriptor.
#[derive(Debug, Clone)]
pub struct DziPyramid {
    descriptor: DziDescriptor,
    tile_root: String,
    /// Coarsest first; position equals DZI level
    levels: Vec<Arc<Level>>,
}

impl DziPyramid {
    /// Synthesize every level of the pyramid described at `url`.
    pub fn new(descriptor: DziDescriptor, url: &str) -> Result<Self, ManifestError> {
        let count = descriptor.level_count();
        let max_level = count - 1;

        // Finest first while halving, then flipped into DZI order
        let mut extents: Vec<(u32, u32)> = Vec::with_capacity(count);
        let (mut w, mut h) = (descriptor.width, descriptor.height);
        for _ in 0..count {
            extents.push((w, h));
            w = halve(w);
            h = halve(h);
        }
        extents.reverse();

        let chunk_extent: Vec3 = [descriptor.tile_size, descriptor.tile_size, 1];
        let mut levels = Vec::with_capacity(count);
        for (index, &(width, height)) in extents.iter().enumerate() {
            let scale = (1u64 << (max_level - index)) as f64;
            let level = Level::new(LevelSpec {
                index,
                voxel_extent: [width, height, 1],
                voxel_offset: [0, 0, 0],
                chunk_extent,
                resolution: [scale, scale, 1.0],
                data_type: DataType::Uint8,
                num_channels: PLANAR_RGB_CHANNELS as u32,
                encoding: Encoding::TiledImage {
                    overlap: descriptor.overlap,
                },
            })?;
            levels.push(Arc::new(level));
        }

        Ok(Self {
            tile_root: tile_root(url),
            descriptor,
            levels,
        })
    }

    /// Parse a descriptor body fetched from `url`.
    pub fn parse(url: &str, body: &[u8]) -> Result<Self, ManifestError> {
        let xml = std::str::from_utf8(body)
            .map_err(|e| ManifestError::Malformed(format!("descriptor is not UTF-8: {}", e)))?;
        Self::new(DziDescriptor::from_xml(xml)?, url)
    }

    pub fn descriptor(&self) -> &DziDescriptor {
        &self.descriptor
    }

    pub fn tile_root(&self) -> &str {
        &self.tile_root
    }

    /// Highest DZI level (full resolution).
    pub fn max_level(&self) -> usize {
        self.levels.len() - 1
    }

    /// Levels in DZI order, coarsest first.
    pub fn levels(&self) -> &[Arc<Level>] {
        &self.levels
    }

    /// Levels finest first, the order the rest of the system uses.
    pub fn levels_finest_first(&self) -> impl Iterator<Item = &Arc<Level>> {
        self.levels.iter().rev()
    }

    /// Base URL of the tiles of one DZI level.
    pub fn level_url(&self, dzi_level: usize) -> String {
        format!("{}/{}", self.tile_root, dzi_level)
    }
}

impl MultiscaleSource for DziPyramid {
    type Parameters = TileParameters;

    fn describe(&self) -> Vec<Level> {
        self.levels_finest_first().map(|l| (**l).clone()).collect()
    }

    /// One source per level, finest first. Tile size is fixed by the
    /// descriptor, so `options` has nothing to select.
    fn get_sources(&self, _options: &SourceOptions) -> Vec<Vec<ChunkSource<TileParameters>>> {
        self.levels_finest_first()
            .map(|level| {
                vec![ChunkSource::new(
                    Arc::clone(level),
                    TileParameters {
                        level_url: self.level_url(level.index()),
                        format: self.descriptor.format.clone(),
                    },
                )]
            })
            .collect()
    }
}
