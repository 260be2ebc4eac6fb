//! Manifest capability and discovery.
//!
//! Both manifest shapes resolve to the same two views: the ordered list of
//! [`Level`]s and the per-level chunk sources a scheduler requests chunks
//! from.

use tracing::{debug, info};

use super::dzi::{is_dzi_url, DziPyramid};
use super::geometry::{Level, Vec3};
use super::precomputed::PrecomputedVolume;
use crate::chunk::{ChunkSource, SourceParameters};
use crate::error::ManifestError;
use crate::io::ChunkFetcher;

/// Level selection passed to [`MultiscaleSource::get_sources`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceOptions {
    /// Preferred chunk size; scales without it keep all their sizes
    pub chunk_size: Option<Vec3>,
}

/// A manifest that can be resolved into pyramid levels.
pub trait MultiscaleSource {
    type Parameters: SourceParameters;

    /// One level per scale, in the order the rest of the system uses.
    fn describe(&self) -> Vec<Level>;

    /// One inner list per level, each holding one source per chunk size.
    fn get_sources(&self, options: &SourceOptions) -> Vec<Vec<ChunkSource<Self::Parameters>>>;
}

/// A loaded manifest of either shape.
#[derive(Debug, Clone)]
pub enum Manifest {
    Precomputed(PrecomputedVolume),
    Dzi(DziPyramid),
}

impl Manifest {
    /// Levels of whichever manifest was loaded.
    pub fn describe(&self) -> Vec<Level> {
        match self {
            Manifest::Precomputed(volume) => volume.describe(),
            Manifest::Dzi(pyramid) => pyramid.describe(),
        }
    }

    /// Short name of the manifest shape.
    pub fn kind(&self) -> &'static str {
        match self {
            Manifest::Precomputed(_) => "precomputed",
            Manifest::Dzi(_) => "dzi",
        }
    }
}

/// Address of the JSON manifest for a volume URL.
pub fn info_url(url: &str) -> String {
    format!("{}/info", url.trim_end_matches('/'))
}

/// Fetch and resolve the manifest at `url`.
///
/// DZI descriptor URLs are fetched as-is. Anything else is treated as an
/// explicit-scale volume whose manifest lives at `<url>/info`.
pub async fn load_manifest<F>(fetcher: &F, url: &str) -> Result<Manifest, ManifestError>
where
    F: ChunkFetcher + ?Sized,
{
    if is_dzi_url(url) {
        debug!(url = %url, "fetching dzi descriptor");
        let body = fetcher.fetch(url).await?;
        let pyramid = DziPyramid::parse(url, &body)?;
        info!(
            url = %url,
            levels = pyramid.levels().len(),
            width = pyramid.descriptor().width,
            height = pyramid.descriptor().height,
            "loaded dzi pyramid"
        );
        return Ok(Manifest::Dzi(pyramid));
    }

    let base = url.trim_end_matches('/');
    let manifest_url = info_url(base);
    debug!(url = %manifest_url, "fetching volume manifest");
    let body = fetcher.fetch(&manifest_url).await?;
    let volume = PrecomputedVolume::parse(base, &body)?;
    info!(
        url = %base,
        scales = volume.scales().len(),
        data_type = volume.data_type().name(),
        "loaded volume manifest"
    );
    Ok(Manifest::Precomputed(volume))
}
