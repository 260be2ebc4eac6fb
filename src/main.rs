//! Pyramid Chunks - resolve and decode chunks of multiscale image volumes.
//!
//! This binary loads a manifest over HTTP and either prints its levels or
//! fetches a single chunk.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pyramid_chunks::{
    config::{Cli, Command, FetchConfig, LevelsConfig, SourceConfig},
    load_manifest, CancellationToken, ChunkResult, ChunkService, HttpFetcher, Level, Manifest,
    MultiscaleSource, SourceOptions,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Levels(config) => run_levels(config).await,
        Command::Fetch(config) => run_fetch(config).await,
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "pyramid_chunks=debug"
    } else {
        "pyramid_chunks=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build the HTTP fetcher and load the manifest named by `config`.
async fn open_manifest(config: &SourceConfig) -> Result<(Arc<HttpFetcher>, Manifest), String> {
    let fetcher = HttpFetcher::new(config.timeout()).map_err(|e| e.to_string())?;
    let manifest = load_manifest(&fetcher, &config.url)
        .await
        .map_err(|e| e.to_string())?;
    Ok((Arc::new(fetcher), manifest))
}

// =============================================================================
// Levels Command
// =============================================================================

async fn run_levels(config: LevelsConfig) -> ExitCode {
    init_logging(config.source.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let manifest = match open_manifest(&config.source).await {
        Ok((_, manifest)) => manifest,
        Err(e) => {
            error!("Failed to load manifest: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("Manifest: {} ({})", config.source.url, manifest.kind());
    println!("─────────────────────────────────────────────────────────────");
    for (scale, level) in manifest.describe().iter().enumerate() {
        print_level(scale, level);
    }

    ExitCode::SUCCESS
}

fn print_level(scale: usize, level: &Level) {
    let [w, h, d] = level.voxel_extent();
    let [cw, ch, cd] = level.chunk_extent();
    let [gw, gh, gd] = level.grid_shape();
    let [rx, ry, rz] = level.resolution();
    println!(
        "  scale {:>2}: {}x{}x{} voxels, chunks {}x{}x{} (grid {}x{}x{}), resolution {}x{}x{}, {} x{} {}",
        scale,
        w,
        h,
        d,
        cw,
        ch,
        cd,
        gw,
        gh,
        gd,
        rx,
        ry,
        rz,
        level.data_type().name(),
        level.num_channels(),
        level.encoding().name()
    );
}

// =============================================================================
// Fetch Command
// =============================================================================

async fn run_fetch(config: FetchConfig) -> ExitCode {
    init_logging(config.source.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let (fetcher, manifest) = match open_manifest(&config.source).await {
        Ok(opened) => opened,
        Err(e) => {
            error!("Failed to load manifest: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = match &manifest {
        Manifest::Precomputed(volume) => fetch_chunk(volume, fetcher, &config).await,
        Manifest::Dzi(pyramid) => fetch_chunk(pyramid, fetcher, &config).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn fetch_chunk<M: MultiscaleSource>(
    manifest: &M,
    fetcher: Arc<HttpFetcher>,
    config: &FetchConfig,
) -> Result<(), String> {
    let service = ChunkService::with_cache_capacity(
        manifest.get_sources(&SourceOptions::default()),
        fetcher,
        config.cache_bytes,
    );

    let token = CancellationToken::new();
    let ctrl_c = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c.cancel();
        }
    });

    let grid_position = config.grid_position();
    let result = service
        .get_chunk(config.scale, config.chunk_size_index, grid_position, &token)
        .await
        .map_err(|e| format!("Chunk {:?} failed: {}", grid_position, e))?;

    let response = match result {
        ChunkResult::Ready(response) => response,
        ChunkResult::Cancelled => return Err("Chunk request cancelled".to_string()),
    };

    tokio::fs::write(&config.output, &response.data)
        .await
        .map_err(|e| format!("Failed to write {}: {}", config.output.display(), e))?;

    info!(
        grid = ?grid_position,
        data_size = ?response.data_size,
        bytes = response.data.len(),
        output = %config.output.display(),
        "chunk written"
    );
    Ok(())
}
