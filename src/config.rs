//! Configuration for the `pyramid-chunks` command line tool.
//!
//! Options come from command-line arguments via clap, falling back to
//! environment variables with the `PYRAMID_` prefix:
//!
//! - `PYRAMID_URL` - Volume base URL or DZI descriptor URL (required)
//! - `PYRAMID_TIMEOUT` - HTTP timeout in seconds (default: 30)
//! - `PYRAMID_CACHE_BYTES` - Chunk cache capacity in bytes (default: 256MB)
//!
//! # Example
//!
//! ```ignore
//! use pyramid_chunks::config::{Cli, Command};
//!
//! match Cli::parse().into_command() {
//!     Command::Levels(config) => println!("{}", config.source.url),
//!     Command::Fetch(config) => println!("{:?}", config.grid_position()),
//! }
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::chunk::DEFAULT_CHUNK_CACHE_CAPACITY;
use crate::io::DEFAULT_FETCH_TIMEOUT_SECS;

// =============================================================================
// Default Values
// =============================================================================

/// Largest accepted HTTP timeout (10 minutes).
pub const MAX_FETCH_TIMEOUT_SECS: u64 = 600;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Pyramid Chunks - resolve and decode chunks of multiscale image volumes.
#[derive(Parser, Debug, Clone)]
#[command(name = "pyramid-chunks")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the pyramid levels of a volume, finest first
    Levels(LevelsConfig),
    /// Fetch and decode one chunk, writing the planar buffer to a file
    Fetch(FetchConfig),
}

/// Options shared by every command.
#[derive(Args, Debug, Clone)]
pub struct SourceConfig {
    /// Volume base URL, or the URL of a `.dzi` descriptor.
    #[arg(long, env = "PYRAMID_URL")]
    pub url: String,

    /// HTTP timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_FETCH_TIMEOUT_SECS, env = "PYRAMID_TIMEOUT")]
    pub timeout: u64,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl SourceConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.url.trim().is_empty() {
            return Err("Volume URL is required. Set --url or PYRAMID_URL".to_string());
        }
        if self.timeout == 0 || self.timeout > MAX_FETCH_TIMEOUT_SECS {
            return Err(format!(
                "timeout must be between 1 and {} seconds",
                MAX_FETCH_TIMEOUT_SECS
            ));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}

#[derive(Args, Debug, Clone)]
pub struct LevelsConfig {
    #[command(flatten)]
    pub source: SourceConfig,
}

impl LevelsConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.source.validate()
    }
}

#[derive(Args, Debug, Clone)]
pub struct FetchConfig {
    #[command(flatten)]
    pub source: SourceConfig,

    /// Scale index, 0 = finest.
    #[arg(long, default_value_t = 0)]
    pub scale: usize,

    /// Chunk size index within the scale.
    #[arg(long, default_value_t = 0)]
    pub chunk_size_index: usize,

    /// Chunk grid column.
    #[arg(short, long, default_value_t = 0)]
    pub x: u32,

    /// Chunk grid row.
    #[arg(short, long, default_value_t = 0)]
    pub y: u32,

    /// Chunk grid slice.
    #[arg(short, long, default_value_t = 0)]
    pub z: u32,

    /// File receiving the decoded channel-planar buffer.
    #[arg(short, long)]
    pub output: PathBuf,

    /// Chunk cache capacity in bytes.
    #[arg(long, default_value_t = DEFAULT_CHUNK_CACHE_CAPACITY, env = "PYRAMID_CACHE_BYTES")]
    pub cache_bytes: usize,
}

impl FetchConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.source.validate()?;
        if self.cache_bytes == 0 {
            return Err("cache_bytes must be greater than 0".to_string());
        }
        if self.output.as_os_str().is_empty() {
            return Err("An output file is required. Set --output".to_string());
        }
        Ok(())
    }

    pub fn grid_position(&self) -> [u32; 3] {
        [self.x, self.y, self.z]
    }
}

// =============================================================================
// Tests
// =============================================================================
