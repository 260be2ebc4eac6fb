use thiserror::Error;

/// Errors raised while reading a dataset manifest.
///
/// These are fatal to constructing a source and are never retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ManifestError {
    /// Required field is absent
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Field is present but has the wrong shape or value
    #[error("Invalid value for {field}: {message}")]
    InvalidField {
        field: &'static str,
        message: String,
    },

    /// The manifest points somewhere else
    #[error("Manifest redirects to {0}")]
    Redirect(String),

    /// Manifest body could not be parsed at all
    #[error("Malformed manifest: {0}")]
    Malformed(String),

    /// Manifest geometry failed validation
    #[error("Invalid geometry: {0}")]
    Validation(#[from] ValidationError),

    /// Manifest could not be fetched
    #[error("Failed to fetch manifest: {0}")]
    Fetch(#[from] FetchError),
}

/// Out-of-range geometry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Tile size must be at least 1
    #[error("Tile size must be positive, got {0}")]
    NonPositiveTileSize(i64),

    /// Overlap must not be negative
    #[error("Overlap must not be negative, got {0}")]
    NegativeOverlap(i64),

    /// Image dimensions must be at least 1
    #[error("Image dimensions must be positive, got {width}x{height}")]
    NonPositiveDimensions { width: i64, height: i64 },

    /// A per-axis extent was zero
    #[error("{what} must be positive on every axis, got {value:?}")]
    NonPositiveExtent { what: &'static str, value: [i64; 3] },

    /// Grid position lies outside the level's chunk grid
    #[error("Grid position {position:?} out of bounds for grid shape {grid_shape:?}")]
    GridOutOfBounds {
        position: [u32; 3],
        grid_shape: [u32; 3],
    },

    /// Level or source index does not exist
    #[error("No source at scale {scale}, index {index}")]
    UnknownSource { scale: usize, index: usize },
}

/// Transport failures for a single resource.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Server answered with a non-success status
    #[error("Fetching {address} failed with HTTP status {status}")]
    Status { address: String, status: u16 },

    /// Address could not be turned into a request
    #[error("Invalid address {address}: {message}")]
    InvalidAddress { address: String, message: String },

    /// Network or connection error
    #[error("Connection error for {address}: {message}")]
    Connection { address: String, message: String },
}

/// Payload could not be turned into a voxel buffer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Payload length does not match the expected buffer length
    #[error("Payload length mismatch: expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// Compressed segmentation structure is inconsistent
    #[error("Malformed compressed segmentation: {0}")]
    MalformedSegmentation(String),

    /// Image codec rejected the stream
    #[error("Corrupt image stream: {0}")]
    CorruptImage(String),

    /// Decoded image does not match the chunk geometry
    #[error("Decoded image is {actual_width}x{actual_height}, expected {expected_width}x{expected_height}")]
    ImageSizeMismatch {
        expected_width: u32,
        expected_height: u64,
        actual_width: u32,
        actual_height: u32,
    },

    /// Channel count not supported by this encoding
    #[error("Unsupported channel count: {0}")]
    UnsupportedChannels(u32),

    /// Sample type not supported by this encoding
    #[error("Unsupported data type {data_type} for {encoding}")]
    UnsupportedDataType {
        data_type: &'static str,
        encoding: &'static str,
    },
}

/// Per-chunk failure, carried by a failed download.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChunkError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Decode(#[from] DecodeError),
}
