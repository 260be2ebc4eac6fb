use bytes::Bytes;

use crate::error::ChunkError;
use crate::format::{ChunkBounds, Vec3};

/// Lifecycle of a single chunk request.
///
/// ```text
/// Created -> AddressComputed -> Fetching -> Decoding -> Populated
///    \              \               \            \
///     +--------------+---------------+------------+--> Failed
///                                    \            \
///                                     +------------+--> Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkState {
    Created,
    AddressComputed,
    Fetching,
    Decoding,
    Populated,
    Failed,
    Cancelled,
}

impl ChunkState {
    /// Whether no further transition can happen.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ChunkState::Populated | ChunkState::Failed | ChunkState::Cancelled
        )
    }
}

/// The unit of fetch and decode.
///
/// Owned by exactly one download at a time; its buffer is written only by its
/// own decode step.
#[derive(Debug, Clone)]
pub struct Chunk {
    grid_position: Vec3,
    level: usize,
    bounds: ChunkBounds,
    data_size: Vec3,
    state: ChunkState,
    address: Option<String>,
    buffer: Option<Bytes>,
}

impl Chunk {
    pub(crate) fn new(grid_position: Vec3, level: usize, bounds: ChunkBounds, data_size: Vec3) -> Self {
        Self {
            grid_position,
            level,
            bounds,
            data_size,
            state: ChunkState::Created,
            address: None,
            buffer: None,
        }
    }

    pub fn grid_position(&self) -> Vec3 {
        self.grid_position
    }

    /// Index of the level this chunk belongs to.
    pub fn level(&self) -> usize {
        self.level
    }

    /// Voxel box the chunk covers, computed once at creation.
    pub fn bounds(&self) -> ChunkBounds {
        self.bounds
    }

    /// Voxel dimensions of the chunk's buffer.
    pub fn data_size(&self) -> Vec3 {
        self.data_size
    }

    pub fn state(&self) -> ChunkState {
        self.state
    }

    /// Remote address, once computed.
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// Decoded voxel buffer; `None` until the chunk is populated.
    pub fn buffer(&self) -> Option<&Bytes> {
        self.buffer.as_ref()
    }

    /// Hand the buffer to the caller, consuming the chunk.
    pub fn into_buffer(self) -> Option<Bytes> {
        self.buffer
    }

    pub(crate) fn set_state(&mut self, state: ChunkState) {
        self.state = state;
    }

    pub(crate) fn set_address(&mut self, address: String) {
        self.address = Some(address);
        self.state = ChunkState::AddressComputed;
    }

    pub(crate) fn populate(&mut self, buffer: Vec<u8>) {
        self.buffer = Some(Bytes::from(buffer));
        self.state = ChunkState::Populated;
    }
}

/// Terminal result of [`ChunkSource::download`](super::ChunkSource::download).
#[derive(Debug)]
pub enum DownloadOutcome {
    /// Buffer decoded; ownership passes to the caller
    Populated(Chunk),
    /// Some stage failed; the chunk buffer is unwritten
    Failed { chunk: Chunk, error: ChunkError },
    /// Cancellation observed before decoding; the chunk buffer is unwritten
    Cancelled(Chunk),
}

impl DownloadOutcome {
    /// The chunk, whatever the outcome.
    pub fn chunk(&self) -> &Chunk {
        match self {
            DownloadOutcome::Populated(chunk)
            | DownloadOutcome::Failed { chunk, .. }
            | DownloadOutcome::Cancelled(chunk) => chunk,
        }
    }

    pub fn is_populated(&self) -> bool {
        matches!(self, DownloadOutcome::Populated(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, DownloadOutcome::Cancelled(_))
    }

    /// The failure, if any.
    pub fn error(&self) -> Option<&ChunkError> {
        match self {
            DownloadOutcome::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}
