use crate::error::{StreamError, StreamResult};
use crate::{CHUNK_SIZE, MAX_CHUNK_SIZE};

/// Framing parameters shared by both ends of a stream.
///
/// `chunk_size` is not carried on the wire: the decrypting side must use the
/// value the encrypting side used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamOptions {
    /// Plaintext bytes per chunk (default: 4096)
    pub chunk_size: usize,
    /// Mark every Nth chunk `Rekey` when encrypting (0 = never)
    pub rekey_interval: u64,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            rekey_interval: 0,
        }
    }
}

impl StreamOptions {
    pub fn validate(&self) -> StreamResult<()> {
        if self.chunk_size == 0 || self.chunk_size > MAX_CHUNK_SIZE {
            return Err(StreamError::InvalidChunkSize(self.chunk_size));
        }
        Ok(())
    }
}

/// What a finished stream carried.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamSummary {
    /// Chunks sealed or opened, including the final one
    pub chunks: u64,
    /// Plaintext bytes
    pub bytes: u64,
}
