//! Per-stream public header

use rand::{rngs::OsRng, RngCore};

use crate::error::{StreamError, StreamResult};
use crate::HEADER_LEN;

/// Random value written in clear as the first `HEADER_LEN` bytes of every
/// stream. Not secret, but must never repeat under the same key.
#[derive(Clone, PartialEq, Eq)]
pub struct StreamHeader {
    bytes: [u8; HEADER_LEN],
}

impl StreamHeader {
    pub fn generate() -> StreamResult<Self> {
        let mut bytes = [0u8; HEADER_LEN];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(StreamError::EntropyUnavailable)?;
        // 2^-192 for a working source; treat it as a stuck RNG.
        if bytes.iter().all(|&b| b == 0) {
            return Err(StreamError::EntropyUnavailable(rand::Error::new(
                "OS random source returned an all-zero header",
            )));
        }
        Ok(Self { bytes })
    }

    /// Parse a header received from the wire.
    pub fn from_slice(bytes: &[u8]) -> StreamResult<Self> {
        let bytes: [u8; HEADER_LEN] = bytes.try_into().map_err(|_| {
            StreamError::MalformedHeader(format!(
                "expected {HEADER_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        if bytes.iter().all(|&b| b == 0) {
            return Err(StreamError::MalformedHeader("all-zero header".into()));
        }
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8; HEADER_LEN] {
        &self.bytes
    }
}

impl std::fmt::Debug for StreamHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let hex: String = self.bytes.iter().map(|b| format!("{b:02x}")).collect();
        f.debug_tuple("StreamHeader").field(&hex).finish()
    }
}
