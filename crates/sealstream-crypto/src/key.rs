//! Stream key material: generation and raw byte access

use rand::{rngs::OsRng, RngCore};
use zeroize::Zeroize;

use crate::error::{StreamError, StreamResult};
use crate::KEY_LEN;

/// A 256-bit symmetric stream key. Zeroized on drop.
#[derive(Clone)]
pub struct KeyMaterial {
    bytes: [u8; KEY_LEN],
}

impl KeyMaterial {
    /// Generate a fresh key from the operating system's CSPRNG.
    ///
    /// There is no fallback: if the OS source fails, so does this.
    pub fn generate() -> StreamResult<Self> {
        let mut bytes = [0u8; KEY_LEN];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(StreamError::EntropyUnavailable)?;
        Ok(Self { bytes })
    }

    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Build a key from a byte slice, e.g. one read back from disk.
    pub fn try_from_slice(bytes: &[u8]) -> StreamResult<Self> {
        let bytes: [u8; KEY_LEN] = bytes.try_into().map_err(|_| StreamError::InvalidKeyLength {
            expected: KEY_LEN,
            actual: bytes.len(),
        })?;
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

impl Drop for KeyMaterial {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}
