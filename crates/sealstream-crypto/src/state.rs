//! Per-stream cipher state and the chunk codec
//!
//! Each chunk on the wire:
//! ```text
//! [1 byte: encrypted flag][N bytes: ciphertext][16 bytes: Poly1305 tag]
//! nonce = counter (4 bytes, LE) || chain (20 bytes)
//! ```
//!
//! After every chunk the tag is folded into `chain` and the counter is
//! incremented, so a chunk only opens if every earlier chunk was opened
//! before it, in order and unmodified.

use chacha20poly1305::{
    aead::{AeadInPlace, KeyInit},
    Tag, XChaCha20Poly1305, XNonce,
};
use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{StreamError, StreamResult};
use crate::header::StreamHeader;
use crate::key::KeyMaterial;
use crate::{KEY_LEN, MAC_LEN, MAX_CHUNK_SIZE, NONCE_LEN, TAG_LEN};

const CHAIN_LEN: usize = NONCE_LEN - 4;

const STREAM_INFO: &[u8] = b"sealstream/v1 stream";
const REKEY_INFO: &[u8] = b"sealstream/v1 rekey";

/// Per-chunk marker, encrypted and authenticated with the chunk body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ChunkFlag {
    /// Ordinary chunk, more follow.
    Message = 0,
    /// Application-level boundary; otherwise a `Message`.
    Push = 1,
    /// Both sides derive a fresh sub-key after this chunk.
    Rekey = 2,
    /// Last chunk of the stream.
    Final = 3,
}

impl ChunkFlag {
    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(ChunkFlag::Message),
            1 => Some(ChunkFlag::Push),
            2 => Some(ChunkFlag::Rekey),
            3 => Some(ChunkFlag::Final),
            _ => None,
        }
    }

    pub fn is_final(self) -> bool {
        self == ChunkFlag::Final
    }
}

/// A decrypted chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub data: Vec<u8>,
    pub flag: ChunkFlag,
}

/// Mutable per-stream context. Zeroized on drop.
///
/// Push and pull sides derive identical state from the same key and header;
/// it must never be shared between two streams.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct StreamState {
    subkey: [u8; KEY_LEN],
    chain: [u8; CHAIN_LEN],
    counter: u32,
    position: u64,
}

impl StreamState {
    pub fn init_for_encrypt(key: &KeyMaterial, header: &StreamHeader) -> StreamResult<Self> {
        Self::derive(key, header)
    }

    /// Rebuild the encrypting side's state from the received header bytes.
    ///
    /// Only the header's structure is checked here; its authenticity is only
    /// established once the first chunk opens.
    pub fn init_for_decrypt(key: &KeyMaterial, header: &[u8]) -> StreamResult<Self> {
        let header = StreamHeader::from_slice(header)?;
        Self::derive(key, &header)
    }

    fn derive(key: &KeyMaterial, header: &StreamHeader) -> StreamResult<Self> {
        let (subkey, chain) = expand(header.as_bytes(), key.as_bytes(), STREAM_INFO)?;
        Ok(Self {
            subkey,
            chain,
            counter: 1,
            position: 0,
        })
    }

    /// Number of chunks sealed or opened so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Encrypt and authenticate one chunk, then advance.
    ///
    /// Returns `encrypted flag || ciphertext || tag`, `TAG_LEN` bytes longer
    /// than `data`.
    pub fn seal(
        &mut self,
        data: &[u8],
        flag: ChunkFlag,
        associated_data: &[u8],
    ) -> StreamResult<Vec<u8>> {
        if data.len() > MAX_CHUNK_SIZE {
            return Err(StreamError::ChunkTooLarge {
                len: data.len(),
                max: MAX_CHUNK_SIZE,
            });
        }

        let mut out = Vec::with_capacity(TAG_LEN + data.len());
        out.push(flag as u8);
        out.extend_from_slice(data);

        let cipher = XChaCha20Poly1305::new((&self.subkey).into());
        let tag = cipher
            .encrypt_in_place_detached(&self.nonce(), associated_data, &mut out)
            .map_err(|_| StreamError::ChunkTooLarge {
                len: data.len(),
                max: MAX_CHUNK_SIZE,
            })?;
        out.extend_from_slice(&tag);

        let mut mac = [0u8; MAC_LEN];
        mac.copy_from_slice(&tag);
        self.advance(&mac, flag)?;
        Ok(out)
    }

    /// Verify and decrypt one chunk, then advance.
    ///
    /// On failure the state is left untouched and nothing is returned; the
    /// caller must treat the stream as dead.
    pub fn open(&mut self, cipher_chunk: &[u8], associated_data: &[u8]) -> StreamResult<Chunk> {
        let failure = StreamError::AuthenticationFailure {
            chunk: self.position,
        };
        if cipher_chunk.len() < TAG_LEN {
            return Err(failure);
        }

        let (body, mac_bytes) = cipher_chunk.split_at(cipher_chunk.len() - MAC_LEN);
        let mut buf = body.to_vec();
        let cipher = XChaCha20Poly1305::new((&self.subkey).into());
        if cipher
            .decrypt_in_place_detached(
                &self.nonce(),
                associated_data,
                &mut buf,
                Tag::from_slice(mac_bytes),
            )
            .is_err()
        {
            return Err(failure);
        }

        let Some(flag) = ChunkFlag::from_byte(buf[0]) else {
            buf.zeroize();
            return Err(failure);
        };
        let data = buf.split_off(1);

        let mut mac = [0u8; MAC_LEN];
        mac.copy_from_slice(mac_bytes);
        self.advance(&mac, flag)?;
        Ok(Chunk { data, flag })
    }

    /// Derive a fresh sub-key and chain from the current ones.
    ///
    /// Runs automatically after a `Rekey` chunk and on counter wrap. Calling it
    /// by hand is fine as long as the other side does the same at the same
    /// chunk position.
    pub fn rekey(&mut self) -> StreamResult<()> {
        let (subkey, chain) = expand(&self.chain, &self.subkey, REKEY_INFO)?;
        self.subkey = subkey;
        self.chain = chain;
        self.counter = 1;
        Ok(())
    }

    fn advance(&mut self, mac: &[u8; MAC_LEN], flag: ChunkFlag) -> StreamResult<()> {
        for (c, m) in self.chain.iter_mut().zip(mac.iter()) {
            *c ^= m;
        }
        self.counter = self.counter.wrapping_add(1);
        self.position += 1;
        if flag == ChunkFlag::Rekey || self.counter == 0 {
            self.rekey()?;
        }
        Ok(())
    }

    fn nonce(&self) -> XNonce {
        let mut nonce = [0u8; NONCE_LEN];
        nonce[..4].copy_from_slice(&self.counter.to_le_bytes());
        nonce[4..].copy_from_slice(&self.chain);
        XNonce::clone_from_slice(&nonce)
    }
}

impl std::fmt::Debug for StreamState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamState")
            .field("subkey", &"[REDACTED]")
            .field("position", &self.position)
            .finish()
    }
}

/// HKDF-SHA256 into a sub-key and a chain value.
fn expand(
    salt: &[u8],
    ikm: &[u8; KEY_LEN],
    info: &[u8],
) -> StreamResult<([u8; KEY_LEN], [u8; CHAIN_LEN])> {
    let hkdf = Hkdf::<Sha256>::new(Some(salt), ikm);
    let mut okm = [0u8; KEY_LEN + CHAIN_LEN];
    hkdf.expand(info, &mut okm)
        .map_err(|e| StreamError::KeyDerivation(e.to_string()))?;

    let mut subkey = [0u8; KEY_LEN];
    let mut chain = [0u8; CHAIN_LEN];
    subkey.copy_from_slice(&okm[..KEY_LEN]);
    chain.copy_from_slice(&okm[KEY_LEN..]);
    okm.zeroize();
    Ok((subkey, chain))
}
