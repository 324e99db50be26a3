//! sealstream-crypto: chunked authenticated stream encryption
//!
//! Architecture: XChaCha20-Poly1305 per chunk, nonces chained through every
//! previous tag
//!
//! Wire format:
//! ```text
//! [24 bytes: random header]
//! [1 + N + 16 bytes: sealed chunk]   repeated, N <= chunk size
//!
//! sealed chunk = enc(flag) || enc(plaintext) || Poly1305 tag
//! ```
//!
//! Key schedule:
//! ```text
//! Stream Key (256-bit, random, held by the caller)
//!   └── HKDF-SHA256(salt=header) → sub-key (256-bit) || chain (160-bit)
//!       ├── chunk nonce = counter (32-bit LE) || chain
//!       ├── after each chunk: chain ^= tag, counter += 1
//!       └── on Rekey flag or counter wrap: HKDF-SHA256(salt=chain, ikm=sub-key)
//! ```
//!
//! Exactly one chunk per stream carries the `Final` flag and it is the last
//! one, so truncation, reordering, splicing and trailing data are all detected.

pub mod decrypt;
pub mod encrypt;
pub mod error;
pub mod header;
mod io;
pub mod key;
pub mod options;
pub mod state;

pub use decrypt::{decrypt_stream, decrypt_stream_with, decrypt_to_vec, Decryptor, DecryptorPhase};
pub use encrypt::{encrypt_stream, encrypt_stream_with, encrypt_to_vec, Encryptor, EncryptorPhase};
pub use error::{StreamError, StreamResult};
pub use header::StreamHeader;
pub use key::KeyMaterial;
pub use options::{StreamOptions, StreamSummary};
pub use state::{Chunk, ChunkFlag, StreamState};

/// Size of a stream key in bytes (256-bit)
pub const KEY_LEN: usize = 32;

/// Size of the clear-text stream header
pub const HEADER_LEN: usize = 24;

/// Size of an XChaCha20-Poly1305 nonce (192-bit)
pub const NONCE_LEN: usize = 24;

/// Size of a Poly1305 authentication tag
pub const MAC_LEN: usize = 16;

/// Per-chunk overhead on the wire: encrypted flag byte + Poly1305 tag
pub const TAG_LEN: usize = 1 + MAC_LEN;

/// Default plaintext bytes per chunk
pub const CHUNK_SIZE: usize = 4096;

/// Upper bound for a configured chunk size (16 MiB)
pub const MAX_CHUNK_SIZE: usize = 16 * 1024 * 1024;
