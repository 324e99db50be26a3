//! Pull side: header, then open chunks until the `Final` one
//!
//! Plaintext is only handed out after its chunk authenticates and the
//! termination rules hold:
//! - a `Final` chunk must be followed by end of input
//! - a non-final chunk must be followed by more input
//!
//! Chunks carry no length, so only a full-size `Final` chunk can be told apart
//! from bytes after it. Junk behind a short `Final` chunk is read as part of
//! that chunk and fails authentication instead.
//!
//! The first failure moves the decryptor to `Failed` for good.

use std::io::{BufRead, BufReader, Read, Write};

use tracing::debug;
use zeroize::Zeroize;

use crate::error::{StreamError, StreamResult};
use crate::io::read_full;
use crate::key::KeyMaterial;
use crate::options::{StreamOptions, StreamSummary};
use crate::state::{Chunk, StreamState};
use crate::{HEADER_LEN, TAG_LEN};

/// Where a [`Decryptor`] is in its stream. [`Decryptor::start`] reads the
/// header, so a live decryptor starts out `Streaming`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecryptorPhase {
    Streaming,
    Done,
    Failed,
}

pub struct Decryptor<R: Read> {
    source: BufReader<R>,
    state: StreamState,
    buf: Vec<u8>,
    phase: DecryptorPhase,
    summary: StreamSummary,
}

impl<R: Read> Decryptor<R> {
    pub fn start(key: &KeyMaterial, source: R) -> StreamResult<Self> {
        Self::start_with(key, source, StreamOptions::default())
    }

    /// Read the header and derive the stream state.
    ///
    /// `options.chunk_size` must match the encrypting side.
    pub fn start_with(key: &KeyMaterial, source: R, options: StreamOptions) -> StreamResult<Self> {
        options.validate()?;
        let block = options.chunk_size + TAG_LEN;
        let mut source = BufReader::with_capacity(block, source);

        let mut header = [0u8; HEADER_LEN];
        let got = read_full(&mut source, &mut header)?;
        if got < HEADER_LEN {
            return Err(StreamError::TruncatedHeader {
                got,
                expected: HEADER_LEN,
            });
        }
        let state = StreamState::init_for_decrypt(key, &header)?;

        debug!(chunk_size = options.chunk_size, "decrypt stream started");

        Ok(Self {
            source,
            state,
            buf: vec![0u8; block],
            phase: DecryptorPhase::Streaming,
            summary: StreamSummary::default(),
        })
    }

    pub fn phase(&self) -> DecryptorPhase {
        self.phase
    }

    pub fn summary(&self) -> StreamSummary {
        self.summary
    }

    /// Next authenticated chunk, or `None` once the `Final` chunk was returned.
    pub fn next_chunk(&mut self) -> StreamResult<Option<Chunk>> {
        match self.phase {
            DecryptorPhase::Done => return Ok(None),
            DecryptorPhase::Failed => return Err(StreamError::StreamFailed),
            DecryptorPhase::Streaming => {}
        }

        match self.pull() {
            Ok(chunk) => {
                self.summary.chunks += 1;
                self.summary.bytes += chunk.data.len() as u64;
                if chunk.flag.is_final() {
                    self.phase = DecryptorPhase::Done;
                    debug!(
                        chunks = self.summary.chunks,
                        bytes = self.summary.bytes,
                        "decrypt stream finished"
                    );
                }
                Ok(Some(chunk))
            }
            Err(e) => {
                self.phase = DecryptorPhase::Failed;
                debug!(chunks = self.summary.chunks, error = %e, "decrypt stream failed");
                Err(e)
            }
        }
    }

    fn pull(&mut self) -> StreamResult<Chunk> {
        let n = read_full(&mut self.source, &mut self.buf)?;
        if n == 0 {
            return Err(StreamError::PrematureEnd {
                chunks: self.state.position(),
            });
        }

        let mut chunk = self.state.open(&self.buf[..n], &[])?;
        let exhausted = self.source.fill_buf()?.is_empty();

        match (chunk.flag.is_final(), exhausted) {
            (true, false) => {
                chunk.data.zeroize();
                Err(StreamError::UnexpectedDataAfterFinal {
                    chunk: self.state.position() - 1,
                })
            }
            (false, true) => {
                chunk.data.zeroize();
                Err(StreamError::PrematureEnd {
                    chunks: self.state.position(),
                })
            }
            _ => Ok(chunk),
        }
    }

    /// Decrypt the rest of the stream into `sink`.
    ///
    /// Chunks that were written before a failure were authentic, but the
    /// stream as a whole was not; callers should discard the output on error.
    pub fn decrypt_to<W: Write>(&mut self, mut sink: W) -> StreamResult<StreamSummary> {
        while let Some(mut chunk) = self.next_chunk()? {
            let written = sink.write_all(&chunk.data);
            chunk.data.zeroize();
            if let Err(e) = written {
                self.phase = DecryptorPhase::Failed;
                return Err(e.into());
            }
        }
        sink.flush()?;
        Ok(self.summary)
    }
}

impl<R: Read> std::fmt::Debug for Decryptor<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decryptor")
            .field("phase", &self.phase)
            .field("summary", &self.summary)
            .finish_non_exhaustive()
    }
}

/// Decrypt `source` into `sink` with default options.
pub fn decrypt_stream<R: Read, W: Write>(
    key: &KeyMaterial,
    source: R,
    sink: W,
) -> StreamResult<StreamSummary> {
    decrypt_stream_with(key, source, sink, StreamOptions::default())
}

pub fn decrypt_stream_with<R: Read, W: Write>(
    key: &KeyMaterial,
    source: R,
    sink: W,
    options: StreamOptions,
) -> StreamResult<StreamSummary> {
    Decryptor::start_with(key, source, options)?.decrypt_to(sink)
}

/// Decrypt a complete in-memory stream.
///
/// Returns plaintext only if every chunk authenticated and the stream ended
/// properly; otherwise nothing.
pub fn decrypt_to_vec(key: &KeyMaterial, ciphertext: &[u8]) -> StreamResult<Vec<u8>> {
    let mut out = Vec::with_capacity(ciphertext.len());
    let mut decryptor = Decryptor::start(key, ciphertext)?;
    if let Err(e) = decryptor.decrypt_to(&mut out) {
        out.zeroize();
        return Err(e);
    }
    Ok(out)
}
