//! Push side: header, then one sealed chunk per plaintext chunk
//!
//! The last chunk is found with a one-read lookahead, so an input whose length
//! is an exact multiple of the chunk size does not get a trailing empty chunk.
//! Empty input still yields one (empty) `Final` chunk.

use std::io::{BufRead, BufReader, Read, Write};

use tracing::debug;
use zeroize::Zeroize;

use crate::error::{StreamError, StreamResult};
use crate::header::StreamHeader;
use crate::io::read_full;
use crate::key::KeyMaterial;
use crate::options::{StreamOptions, StreamSummary};
use crate::state::{ChunkFlag, StreamState};
use crate::{HEADER_LEN, TAG_LEN};

/// Where an [`Encryptor`] is in its stream. [`Encryptor::start`] performs the
/// initial header step, so a live encryptor is never observed before it.
///
/// `Failed` is terminal: once a read, seal or write has gone wrong the sink
/// holds an unknown prefix of the stream, and sealing a `Final` chunk after
/// it would turn that prefix into a stream that verifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncryptorPhase {
    Streaming,
    Done,
    Failed,
}

pub struct Encryptor<W: Write> {
    sink: W,
    state: StreamState,
    options: StreamOptions,
    phase: EncryptorPhase,
    summary: StreamSummary,
}

impl<W: Write> Encryptor<W> {
    pub fn start(key: &KeyMaterial, sink: W) -> StreamResult<Self> {
        Self::start_with(key, sink, StreamOptions::default())
    }

    /// Generate a header, derive the stream state, and write the header.
    pub fn start_with(key: &KeyMaterial, mut sink: W, options: StreamOptions) -> StreamResult<Self> {
        options.validate()?;
        let header = StreamHeader::generate()?;
        let state = StreamState::init_for_encrypt(key, &header)?;
        sink.write_all(header.as_bytes())?;

        debug!(
            chunk_size = options.chunk_size,
            rekey_interval = options.rekey_interval,
            "encrypt stream started"
        );

        Ok(Self {
            sink,
            state,
            options,
            phase: EncryptorPhase::Streaming,
            summary: StreamSummary::default(),
        })
    }

    pub fn phase(&self) -> EncryptorPhase {
        self.phase
    }

    pub fn summary(&self) -> StreamSummary {
        self.summary
    }

    /// Seal and write one chunk. `last` marks it `Final` and ends the stream.
    ///
    /// Chunks carry no length on the wire, so every non-final chunk must be
    /// exactly `chunk_size` bytes; the final one may be shorter.
    pub fn seal_chunk(&mut self, data: &[u8], last: bool) -> StreamResult<()> {
        self.check_streaming()?;
        let chunk_size = self.options.chunk_size;
        if data.len() > chunk_size {
            return Err(StreamError::ChunkTooLarge {
                len: data.len(),
                max: chunk_size,
            });
        }
        if !last && data.len() != chunk_size {
            return Err(StreamError::ShortChunk {
                len: data.len(),
                expected: chunk_size,
            });
        }

        if let Err(e) = self.write_chunk(data, last) {
            self.phase = EncryptorPhase::Failed;
            return Err(e);
        }
        Ok(())
    }

    /// Encrypt everything `source` yields, finishing the stream.
    ///
    /// Any error leaves the encryptor `Failed`.
    pub fn encrypt_from<R: Read>(&mut self, source: R) -> StreamResult<()> {
        self.check_streaming()?;

        let chunk_size = self.options.chunk_size;
        let mut source = BufReader::with_capacity(chunk_size, source);
        let mut buf = vec![0u8; chunk_size];

        let result: StreamResult<()> = loop {
            let n = match read_full(&mut source, &mut buf) {
                Ok(n) => n,
                Err(e) => break Err(e.into()),
            };
            let last = if n < chunk_size {
                true
            } else {
                match source.fill_buf() {
                    Ok(rest) => rest.is_empty(),
                    Err(e) => break Err(e.into()),
                }
            };
            if let Err(e) = self.seal_chunk(&buf[..n], last) {
                break Err(e);
            }
            if last {
                break Ok(());
            }
        };

        buf.zeroize();
        if result.is_err() {
            self.phase = EncryptorPhase::Failed;
        }
        result
    }

    /// End the stream and hand back the sink.
    ///
    /// If no `Final` chunk was written yet, an empty one is sealed first. A
    /// failed encryptor refuses, so an aborted stream never gets a `Final`.
    pub fn finish(mut self) -> StreamResult<(W, StreamSummary)> {
        match self.phase {
            EncryptorPhase::Failed => return Err(StreamError::StreamFailed),
            EncryptorPhase::Streaming => self.seal_chunk(&[], true)?,
            EncryptorPhase::Done => {}
        }
        self.sink.flush()?;
        Ok((self.sink, self.summary))
    }

    fn check_streaming(&self) -> StreamResult<()> {
        match self.phase {
            EncryptorPhase::Streaming => Ok(()),
            EncryptorPhase::Done => Err(StreamError::StreamFinished),
            EncryptorPhase::Failed => Err(StreamError::StreamFailed),
        }
    }

    fn write_chunk(&mut self, data: &[u8], last: bool) -> StreamResult<()> {
        let flag = if last {
            ChunkFlag::Final
        } else if self.rekey_due() {
            ChunkFlag::Rekey
        } else {
            ChunkFlag::Message
        };

        let sealed = self.state.seal(data, flag, &[])?;
        self.sink.write_all(&sealed)?;
        self.summary.chunks += 1;
        self.summary.bytes += data.len() as u64;

        if last {
            self.phase = EncryptorPhase::Done;
            debug!(
                chunks = self.summary.chunks,
                bytes = self.summary.bytes,
                "encrypt stream finished"
            );
        }
        Ok(())
    }

    fn rekey_due(&self) -> bool {
        let interval = self.options.rekey_interval;
        interval != 0 && (self.state.position() + 1) % interval == 0
    }
}

/// Encrypt `source` into `sink` with default options.
pub fn encrypt_stream<R: Read, W: Write>(
    key: &KeyMaterial,
    source: R,
    sink: W,
) -> StreamResult<StreamSummary> {
    encrypt_stream_with(key, source, sink, StreamOptions::default())
}

pub fn encrypt_stream_with<R: Read, W: Write>(
    key: &KeyMaterial,
    source: R,
    sink: W,
    options: StreamOptions,
) -> StreamResult<StreamSummary> {
    let mut encryptor = Encryptor::start_with(key, sink, options)?;
    encryptor.encrypt_from(source)?;
    let (_, summary) = encryptor.finish()?;
    Ok(summary)
}

/// Encrypt an in-memory buffer into a complete stream.
pub fn encrypt_to_vec(key: &KeyMaterial, plaintext: &[u8]) -> StreamResult<Vec<u8>> {
    let chunks = plaintext.len() / crate::CHUNK_SIZE + 1;
    let sink = Vec::with_capacity(HEADER_LEN + plaintext.len() + chunks * TAG_LEN);
    let mut encryptor = Encryptor::start(key, sink)?;
    encryptor.encrypt_from(plaintext)?;
    let (out, _) = encryptor.finish()?;
    Ok(out)
}
