use thiserror::Error;

pub type StreamResult<T> = Result<T, StreamError>;

/// Everything that can end a stream.
///
/// Every variant is terminal for the stream that produced it; nothing here is
/// retried internally.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("secure random source unavailable: {0}")]
    EntropyUnavailable(#[source] rand::Error),

    #[error("malformed stream header: {0}")]
    MalformedHeader(String),

    #[error("stream ended inside the header: got {got} of {expected} bytes")]
    TruncatedHeader { got: usize, expected: usize },

    #[error("chunk {chunk} failed authentication: wrong key, corrupted or reordered data")]
    AuthenticationFailure { chunk: u64 },

    #[error("stream ended after {chunks} chunks without a final chunk")]
    PrematureEnd { chunks: u64 },

    #[error("data follows the final chunk (chunk {chunk})")]
    UnexpectedDataAfterFinal { chunk: u64 },

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("invalid key length: {actual} bytes (expected {expected})")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("invalid chunk size {0} (must be 1..={max})", max = crate::MAX_CHUNK_SIZE)]
    InvalidChunkSize(usize),

    #[error("chunk of {len} bytes exceeds the maximum of {max}")]
    ChunkTooLarge { len: usize, max: usize },

    #[error("non-final chunk of {len} bytes must be exactly {expected} bytes")]
    ShortChunk { len: usize, expected: usize },

    #[error("stream already finished")]
    StreamFinished,

    #[error("stream already failed")]
    StreamFailed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StreamError {
    /// True for failures that mean the ciphertext cannot be trusted, as
    /// opposed to I/O, entropy or API-misuse failures.
    pub fn is_integrity_failure(&self) -> bool {
        matches!(
            self,
            StreamError::MalformedHeader(_)
                | StreamError::TruncatedHeader { .. }
                | StreamError::AuthenticationFailure { .. }
                | StreamError::PrematureEnd { .. }
                | StreamError::UnexpectedDataAfterFinal { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integrity_failures_classified() {
        assert!(StreamError::AuthenticationFailure { chunk: 3 }.is_integrity_failure());
        assert!(StreamError::PrematureEnd { chunks: 1 }.is_integrity_failure());
        assert!(StreamError::UnexpectedDataAfterFinal { chunk: 0 }.is_integrity_failure());
        assert!(StreamError::TruncatedHeader {
            got: 4,
            expected: crate::HEADER_LEN
        }
        .is_integrity_failure());

        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        assert!(!StreamError::Io(io).is_integrity_failure());
        assert!(!StreamError::StreamFailed.is_integrity_failure());
        assert!(!StreamError::ShortChunk { len: 3, expected: 4096 }.is_integrity_failure());
    }
}
