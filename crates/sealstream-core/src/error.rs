use thiserror::Error;

use sealstream_crypto::StreamError;

pub type SealResult<T> = Result<T, SealError>;

#[derive(Debug, Error)]
pub enum SealError {
    #[error("config error: {0}")]
    Config(String),

    #[error("key file error: {0}")]
    KeyFile(String),

    #[error("input error: {0}")]
    Input(String),

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
