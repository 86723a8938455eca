//! Transport error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Invalid destination: {0}")]
    InvalidDestination(String),

    #[error("Output format not found: {0}")]
    FormatNotFound(String),

    #[error("Open failed: {0}")]
    OpenFailed(String),

    #[error("Header write failed: {0}")]
    HeaderFailed(String),

    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Trailer write failed: {0}")]
    TrailerFailed(String),

    #[error("Header not written")]
    NotOpen,

    #[error("No muxer backend in this build")]
    UnsupportedPlatform,
}

pub type TransportResult<T> = Result<T, TransportError>;
