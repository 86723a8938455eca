//! Stream error types

use encoder::EncoderError;
use net_transport::TransportError;
use shared_protocol::ProtocolError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("Invalid stream handle")]
    InvalidHandle,

    #[error("Source texture is null")]
    NullTexture,

    #[error("Stream already running")]
    AlreadyRunning,

    #[error("Invalid configuration: {0}")]
    Config(#[from] ProtocolError),

    #[error("Encoder error: {0}")]
    Encoder(#[from] EncoderError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Failed to spawn worker: {0}")]
    Spawn(#[from] std::io::Error),
}

pub type StreamResult<T> = Result<T, StreamError>;
