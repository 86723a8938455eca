//! Error types for the shared definitions

use thiserror::Error;

/// Protocol error
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid codec selector: {0}")]
    InvalidCodec(i32),

    #[error("Invalid frame geometry: {width}x{height}")]
    InvalidGeometry { width: u32, height: u32 },

    #[error("Frame rate must be non-zero")]
    InvalidFrameRate,

    #[error("Bitrate must be non-zero")]
    InvalidBitrate,

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Unknown RTSP lower transport: {0}")]
    InvalidLowerTransport(String),
}

/// Result type alias for protocol operations
pub type ProtocolResult<T> = Result<T, ProtocolError>;
