//! Encoder error types

use capture::CaptureError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EncoderError {
    #[error("Encoder API load failed: {0}")]
    ApiLoad(String),

    #[error("Encode session open failed: {0}")]
    SessionOpen(String),

    #[error("Preset query failed: {0}")]
    Preset(String),

    #[error("Encoder initialization failed: {0}")]
    InitFailed(String),

    #[error("Bitstream buffer allocation failed: {0}")]
    BufferAlloc(String),

    #[error("Resource registration failed: {0}")]
    Registration(String),

    #[error("Input mapping failed: {0}")]
    Map(String),

    #[error("Picture submission failed: {0}")]
    Submit(String),

    #[error("Bitstream lock failed: {0}")]
    Lock(String),

    #[error("Encoder not initialized")]
    NotInitialized,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Hardware encoder not available on this platform")]
    UnsupportedPlatform,

    #[error("Texture adaptation failed: {0}")]
    Adapter(#[from] CaptureError),
}

pub type EncoderResult<T> = Result<T, EncoderError>;
