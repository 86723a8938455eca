//! Capture error types

use thiserror::Error;

use crate::TextureFormat;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Source texture is null")]
    NullTexture,

    #[error("Graphics device not available")]
    DeviceUnavailable,

    #[error(
        "Unsupported resource layout: {samples} samples, {array_size} layers, {mip_levels} mips"
    )]
    UnsupportedResourceLayout {
        samples: u32,
        array_size: u32,
        mip_levels: u32,
    },

    #[error("Unsupported texture format: {0:?}")]
    UnsupportedFormat(TextureFormat),

    #[error("Texture allocation failed: {0}")]
    AllocationFailed(String),

    #[error("Platform not supported")]
    UnsupportedPlatform,

    #[error("Device error: {0}")]
    Device(String),
}

pub type CaptureResult<T> = Result<T, CaptureError>;
