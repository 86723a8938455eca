//! Hardware video encoder for NVRTSP
//!
//! Provides the per-stream encoder session and its backends:
//! - Codec policy tables for H.264 and HEVC
//! - NVENC (NVIDIA hardware, Direct3D 11 input)

mod codec;
mod config;
mod error;
mod session;
mod traits;

#[cfg(all(target_os = "windows", feature = "nvenc"))]
mod nvenc;

pub use codec::*;
pub use config::*;
pub use error::*;
pub use session::*;
pub use traits::*;

#[cfg(all(target_os = "windows", feature = "nvenc"))]
pub use nvenc::NvencBackend;

/// Create the hardware encoder backend available on this platform
pub fn create_backend() -> EncoderResult<Box<dyn EncoderBackend>> {
    #[cfg(all(target_os = "windows", feature = "nvenc"))]
    {
        Ok(Box::new(NvencBackend::new()))
    }

    #[cfg(not(all(target_os = "windows", feature = "nvenc")))]
    {
        Err(EncoderError::UnsupportedPlatform)
    }
}
