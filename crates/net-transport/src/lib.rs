//! Network Transport - outbound stream output for NVRTSP
//!
//! Wraps one container/protocol muxer per stream behind a small
//! open/send/close state machine. The FFmpeg backend pushes the encoded
//! bitstream to an RTSP server over interleaved TCP.

mod config;
mod error;
mod muxer;
mod transport;

#[cfg(all(target_os = "windows", feature = "ffmpeg"))]
mod ffmpeg;

pub use config::*;
pub use error::*;
pub use muxer::*;
pub use transport::*;

#[cfg(all(target_os = "windows", feature = "ffmpeg"))]
pub use ffmpeg::FfmpegMuxer;

/// Create the muxer backend available in this build
pub fn create_muxer() -> TransportResult<Box<dyn MuxerBackend>> {
    #[cfg(all(target_os = "windows", feature = "ffmpeg"))]
    {
        Ok(Box::new(FfmpegMuxer::new()))
    }

    #[cfg(not(all(target_os = "windows", feature = "ffmpeg")))]
    {
        Err(TransportError::UnsupportedPlatform)
    }
}
