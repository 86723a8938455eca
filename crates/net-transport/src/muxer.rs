//! Muxer backend trait

use shared_protocol::{TRANSPORT_CLOCK_RATE, VideoCodec};

use crate::{TransportConfig, TransportResult};

/// The single video track declared on every connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackParams {
    pub codec: VideoCodec,
    pub width: u32,
    pub height: u32,
    /// Track timebase in Hz
    pub clock_rate: i64,
}

impl TrackParams {
    pub fn new(codec: VideoCodec, width: u32, height: u32) -> Self {
        Self {
            codec,
            width,
            height,
            clock_rate: TRANSPORT_CLOCK_RATE,
        }
    }
}

/// One frame ready for the wire, timestamps already in the track timebase
#[derive(Debug, Clone, Copy)]
pub struct OutboundFrame<'a> {
    pub data: &'a [u8],
    pub pts: Option<i64>,
    pub dts: Option<i64>,
    pub keyframe: bool,
}

/// Container/protocol writer driven by [`crate::StreamTransport`]
///
/// Calls arrive in the order `prepare`, `write_header`, any number of
/// `write_frame`, then `write_trailer`. `release` may come at any point and
/// must drop everything `prepare` allocated.
pub trait MuxerBackend: Send {
    /// Get backend name
    fn name(&self) -> &'static str;

    /// Allocate the output context and declare the video track
    fn prepare(
        &mut self,
        destination: &str,
        track: &TrackParams,
        config: &TransportConfig,
    ) -> TransportResult<()>;

    /// Perform the protocol handshake and write the container header
    fn write_header(&mut self, config: &TransportConfig) -> TransportResult<()>;

    /// Write one frame
    fn write_frame(&mut self, frame: &OutboundFrame<'_>) -> TransportResult<()>;

    /// Finish the container
    fn write_trailer(&mut self) -> TransportResult<()>;

    /// Release all output resources
    fn release(&mut self);
}
