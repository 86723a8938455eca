//! Outbound stream transport state machine

use shared_protocol::{EncodedPacket, VideoCodec, native_to_90k};
use tracing::{debug, info, warn};

use crate::{
    MuxerBackend, OutboundFrame, TrackParams, TransportConfig, TransportError, TransportResult,
};

/// Transport connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Closed,
    Opening,
    HeaderWritten,
}

/// Transport statistics
#[derive(Debug, Clone, Default)]
pub struct TransportStats {
    pub open_attempts: u64,
    pub opens: u64,
    pub open_failures: u64,
    pub packets_sent: u64,
    pub bytes_sent: u64,
    pub write_failures: u64,
    pub trailers_written: u64,
}

/// One outbound connection carrying a single video track
///
/// Frames are only handed to the muxer once the header has been written.
/// Any failure leaves the transport `Closed`; reopening is the caller's
/// decision.
pub struct StreamTransport {
    muxer: Box<dyn MuxerBackend>,
    config: TransportConfig,
    state: TransportState,
    destination: String,
    stats: TransportStats,
}

impl StreamTransport {
    pub fn new(muxer: Box<dyn MuxerBackend>, config: TransportConfig) -> Self {
        Self {
            muxer,
            config,
            state: TransportState::Closed,
            destination: String::new(),
            stats: TransportStats::default(),
        }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == TransportState::HeaderWritten
    }

    pub fn stats(&self) -> TransportStats {
        self.stats.clone()
    }

    /// Connect and write the header
    ///
    /// An open transport is closed first. On failure everything partially
    /// built is released before returning.
    pub fn open(
        &mut self,
        destination: &str,
        width: u32,
        height: u32,
        codec: VideoCodec,
    ) -> TransportResult<()> {
        self.close();
        self.stats.open_attempts += 1;

        if destination.is_empty() {
            self.stats.open_failures += 1;
            return Err(TransportError::InvalidDestination(destination.to_string()));
        }

        self.state = TransportState::Opening;
        let track = TrackParams::new(codec, width, height);

        let result = self
            .muxer
            .prepare(destination, &track, &self.config)
            .and_then(|_| self.muxer.write_header(&self.config));

        match result {
            Ok(()) => {
                self.state = TransportState::HeaderWritten;
                self.destination = destination.to_string();
                self.stats.opens += 1;
                info!(
                    "{} output open: {} ({}x{} {})",
                    self.muxer.name(),
                    destination,
                    width,
                    height,
                    codec
                );
                Ok(())
            }
            Err(e) => {
                warn!("{} output open failed for {}: {}", self.muxer.name(), destination, e);
                self.muxer.release();
                self.state = TransportState::Closed;
                self.stats.open_failures += 1;
                Err(e)
            }
        }
    }

    /// Write one encoded packet
    ///
    /// Native-tick timestamps become 90 kHz pts/dts; packets without a
    /// positive timestamp go out untimed. A write failure does not close
    /// the transport, the caller closes and reopens.
    pub fn send(&mut self, packet: &EncodedPacket) -> TransportResult<()> {
        if self.state != TransportState::HeaderWritten {
            return Err(TransportError::NotOpen);
        }

        let ts = packet.timestamp.filter(|t| *t > 0).map(native_to_90k);
        let frame = OutboundFrame {
            data: &packet.data,
            pts: ts,
            dts: ts,
            keyframe: packet.is_keyframe,
        };

        match self.muxer.write_frame(&frame) {
            Ok(()) => {
                self.stats.packets_sent += 1;
                self.stats.bytes_sent += packet.len() as u64;
                Ok(())
            }
            Err(e) => {
                self.stats.write_failures += 1;
                Err(e)
            }
        }
    }

    /// Finish and release the output; no-op when already closed
    pub fn close(&mut self) {
        if self.state == TransportState::Closed {
            return;
        }

        if self.state == TransportState::HeaderWritten {
            match self.muxer.write_trailer() {
                Ok(()) => self.stats.trailers_written += 1,
                Err(e) => debug!("Trailer write failed: {}", e),
            }
        }

        self.muxer.release();
        self.state = TransportState::Closed;
        debug!("{} output closed: {}", self.muxer.name(), self.destination);
        self.destination.clear();
    }
}

impl Drop for StreamTransport {
    fn drop(&mut self) {
        self.close();
    }
}
