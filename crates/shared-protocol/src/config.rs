//! Stream configuration

use serde::{Deserialize, Serialize};

use crate::{ProtocolError, ProtocolResult, VideoCodec};

/// RTSP lower transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LowerTransport {
    /// Interleaved over the RTSP TCP connection
    Tcp,
    /// Separate RTP/UDP ports
    Udp,
}

impl LowerTransport {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
        }
    }
}

impl Default for LowerTransport {
    fn default() -> Self {
        Self::Tcp
    }
}

impl std::str::FromStr for LowerTransport {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tcp" => Ok(Self::Tcp),
            "udp" => Ok(Self::Udp),
            _ => Err(ProtocolError::InvalidLowerTransport(s.to_string())),
        }
    }
}

/// Outbound transport tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportSettings {
    /// Container/protocol name handed to the muxer
    pub format: String,
    /// RTSP lower transport
    pub lower_transport: LowerTransport,
    /// Connect and socket IO timeout in milliseconds
    pub io_timeout_ms: u64,
    /// Maximum mux delay in microseconds (0 disables interleaving delay)
    pub mux_delay_us: u64,
    /// Initial mux preload in microseconds
    pub mux_preload_us: u64,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            format: "rtsp".to_string(),
            lower_transport: LowerTransport::Tcp,
            io_timeout_ms: 2000,
            mux_delay_us: 0,
            mux_preload_us: 0,
        }
    }
}

/// Per-stream configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Target frame rate
    pub fps: u32,
    /// Target bitrate in kbps
    pub bitrate_kbps: u32,
    /// Codec family
    pub codec: VideoCodec,
    /// Destination URL, e.g. `rtsp://host:8554/live`
    pub destination: String,
    /// Transport tuning
    pub transport: TransportSettings,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            fps: 30,
            bitrate_kbps: 4000,
            codec: VideoCodec::H264,
            destination: String::new(),
            transport: TransportSettings::default(),
        }
    }
}

impl StreamConfig {
    /// Parse a JSON document; missing fields take their defaults
    pub fn from_json(json: &str) -> ProtocolResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reject configurations no stream can run with
    pub fn validate(&self) -> ProtocolResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ProtocolError::InvalidGeometry {
                width: self.width,
                height: self.height,
            });
        }
        if self.fps == 0 {
            return Err(ProtocolError::InvalidFrameRate);
        }
        if self.bitrate_kbps == 0 {
            return Err(ProtocolError::InvalidBitrate);
        }
        if self.destination.trim().is_empty() {
            return Err(ProtocolError::MissingField("destination"));
        }
        Ok(())
    }

    /// Nominal frame interval
    pub fn frame_interval(&self) -> std::time::Duration {
        std::time::Duration::from_nanos(1_000_000_000 / u64::from(self.fps.max(1)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> StreamConfig {
        StreamConfig {
            width: 640,
            height: 480,
            fps: 30,
            bitrate_kbps: 2000,
            codec: VideoCodec::H264,
            destination: "rtsp://host/test".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate() {
        assert!(valid().validate().is_ok());
        assert!(StreamConfig::default().validate().is_err());

        let mut cfg = valid();
        cfg.height = 0;
        assert!(matches!(
            cfg.validate(),
            Err(ProtocolError::InvalidGeometry { width: 640, height: 0 })
        ));

        let mut cfg = valid();
        cfg.fps = 0;
        assert!(matches!(cfg.validate(), Err(ProtocolError::InvalidFrameRate)));

        let mut cfg = valid();
        cfg.bitrate_kbps = 0;
        assert!(matches!(cfg.validate(), Err(ProtocolError::InvalidBitrate)));
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let cfg = StreamConfig::from_json(
            r#"{"width":1280,"height":720,"codec":"hevc","destination":"rtsp://a/b",
                "transport":{"lower_transport":"udp"}}"#,
        )
        .unwrap();
        assert_eq!(cfg.width, 1280);
        assert_eq!(cfg.fps, 30);
        assert_eq!(cfg.codec, VideoCodec::Hevc);
        assert_eq!(cfg.transport.lower_transport, LowerTransport::Udp);
        assert_eq!(cfg.transport.io_timeout_ms, 2000);
        assert_eq!(cfg.transport.format, "rtsp");
    }

    #[test]
    fn test_frame_interval() {
        assert_eq!(valid().frame_interval().as_millis(), 33);

        let mut cfg = valid();
        cfg.fps = 60;
        assert_eq!(cfg.frame_interval().as_nanos(), 16_666_666);
    }

    #[test]
    fn test_lower_transport_parse() {
        assert_eq!("TCP".parse::<LowerTransport>().unwrap(), LowerTransport::Tcp);
        assert!("quic".parse::<LowerTransport>().is_err());
    }
}
