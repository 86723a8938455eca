//! Packet and codec definitions passed from the encoder to the transport

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{ProtocolError, ProtocolResult};

/// Video codec family
///
/// The discriminants match the selector values accepted by the C ABI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(i32)]
pub enum VideoCodec {
    /// H.264 / AVC
    H264 = 0,
    /// H.265 / HEVC
    #[serde(alias = "h265")]
    Hevc = 1,
}

impl VideoCodec {
    /// Decode a raw codec selector
    pub fn from_raw(raw: i32) -> ProtocolResult<Self> {
        match raw {
            0 => Ok(Self::H264),
            1 => Ok(Self::Hevc),
            other => Err(ProtocolError::InvalidCodec(other)),
        }
    }

    /// Short human readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::H264 => "H.264",
            Self::Hevc => "HEVC",
        }
    }
}

impl Default for VideoCodec {
    fn default() -> Self {
        Self::H264
    }
}

impl std::fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One compressed access unit produced by the encoder
///
/// Ownership moves to the transport once emitted; the encoder keeps no
/// reference to the bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPacket {
    /// Annex-B byte stream
    pub data: Bytes,
    /// Whether the packet carries an IDR unit
    pub is_keyframe: bool,
    /// Capture time in native 100ns ticks, `None` for flushed tail packets
    pub timestamp: Option<i64>,
}

impl EncodedPacket {
    pub fn new(data: impl Into<Bytes>, is_keyframe: bool, timestamp: Option<i64>) -> Self {
        Self {
            data: data.into(),
            is_keyframe,
            timestamp,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_from_raw() {
        assert_eq!(VideoCodec::from_raw(0).unwrap(), VideoCodec::H264);
        assert_eq!(VideoCodec::from_raw(1).unwrap(), VideoCodec::Hevc);
        assert!(matches!(
            VideoCodec::from_raw(7),
            Err(ProtocolError::InvalidCodec(7))
        ));
    }

    #[test]
    fn test_codec_serde_names() {
        let codec: VideoCodec = serde_json::from_str("\"h265\"").unwrap();
        assert_eq!(codec, VideoCodec::Hevc);
        assert_eq!(serde_json::to_string(&VideoCodec::H264).unwrap(), "\"h264\"");
    }
}
