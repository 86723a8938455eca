//! Encoder and preset configuration

use shared_protocol::{StreamConfig, VideoCodec};

use crate::{EncoderError, EncoderResult};

/// Encoder configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderConfig {
    /// Target codec
    pub codec: VideoCodec,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Target FPS
    pub fps: u32,
    /// Target bitrate in kbps
    pub bitrate_kbps: u32,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            codec: VideoCodec::H264,
            width: 1920,
            height: 1080,
            fps: 30,
            bitrate_kbps: 4000,
        }
    }
}

impl EncoderConfig {
    pub fn validate(&self) -> EncoderResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(EncoderError::InvalidConfig(format!(
                "resolution {}x{}",
                self.width, self.height
            )));
        }
        if self.fps == 0 {
            return Err(EncoderError::InvalidConfig("fps is zero".to_string()));
        }
        if self.bitrate_kbps == 0 {
            return Err(EncoderError::InvalidConfig("bitrate is zero".to_string()));
        }
        Ok(())
    }
}

impl From<&StreamConfig> for EncoderConfig {
    fn from(config: &StreamConfig) -> Self {
        Self {
            codec: config.codec,
            width: config.width,
            height: config.height,
            fps: config.fps,
            bitrate_kbps: config.bitrate_kbps,
        }
    }
}

/// Rate control mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateControlMode {
    /// Constant QP
    ConstQp,
    /// Variable bitrate
    Vbr,
    /// Constant bitrate
    Cbr,
}

/// Rate control parameters, bitrates in bits/s
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateControlParams {
    pub mode: RateControlMode,
    pub average_bitrate: u32,
    pub max_bitrate: u32,
    pub vbv_buffer_size: u32,
    pub vbv_initial_delay: u32,
}

impl Default for RateControlParams {
    fn default() -> Self {
        Self {
            mode: RateControlMode::Vbr,
            average_bitrate: 0,
            max_bitrate: 0,
            vbv_buffer_size: 0,
            vbv_initial_delay: 0,
        }
    }
}

impl RateControlParams {
    /// Constant bitrate at `bitrate_kbps`
    pub fn apply_cbr(&mut self, bitrate_kbps: u32) {
        let bits = bitrate_kbps.saturating_mul(1000);
        self.mode = RateControlMode::Cbr;
        self.average_bitrate = bits;
        self.max_bitrate = bits;
        self.vbv_buffer_size = bits;
        self.vbv_initial_delay = bitrate_kbps.saturating_mul(500);
    }
}

/// H.264 fields the pipeline controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct H264Settings {
    pub idr_period: u32,
    pub max_num_ref_frames: u32,
    pub repeat_sps_pps: bool,
    pub output_aud: bool,
    pub disable_sps_pps: bool,
    pub enable_intra_refresh: bool,
    /// Direct prediction mode for B slices disabled
    pub bdirect_disabled: bool,
    /// B frames never used as references
    pub bframes_as_ref_disabled: bool,
}

/// HEVC fields the pipeline controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HevcSettings {
    pub idr_period: u32,
    pub max_num_ref_frames_in_dpb: u32,
    pub repeat_sps_pps: bool,
    pub output_aud: bool,
    pub disable_sps_pps: bool,
    pub enable_intra_refresh: bool,
    pub bframes_as_ref_disabled: bool,
}

/// Codec specific part of a preset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecSettings {
    H264(H264Settings),
    Hevc(HevcSettings),
}

impl CodecSettings {
    pub fn default_for(codec: VideoCodec) -> Self {
        match codec {
            VideoCodec::H264 => Self::H264(H264Settings::default()),
            VideoCodec::Hevc => Self::Hevc(HevcSettings::default()),
        }
    }
}

/// Encoder preset, as returned by the backend and adjusted before init
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresetConfig {
    /// Frames between keyframes
    pub gop_length: u32,
    /// Distance between P frames, 1 means no B frames
    pub frame_interval_p: i32,
    pub rate_control: RateControlParams,
    pub codec: CodecSettings,
}

impl PresetConfig {
    pub fn new(codec: VideoCodec) -> Self {
        Self {
            gop_length: 0,
            frame_interval_p: 1,
            rate_control: RateControlParams::default(),
            codec: CodecSettings::default_for(codec),
        }
    }
}
