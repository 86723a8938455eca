//! Codec policy tables
//!
//! Each codec family is a static table of plain functions: one that
//! adjusts the preset, one that classifies a unit header.

use shared_protocol::VideoCodec;

use crate::{CodecSettings, PresetConfig};

/// Per-codec configuration and bitstream inspection
pub struct CodecPolicy {
    pub codec: VideoCodec,
    /// Bytes of unit header that must follow a start code
    pub header_len: usize,
    configure: fn(&mut PresetConfig, u32),
    is_idr_header: fn(&[u8]) -> bool,
}

static H264_POLICY: CodecPolicy = CodecPolicy {
    codec: VideoCodec::H264,
    header_len: 1,
    configure: configure_h264,
    is_idr_header: h264_is_idr,
};

static HEVC_POLICY: CodecPolicy = CodecPolicy {
    codec: VideoCodec::Hevc,
    header_len: 2,
    configure: configure_hevc,
    is_idr_header: hevc_is_idr,
};

/// Policy table for a codec
pub fn policy_for(codec: VideoCodec) -> &'static CodecPolicy {
    match codec {
        VideoCodec::H264 => &H264_POLICY,
        VideoCodec::Hevc => &HEVC_POLICY,
    }
}

/// Whether an Annex-B packet contains an IDR unit
pub fn packet_is_keyframe(codec: VideoCodec, data: &[u8]) -> bool {
    policy_for(codec).packet_is_keyframe(data)
}

impl CodecPolicy {
    /// Apply the pipeline's fixed structure to a preset
    ///
    /// One keyframe per second, a single reference frame, no B frames and
    /// parameter sets repeated in front of every keyframe.
    pub fn configure(&self, preset: &mut PresetConfig, fps: u32) {
        preset.gop_length = fps;
        preset.frame_interval_p = 1;
        (self.configure)(preset, fps);
    }

    pub fn packet_is_keyframe(&self, data: &[u8]) -> bool {
        let n = data.len();
        let mut i = 0;

        while i + 4 < n {
            while i + 4 < n && start_code_len(data, i).is_none() {
                i += 1;
            }
            let Some(len) = start_code_len(data, i) else {
                break;
            };

            let unit = i + len;
            if unit + self.header_len > n {
                break;
            }
            if (self.is_idr_header)(&data[unit..]) {
                return true;
            }

            i = unit + 1;
        }

        false
    }
}

/// Length of the start code at `pos`, if any
///
/// A start code needs at least one byte after it inside the buffer.
fn start_code_len(data: &[u8], pos: usize) -> Option<usize> {
    let n = data.len();
    if pos + 3 >= n {
        return None;
    }
    if data[pos] == 0 && data[pos + 1] == 0 && data[pos + 2] == 1 {
        return Some(3);
    }
    if pos + 4 <= n && data[pos..pos + 4] == [0, 0, 0, 1] {
        return Some(4);
    }
    None
}

fn h264_is_idr(header: &[u8]) -> bool {
    header[0] & 0x1F == 5
}

fn hevc_is_idr(header: &[u8]) -> bool {
    let unit_type = (header[0] & 0x7E) >> 1;
    // IDR_W_RADL, IDR_N_LP
    unit_type == 19 || unit_type == 20
}

fn configure_h264(preset: &mut PresetConfig, fps: u32) {
    if !matches!(preset.codec, CodecSettings::H264(_)) {
        preset.codec = CodecSettings::default_for(VideoCodec::H264);
    }
    if let CodecSettings::H264(settings) = &mut preset.codec {
        settings.idr_period = fps;
        settings.repeat_sps_pps = true;
        settings.output_aud = false;
        settings.disable_sps_pps = false;
        settings.enable_intra_refresh = false;
        settings.max_num_ref_frames = 1;
        settings.bdirect_disabled = true;
        settings.bframes_as_ref_disabled = true;
    }
}

fn configure_hevc(preset: &mut PresetConfig, fps: u32) {
    if !matches!(preset.codec, CodecSettings::Hevc(_)) {
        preset.codec = CodecSettings::default_for(VideoCodec::Hevc);
    }
    if let CodecSettings::Hevc(settings) = &mut preset.codec {
        settings.idr_period = fps;
        settings.repeat_sps_pps = true;
        settings.output_aud = false;
        settings.disable_sps_pps = false;
        settings.enable_intra_refresh = false;
        settings.max_num_ref_frames_in_dpb = 1;
        settings.bframes_as_ref_disabled = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_h264_idr_detected() {
        let four_byte = [0, 0, 0, 1, 0x65, 0x88, 0x84];
        let three_byte = [0, 0, 1, 0x65, 0x88];
        assert!(packet_is_keyframe(VideoCodec::H264, &four_byte));
        assert!(packet_is_keyframe(VideoCodec::H264, &three_byte));
    }

    #[test]
    fn test_h264_idr_after_parameter_sets() {
        let data = [
            0, 0, 0, 1, 0x67, 0x42, 0x00, 0x1F, // SPS
            0, 0, 0, 1, 0x68, 0xCE, 0x3C, 0x80, // PPS
            0, 0, 1, 0x65, 0x88, 0x84, // IDR slice
        ];
        assert!(packet_is_keyframe(VideoCodec::H264, &data));
    }

    #[test]
    fn test_h264_non_idr() {
        let data = [0, 0, 0, 1, 0x41, 0x9A, 0x02, 0, 0, 1, 0x01, 0x22];
        assert!(!packet_is_keyframe(VideoCodec::H264, &data));
    }

    #[test]
    fn test_hevc_idr_detected() {
        let idr_w_radl = [0, 0, 0, 1, 0x26, 0x01, 0xAF];
        let idr_n_lp = [0, 0, 1, 0x28, 0x01, 0xAF];
        assert!(packet_is_keyframe(VideoCodec::Hevc, &idr_w_radl));
        assert!(packet_is_keyframe(VideoCodec::Hevc, &idr_n_lp));
    }

    #[test]
    fn test_hevc_non_idr() {
        // VPS, then TRAIL_R
        let data = [0, 0, 0, 1, 0x40, 0x01, 0x0C, 0, 0, 0, 1, 0x02, 0x01, 0xD0];
        assert!(!packet_is_keyframe(VideoCodec::Hevc, &data));
    }

    #[test]
    fn test_hevc_needs_full_header() {
        // IDR type in the first header byte but the second byte is missing
        let data = [0, 0, 0, 0, 1, 0x26];
        assert!(!packet_is_keyframe(VideoCodec::Hevc, &data));
    }

    #[test]
    fn test_short_buffers() {
        for codec in [VideoCodec::H264, VideoCodec::Hevc] {
            assert!(!packet_is_keyframe(codec, &[]));
            assert!(!packet_is_keyframe(codec, &[0]));
            assert!(!packet_is_keyframe(codec, &[0, 0, 1]));
            assert!(!packet_is_keyframe(codec, &[0, 0, 1, 0x65]));
        }
    }

    #[test]
    fn test_no_start_code() {
        let data = [0x65; 32];
        assert!(!packet_is_keyframe(VideoCodec::H264, &data));
    }

    #[test]
    fn test_configure_h264() {
        let mut preset = PresetConfig::new(VideoCodec::H264);
        preset.frame_interval_p = 3;
        policy_for(VideoCodec::H264).configure(&mut preset, 30);

        assert_eq!(preset.gop_length, 30);
        assert_eq!(preset.frame_interval_p, 1);
        let CodecSettings::H264(h264) = preset.codec else {
            panic!("expected H.264 settings");
        };
        assert_eq!(h264.idr_period, 30);
        assert_eq!(h264.max_num_ref_frames, 1);
        assert!(h264.repeat_sps_pps);
        assert!(h264.bdirect_disabled);
        assert!(h264.bframes_as_ref_disabled);
        assert!(!h264.enable_intra_refresh);
    }

    #[test]
    fn test_configure_hevc_replaces_mismatched_settings() {
        let mut preset = PresetConfig::new(VideoCodec::H264);
        policy_for(VideoCodec::Hevc).configure(&mut preset, 60);

        let CodecSettings::Hevc(hevc) = preset.codec else {
            panic!("expected HEVC settings");
        };
        assert_eq!(hevc.idr_period, 60);
        assert_eq!(hevc.max_num_ref_frames_in_dpb, 1);
        assert!(hevc.repeat_sps_pps);
        assert!(hevc.bframes_as_ref_disabled);
    }
}
