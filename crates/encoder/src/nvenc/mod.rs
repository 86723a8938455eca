//! NVENC backend with Direct3D 11 input

mod ffi;

use std::ffi::c_void;

use capture::{ChannelOrder, EncodableTexture};
use shared_protocol::VideoCodec;
use tracing::{debug, info};

use crate::{
    BitstreamBuffer, CodecSettings, EncoderBackend, EncoderError, EncoderResult,
    InitializeParams, MappedInput, PictureParams, PresetConfig, RateControlMode,
    RateControlParams, RegisteredResource,
};
use ffi::*;

/// NVIDIA hardware encoder session
pub struct NvencBackend {
    library: Option<NvencLibrary>,
    encoder: *mut c_void,
    /// Raw preset as returned by the driver, overlaid at init
    preset: Option<Box<NV_ENC_CONFIG>>,
    /// Config handed to the driver at init; must outlive the session
    config: Option<Box<NV_ENC_CONFIG>>,
}

// SAFETY: the session handle is only used from the thread that currently
// owns the backend; NVENC sessions are not bound to a thread.
unsafe impl Send for NvencBackend {}

impl NvencBackend {
    pub fn new() -> Self {
        Self {
            library: None,
            encoder: std::ptr::null_mut(),
            preset: None,
            config: None,
        }
    }

    fn api(&self) -> EncoderResult<&NV_ENCODE_API_FUNCTION_LIST> {
        self.library
            .as_ref()
            .map(|lib| &lib.api)
            .ok_or(EncoderError::NotInitialized)
    }

    fn session(&self) -> EncoderResult<*mut c_void> {
        if self.encoder.is_null() {
            Err(EncoderError::NotInitialized)
        } else {
            Ok(self.encoder)
        }
    }
}

impl Default for NvencBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn missing(name: &str) -> String {
    format!("{name} missing from function table")
}

fn codec_guid(codec: VideoCodec) -> GUID {
    match codec {
        VideoCodec::H264 => NV_ENC_CODEC_H264_GUID,
        VideoCodec::Hevc => NV_ENC_CODEC_HEVC_GUID,
    }
}

fn buffer_format(order: ChannelOrder) -> u32 {
    match order {
        ChannelOrder::Abgr => NV_ENC_BUFFER_FORMAT_ABGR,
        ChannelOrder::Argb => NV_ENC_BUFFER_FORMAT_ARGB,
    }
}

fn read_preset(codec: VideoCodec, raw: &NV_ENC_CONFIG) -> PresetConfig {
    let rc = &raw.rc_params;
    let rate_control = RateControlParams {
        mode: match rc.rate_control_mode {
            NV_ENC_PARAMS_RC_CONSTQP => RateControlMode::ConstQp,
            NV_ENC_PARAMS_RC_CBR => RateControlMode::Cbr,
            _ => RateControlMode::Vbr,
        },
        average_bitrate: rc.average_bit_rate,
        max_bitrate: rc.max_bit_rate,
        vbv_buffer_size: rc.vbv_buffer_size,
        vbv_initial_delay: rc.vbv_initial_delay,
    };

    let union = &raw.encode_codec_config;
    let codec = match codec {
        VideoCodec::H264 => CodecSettings::H264(crate::H264Settings {
            idr_period: union.read_u32(h264::IDR_PERIOD),
            max_num_ref_frames: union.read_u32(h264::MAX_NUM_REF_FRAMES),
            repeat_sps_pps: union.read_bit(h264::FLAGS, h264::REPEAT_SPS_PPS_BIT),
            output_aud: union.read_bit(h264::FLAGS, h264::OUTPUT_AUD_BIT),
            disable_sps_pps: union.read_bit(h264::FLAGS, h264::DISABLE_SPS_PPS_BIT),
            enable_intra_refresh: union.read_bit(h264::FLAGS, h264::ENABLE_INTRA_REFRESH_BIT),
            bdirect_disabled: union.read_u32(h264::BDIRECT_MODE)
                == NV_ENC_H264_BDIRECT_MODE_DISABLE,
            bframes_as_ref_disabled: union.read_u32(h264::USE_BFRAMES_AS_REF)
                == NV_ENC_BFRAME_REF_MODE_DISABLED,
        }),
        VideoCodec::Hevc => CodecSettings::Hevc(crate::HevcSettings {
            idr_period: union.read_u32(hevc::IDR_PERIOD),
            max_num_ref_frames_in_dpb: union.read_u32(hevc::MAX_NUM_REF_FRAMES_IN_DPB),
            repeat_sps_pps: union.read_bit(hevc::FLAGS, hevc::REPEAT_SPS_PPS_BIT),
            output_aud: union.read_bit(hevc::FLAGS, hevc::OUTPUT_AUD_BIT),
            disable_sps_pps: union.read_bit(hevc::FLAGS, hevc::DISABLE_SPS_PPS_BIT),
            enable_intra_refresh: union.read_bit(hevc::FLAGS, hevc::ENABLE_INTRA_REFRESH_BIT),
            bframes_as_ref_disabled: union.read_u32(hevc::USE_BFRAMES_AS_REF)
                == NV_ENC_BFRAME_REF_MODE_DISABLED,
        }),
    };

    PresetConfig {
        gop_length: raw.gop_length,
        frame_interval_p: raw.frame_interval_p,
        rate_control,
        codec,
    }
}

fn write_preset(preset: &PresetConfig, raw: &mut NV_ENC_CONFIG) {
    raw.gop_length = preset.gop_length;
    raw.frame_interval_p = preset.frame_interval_p;

    let rc = &preset.rate_control;
    raw.rc_params.rate_control_mode = match rc.mode {
        RateControlMode::ConstQp => NV_ENC_PARAMS_RC_CONSTQP,
        RateControlMode::Vbr => NV_ENC_PARAMS_RC_VBR,
        RateControlMode::Cbr => NV_ENC_PARAMS_RC_CBR,
    };
    raw.rc_params.average_bit_rate = rc.average_bitrate;
    raw.rc_params.max_bit_rate = rc.max_bitrate;
    raw.rc_params.vbv_buffer_size = rc.vbv_buffer_size;
    raw.rc_params.vbv_initial_delay = rc.vbv_initial_delay;

    let union = &mut raw.encode_codec_config;
    match &preset.codec {
        CodecSettings::H264(s) => {
            union.write_u32(h264::IDR_PERIOD, s.idr_period);
            union.write_u32(h264::MAX_NUM_REF_FRAMES, s.max_num_ref_frames);
            union.write_bit(h264::FLAGS, h264::REPEAT_SPS_PPS_BIT, s.repeat_sps_pps);
            union.write_bit(h264::FLAGS, h264::OUTPUT_AUD_BIT, s.output_aud);
            union.write_bit(h264::FLAGS, h264::DISABLE_SPS_PPS_BIT, s.disable_sps_pps);
            union.write_bit(
                h264::FLAGS,
                h264::ENABLE_INTRA_REFRESH_BIT,
                s.enable_intra_refresh,
            );
            if s.bdirect_disabled {
                union.write_u32(h264::BDIRECT_MODE, NV_ENC_H264_BDIRECT_MODE_DISABLE);
            }
            if s.bframes_as_ref_disabled {
                union.write_u32(h264::USE_BFRAMES_AS_REF, NV_ENC_BFRAME_REF_MODE_DISABLED);
            }
        }
        CodecSettings::Hevc(s) => {
            union.write_u32(hevc::IDR_PERIOD, s.idr_period);
            union.write_u32(hevc::MAX_NUM_REF_FRAMES_IN_DPB, s.max_num_ref_frames_in_dpb);
            union.write_bit(hevc::FLAGS, hevc::REPEAT_SPS_PPS_BIT, s.repeat_sps_pps);
            union.write_bit(hevc::FLAGS, hevc::OUTPUT_AUD_BIT, s.output_aud);
            union.write_bit(hevc::FLAGS, hevc::DISABLE_SPS_PPS_BIT, s.disable_sps_pps);
            union.write_bit(
                hevc::FLAGS,
                hevc::ENABLE_INTRA_REFRESH_BIT,
                s.enable_intra_refresh,
            );
            if s.bframes_as_ref_disabled {
                union.write_u32(hevc::USE_BFRAMES_AS_REF, NV_ENC_BFRAME_REF_MODE_DISABLED);
            }
        }
    }
}

impl EncoderBackend for NvencBackend {
    fn name(&self) -> &'static str {
        "NVENC"
    }

    fn load_api(&mut self) -> EncoderResult<()> {
        if self.library.is_none() {
            self.library = Some(NvencLibrary::load().map_err(EncoderError::ApiLoad)?);
            info!("Loaded NVENC API {}.{}", NVENCAPI_MAJOR_VERSION, NVENCAPI_MINOR_VERSION);
        }
        Ok(())
    }

    fn open_session(&mut self, device: *mut c_void) -> EncoderResult<()> {
        if device.is_null() {
            return Err(EncoderError::SessionOpen("no graphics device".to_string()));
        }
        let open = self
            .api()?
            .nv_enc_open_encode_session_ex
            .ok_or_else(|| EncoderError::SessionOpen(missing("nvEncOpenEncodeSessionEx")))?;

        let mut params = NV_ENC_OPEN_ENCODE_SESSION_EX_PARAMS::default();
        params.device_type = NV_ENC_DEVICE_TYPE_DIRECTX;
        params.device = device;
        params.api_version = NVENCAPI_VERSION;

        let mut encoder = std::ptr::null_mut();
        let status = unsafe { open(&mut params, &mut encoder) };
        check(status, "nvEncOpenEncodeSessionEx").map_err(EncoderError::SessionOpen)?;

        self.encoder = encoder;
        Ok(())
    }

    fn preset_config(&mut self, codec: VideoCodec) -> EncoderResult<PresetConfig> {
        let session = self.session()?;
        let get = self
            .api()?
            .nv_enc_get_encode_preset_config_ex
            .ok_or_else(|| EncoderError::Preset(missing("nvEncGetEncodePresetConfigEx")))?;

        let mut preset = Box::new(NV_ENC_PRESET_CONFIG::default());
        let status = unsafe {
            get(
                session,
                codec_guid(codec),
                NV_ENC_PRESET_P1_GUID,
                NV_ENC_TUNING_INFO_LOW_LATENCY,
                &mut *preset,
            )
        };
        check(status, "nvEncGetEncodePresetConfigEx").map_err(EncoderError::Preset)?;

        let config = Box::new(preset.preset_cfg);
        let parsed = read_preset(codec, &config);
        self.preset = Some(config);
        Ok(parsed)
    }

    fn initialize(&mut self, params: &InitializeParams) -> EncoderResult<()> {
        let session = self.session()?;
        let init = self
            .api()?
            .nv_enc_initialize_encoder
            .ok_or_else(|| EncoderError::InitFailed(missing("nvEncInitializeEncoder")))?;

        let mut config = self
            .preset
            .take()
            .ok_or_else(|| EncoderError::InitFailed("preset not queried".to_string()))?;
        config.version = NV_ENC_CONFIG_VER;
        config.rc_params.version = NV_ENC_RC_PARAMS_VER;
        write_preset(&params.preset, &mut config);

        let mut init_params = NV_ENC_INITIALIZE_PARAMS::default();
        init_params.encode_guid = codec_guid(params.codec);
        init_params.preset_guid = NV_ENC_PRESET_P1_GUID;
        init_params.tuning_info = NV_ENC_TUNING_INFO_LOW_LATENCY;
        init_params.encode_width = params.width;
        init_params.encode_height = params.height;
        init_params.dar_width = params.width;
        init_params.dar_height = params.height;
        init_params.max_encode_width = params.width;
        init_params.max_encode_height = params.height;
        init_params.frame_rate_num = params.fps;
        init_params.frame_rate_den = 1;
        init_params.enable_ptd = 1;
        init_params.encode_config = &mut *config;

        let status = unsafe { init(session, &mut init_params) };
        check(status, "nvEncInitializeEncoder").map_err(EncoderError::InitFailed)?;

        self.config = Some(config);
        Ok(())
    }

    fn create_bitstream_buffer(&mut self) -> EncoderResult<BitstreamBuffer> {
        let session = self.session()?;
        let create = self
            .api()?
            .nv_enc_create_bitstream_buffer
            .ok_or_else(|| EncoderError::BufferAlloc(missing("nvEncCreateBitstreamBuffer")))?;

        let mut params = NV_ENC_CREATE_BITSTREAM_BUFFER::default();
        let status = unsafe { create(session, &mut params) };
        check(status, "nvEncCreateBitstreamBuffer").map_err(EncoderError::BufferAlloc)?;

        Ok(BitstreamBuffer(params.bitstream_buffer as usize))
    }

    fn register_resource(
        &mut self,
        texture: &EncodableTexture,
    ) -> EncoderResult<RegisteredResource> {
        let session = self.session()?;
        let register = self
            .api()?
            .nv_enc_register_resource
            .ok_or_else(|| EncoderError::Registration(missing("nvEncRegisterResource")))?;

        let mut params = NV_ENC_REGISTER_RESOURCE::default();
        params.resource_type = NV_ENC_INPUT_RESOURCE_TYPE_DIRECTX;
        params.width = texture.width;
        params.height = texture.height;
        params.pitch = 0;
        params.sub_resource_index = 0;
        params.resource_to_register = texture.handle.as_ptr();
        params.buffer_format = buffer_format(texture.order);
        params.buffer_usage = NV_ENC_INPUT_IMAGE;

        let status = unsafe { register(session, &mut params) };
        check(status, "nvEncRegisterResource").map_err(EncoderError::Registration)?;

        Ok(RegisteredResource(params.registered_resource as usize))
    }

    fn map_input(&mut self, resource: RegisteredResource) -> EncoderResult<MappedInput> {
        let session = self.session()?;
        let map = self
            .api()?
            .nv_enc_map_input_resource
            .ok_or_else(|| EncoderError::Map(missing("nvEncMapInputResource")))?;

        let mut params = NV_ENC_MAP_INPUT_RESOURCE::default();
        params.registered_resource = resource.0 as *mut c_void;
        let status = unsafe { map(session, &mut params) };
        check(status, "nvEncMapInputResource").map_err(EncoderError::Map)?;

        Ok(MappedInput(params.mapped_resource as usize))
    }

    fn unmap_input(&mut self, input: MappedInput) -> EncoderResult<()> {
        let session = self.session()?;
        let unmap = self
            .api()?
            .nv_enc_unmap_input_resource
            .ok_or_else(|| EncoderError::Map(missing("nvEncUnmapInputResource")))?;

        let status = unsafe { unmap(session, input.0 as *mut c_void) };
        check(status, "nvEncUnmapInputResource").map_err(EncoderError::Map)
    }

    fn encode_picture(&mut self, params: &PictureParams) -> EncoderResult<()> {
        let session = self.session()?;
        let encode = self
            .api()?
            .nv_enc_encode_picture
            .ok_or_else(|| EncoderError::Submit(missing("nvEncEncodePicture")))?;

        let mut pic = Box::new(NV_ENC_PIC_PARAMS::default());
        pic.output_bitstream = params.output.0 as *mut c_void;
        if params.end_of_stream {
            pic.encode_pic_flags = NV_ENC_PIC_FLAG_EOS;
        } else {
            let input = params
                .input
                .ok_or_else(|| EncoderError::Submit("no input picture".to_string()))?;
            pic.input_buffer = input.0 as *mut c_void;
            pic.buffer_fmt = buffer_format(params.order);
            pic.input_width = params.width;
            pic.input_height = params.height;
            pic.picture_struct = NV_ENC_PIC_STRUCT_FRAME;
            pic.input_time_stamp = params.timestamp.max(0) as u64;
            if params.force_idr {
                pic.encode_pic_flags |= NV_ENC_PIC_FLAG_FORCEIDR;
            }
        }

        let status = unsafe { encode(session, &mut *pic) };
        check(status, "nvEncEncodePicture").map_err(EncoderError::Submit)
    }

    fn lock_bitstream(&mut self, buffer: BitstreamBuffer) -> EncoderResult<&[u8]> {
        let session = self.session()?;
        let lock = self
            .api()?
            .nv_enc_lock_bitstream
            .ok_or_else(|| EncoderError::Lock(missing("nvEncLockBitstream")))?;

        // doNotWait = 0: block until the picture is done.
        let mut params = Box::new(NV_ENC_LOCK_BITSTREAM::default());
        params.output_bitstream = buffer.0 as *mut c_void;
        let status = unsafe { lock(session, &mut *params) };
        check(status, "nvEncLockBitstream").map_err(EncoderError::Lock)?;

        let ptr = params.bitstream_buffer_ptr as *const u8;
        let len = params.bitstream_size_in_bytes as usize;

        if ptr.is_null() || len == 0 {
            return Ok(&[]);
        }
        // SAFETY: the driver keeps the locked range valid until
        // nvEncUnlockBitstream, and the returned slice borrows `self`, which
        // `unlock_bitstream` needs mutably.
        Ok(unsafe { std::slice::from_raw_parts(ptr, len) })
    }

    fn unlock_bitstream(&mut self, buffer: BitstreamBuffer) -> EncoderResult<()> {
        let session = self.session()?;
        let unlock = self
            .api()?
            .nv_enc_unlock_bitstream
            .ok_or_else(|| EncoderError::Lock(missing("nvEncUnlockBitstream")))?;

        let status = unsafe { unlock(session, buffer.0 as *mut c_void) };
        check(status, "nvEncUnlockBitstream").map_err(EncoderError::Lock)
    }

    fn unregister_resource(&mut self, resource: RegisteredResource) {
        let Ok(session) = self.session() else { return };
        if let Some(unregister) = self.api().ok().and_then(|api| api.nv_enc_unregister_resource) {
            let status = unsafe { unregister(session, resource.0 as *mut c_void) };
            if let Err(e) = check(status, "nvEncUnregisterResource") {
                debug!("{}", e);
            }
        }
    }

    fn destroy_bitstream_buffer(&mut self, buffer: BitstreamBuffer) {
        let Ok(session) = self.session() else { return };
        if let Some(destroy) = self
            .api()
            .ok()
            .and_then(|api| api.nv_enc_destroy_bitstream_buffer)
        {
            let status = unsafe { destroy(session, buffer.0 as *mut c_void) };
            if let Err(e) = check(status, "nvEncDestroyBitstreamBuffer") {
                debug!("{}", e);
            }
        }
    }

    fn destroy(&mut self) {
        let Ok(session) = self.session() else { return };
        if let Some(destroy) = self.api().ok().and_then(|api| api.nv_enc_destroy_encoder) {
            let status = unsafe { destroy(session) };
            if let Err(e) = check(status, "nvEncDestroyEncoder") {
                debug!("{}", e);
            }
        }
        self.encoder = std::ptr::null_mut();
        self.config = None;
        self.preset = None;
    }
}

impl Drop for NvencBackend {
    fn drop(&mut self) {
        self.destroy();
    }
}
