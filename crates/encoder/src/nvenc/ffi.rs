//! Raw bindings for the parts of `nvEncodeAPI.h` (Video Codec SDK 12.0)
//! used with Direct3D 11 input.
//!
//! Only the fields the backend touches are named; the rest of each
//! structure is reserved space sized at least as large as the SDK's.

#![allow(non_camel_case_types, dead_code)]

use std::ffi::c_void;

use libloading::Library;
use tracing::debug;

pub type NVENCSTATUS = i32;
pub const NV_ENC_SUCCESS: NVENCSTATUS = 0;

pub const NVENCAPI_MAJOR_VERSION: u32 = 12;
pub const NVENCAPI_MINOR_VERSION: u32 = 0;
pub const NVENCAPI_VERSION: u32 = NVENCAPI_MAJOR_VERSION | (NVENCAPI_MINOR_VERSION << 24);

/// `NVENCAPI_STRUCT_VERSION(ver)`
pub const fn struct_version(ver: u32) -> u32 {
    NVENCAPI_VERSION | (ver << 16) | (0x7 << 28)
}

pub const NV_ENCODE_API_FUNCTION_LIST_VER: u32 = struct_version(2);
pub const NV_ENC_OPEN_ENCODE_SESSION_EX_PARAMS_VER: u32 = struct_version(1);
pub const NV_ENC_RC_PARAMS_VER: u32 = struct_version(1);
pub const NV_ENC_CONFIG_VER: u32 = struct_version(8) | (1 << 31);
pub const NV_ENC_PRESET_CONFIG_VER: u32 = struct_version(4) | (1 << 31);
pub const NV_ENC_INITIALIZE_PARAMS_VER: u32 = struct_version(5) | (1 << 31);
pub const NV_ENC_CREATE_BITSTREAM_BUFFER_VER: u32 = struct_version(1);
pub const NV_ENC_REGISTER_RESOURCE_VER: u32 = struct_version(4);
pub const NV_ENC_MAP_INPUT_RESOURCE_VER: u32 = struct_version(4);
pub const NV_ENC_PIC_PARAMS_VER: u32 = struct_version(6) | (1 << 31);
pub const NV_ENC_LOCK_BITSTREAM_VER: u32 = struct_version(2);

pub const NV_ENC_DEVICE_TYPE_DIRECTX: u32 = 0;
pub const NV_ENC_INPUT_RESOURCE_TYPE_DIRECTX: u32 = 0;
pub const NV_ENC_INPUT_IMAGE: u32 = 0;
pub const NV_ENC_TUNING_INFO_LOW_LATENCY: u32 = 2;
pub const NV_ENC_PIC_STRUCT_FRAME: u32 = 1;

pub const NV_ENC_BUFFER_FORMAT_ARGB: u32 = 0x0100_0000;
pub const NV_ENC_BUFFER_FORMAT_ABGR: u32 = 0x1000_0000;

pub const NV_ENC_PIC_FLAG_FORCEIDR: u32 = 0x2;
pub const NV_ENC_PIC_FLAG_EOS: u32 = 0x8;

pub const NV_ENC_PARAMS_RC_CONSTQP: u32 = 0x0;
pub const NV_ENC_PARAMS_RC_VBR: u32 = 0x1;
pub const NV_ENC_PARAMS_RC_CBR: u32 = 0x2;

pub const NV_ENC_H264_BDIRECT_MODE_DISABLE: u32 = 1;
pub const NV_ENC_BFRAME_REF_MODE_DISABLED: u32 = 0;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GUID {
    pub data1: u32,
    pub data2: u16,
    pub data3: u16,
    pub data4: [u8; 8],
}

pub const NV_ENC_CODEC_H264_GUID: GUID = GUID {
    data1: 0x6BC8_2762,
    data2: 0x4E63,
    data3: 0x4CA4,
    data4: [0xAA, 0x85, 0x1E, 0x50, 0xF3, 0x21, 0xF6, 0xBF],
};

pub const NV_ENC_CODEC_HEVC_GUID: GUID = GUID {
    data1: 0x790C_DC88,
    data2: 0x4522,
    data3: 0x4D7B,
    data4: [0x94, 0x25, 0xBD, 0xA9, 0x97, 0x5F, 0x76, 0x03],
};

pub const NV_ENC_PRESET_P1_GUID: GUID = GUID {
    data1: 0xFC0A_8D3E,
    data2: 0x45F8,
    data3: 0x4CF8,
    data4: [0x80, 0xC7, 0x29, 0x88, 0x71, 0x59, 0x0E, 0xBF],
};

macro_rules! zeroed_versioned {
    ($ty:ty, $ver:expr) => {
        impl Default for $ty {
            fn default() -> Self {
                // SAFETY: plain C data; all-zero is the SDK's documented
                // initial state, with pointers becoming null.
                let mut s: Self = unsafe { std::mem::zeroed() };
                s.version = $ver;
                s
            }
        }
    };
}

#[repr(C)]
pub struct NV_ENC_OPEN_ENCODE_SESSION_EX_PARAMS {
    pub version: u32,
    pub device_type: u32,
    pub device: *mut c_void,
    pub reserved: *mut c_void,
    pub api_version: u32,
    pub reserved1: [u32; 253],
    pub reserved2: [*mut c_void; 64],
}
zeroed_versioned!(
    NV_ENC_OPEN_ENCODE_SESSION_EX_PARAMS,
    NV_ENC_OPEN_ENCODE_SESSION_EX_PARAMS_VER
);

#[repr(C)]
#[derive(Clone, Copy)]
pub struct NV_ENC_QP {
    pub qp_inter_p: u32,
    pub qp_inter_b: u32,
    pub qp_intra: u32,
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct NV_ENC_RC_PARAMS {
    pub version: u32,
    pub rate_control_mode: u32,
    pub const_qp: NV_ENC_QP,
    pub average_bit_rate: u32,
    pub max_bit_rate: u32,
    pub vbv_buffer_size: u32,
    pub vbv_initial_delay: u32,
    pub reserved: [u32; 23],
}

/// `NV_ENC_CODEC_CONFIG` union, accessed by byte offset
#[repr(C, align(8))]
#[derive(Clone, Copy)]
pub struct NV_ENC_CODEC_CONFIG {
    pub raw: [u8; 4096],
}

impl NV_ENC_CODEC_CONFIG {
    pub fn read_u32(&self, offset: usize) -> u32 {
        let mut word = [0u8; 4];
        word.copy_from_slice(&self.raw[offset..offset + 4]);
        u32::from_ne_bytes(word)
    }

    pub fn write_u32(&mut self, offset: usize, value: u32) {
        self.raw[offset..offset + 4].copy_from_slice(&value.to_ne_bytes());
    }

    pub fn read_bit(&self, offset: usize, bit: u32) -> bool {
        self.read_u32(offset) & (1 << bit) != 0
    }

    pub fn write_bit(&mut self, offset: usize, bit: u32, on: bool) {
        let word = self.read_u32(offset);
        let word = if on { word | (1 << bit) } else { word & !(1 << bit) };
        self.write_u32(offset, word);
    }
}

/// `NV_ENC_CONFIG_H264` offsets
pub mod h264 {
    pub const FLAGS: usize = 0;
    pub const OUTPUT_AUD_BIT: u32 = 6;
    pub const DISABLE_SPS_PPS_BIT: u32 = 7;
    pub const ENABLE_INTRA_REFRESH_BIT: u32 = 10;
    pub const REPEAT_SPS_PPS_BIT: u32 = 12;
    pub const IDR_PERIOD: usize = 8;
    pub const BDIRECT_MODE: usize = 40;
    pub const MAX_NUM_REF_FRAMES: usize = 60;
    pub const USE_BFRAMES_AS_REF: usize = 200;
}

/// `NV_ENC_CONFIG_HEVC` offsets
pub mod hevc {
    pub const FLAGS: usize = 16;
    pub const OUTPUT_AUD_BIT: u32 = 4;
    pub const DISABLE_SPS_PPS_BIT: u32 = 6;
    pub const REPEAT_SPS_PPS_BIT: u32 = 7;
    pub const ENABLE_INTRA_REFRESH_BIT: u32 = 8;
    pub const IDR_PERIOD: usize = 20;
    pub const MAX_NUM_REF_FRAMES_IN_DPB: usize = 32;
    pub const USE_BFRAMES_AS_REF: usize = 180;
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct NV_ENC_CONFIG {
    pub version: u32,
    pub profile_guid: GUID,
    pub gop_length: u32,
    pub frame_interval_p: i32,
    pub mono_chrome_encoding: u32,
    pub frame_field_mode: u32,
    pub mv_precision: u32,
    pub rc_params: NV_ENC_RC_PARAMS,
    pub encode_codec_config: NV_ENC_CODEC_CONFIG,
    pub reserved: [u32; 278],
    pub reserved2: [*mut c_void; 64],
}
zeroed_versioned!(NV_ENC_CONFIG, NV_ENC_CONFIG_VER);

#[repr(C)]
pub struct NV_ENC_PRESET_CONFIG {
    pub version: u32,
    pub preset_cfg: NV_ENC_CONFIG,
    pub reserved1: [u32; 255],
    pub reserved2: [*mut c_void; 64],
}

impl Default for NV_ENC_PRESET_CONFIG {
    fn default() -> Self {
        // SAFETY: plain C data, see `zeroed_versioned`.
        let mut s: Self = unsafe { std::mem::zeroed() };
        s.version = NV_ENC_PRESET_CONFIG_VER;
        s.preset_cfg.version = NV_ENC_CONFIG_VER;
        s
    }
}

#[repr(C)]
pub struct NV_ENC_INITIALIZE_PARAMS {
    pub version: u32,
    pub encode_guid: GUID,
    pub preset_guid: GUID,
    pub encode_width: u32,
    pub encode_height: u32,
    pub dar_width: u32,
    pub dar_height: u32,
    pub frame_rate_num: u32,
    pub frame_rate_den: u32,
    pub enable_encode_async: u32,
    pub enable_ptd: u32,
    /// reportSliceOffsets .. reservedBitFields
    pub flags: u32,
    pub priv_data_size: u32,
    pub priv_data: *mut c_void,
    pub encode_config: *mut NV_ENC_CONFIG,
    pub max_encode_width: u32,
    pub max_encode_height: u32,
    pub max_me_hint_counts_per_block: [[u32; 4]; 2],
    pub tuning_info: u32,
    pub buffer_format: u32,
    pub reserved: [u32; 287],
    pub reserved2: [*mut c_void; 64],
}
zeroed_versioned!(NV_ENC_INITIALIZE_PARAMS, NV_ENC_INITIALIZE_PARAMS_VER);

#[repr(C)]
pub struct NV_ENC_CREATE_BITSTREAM_BUFFER {
    pub version: u32,
    pub size: u32,
    pub memory_heap: u32,
    pub reserved: u32,
    pub bitstream_buffer: *mut c_void,
    pub bitstream_buffer_ptr: *mut c_void,
    pub reserved1: [u32; 58],
    pub reserved2: [*mut c_void; 64],
}
zeroed_versioned!(
    NV_ENC_CREATE_BITSTREAM_BUFFER,
    NV_ENC_CREATE_BITSTREAM_BUFFER_VER
);

#[repr(C)]
pub struct NV_ENC_REGISTER_RESOURCE {
    pub version: u32,
    pub resource_type: u32,
    pub width: u32,
    pub height: u32,
    pub pitch: u32,
    pub sub_resource_index: u32,
    pub resource_to_register: *mut c_void,
    pub registered_resource: *mut c_void,
    pub buffer_format: u32,
    pub buffer_usage: u32,
    pub input_fence_point: *mut c_void,
    pub reserved1: [u32; 248],
    pub reserved2: [*mut c_void; 64],
}
zeroed_versioned!(NV_ENC_REGISTER_RESOURCE, NV_ENC_REGISTER_RESOURCE_VER);

#[repr(C)]
pub struct NV_ENC_MAP_INPUT_RESOURCE {
    pub version: u32,
    pub sub_resource_index: u32,
    pub input_resource: *mut c_void,
    pub registered_resource: *mut c_void,
    pub mapped_resource: *mut c_void,
    pub mapped_buffer_fmt: u32,
    pub reserved1: [u32; 251],
    pub reserved2: [*mut c_void; 64],
}
zeroed_versioned!(NV_ENC_MAP_INPUT_RESOURCE, NV_ENC_MAP_INPUT_RESOURCE_VER);

#[repr(C)]
pub struct NV_ENC_PIC_PARAMS {
    pub version: u32,
    pub input_width: u32,
    pub input_height: u32,
    pub input_pitch: u32,
    pub encode_pic_flags: u32,
    pub frame_idx: u32,
    pub input_time_stamp: u64,
    pub input_duration: u64,
    pub input_buffer: *mut c_void,
    pub output_bitstream: *mut c_void,
    pub completion_event: *mut c_void,
    pub buffer_fmt: u32,
    pub picture_struct: u32,
    pub picture_type: u32,
    pub codec_pic_params: [u32; 257],
    pub reserved: [u64; 512],
}
zeroed_versioned!(NV_ENC_PIC_PARAMS, NV_ENC_PIC_PARAMS_VER);

#[repr(C)]
pub struct NV_ENC_LOCK_BITSTREAM {
    pub version: u32,
    /// doNotWait:1, ltrFrame:1, getRCStats:1
    pub flags: u32,
    pub output_bitstream: *mut c_void,
    pub slice_offsets: *mut u32,
    pub frame_idx: u32,
    pub hw_encode_status: u32,
    pub num_slices: u32,
    pub bitstream_size_in_bytes: u32,
    pub output_time_stamp: u64,
    pub output_duration: u64,
    pub bitstream_buffer_ptr: *mut c_void,
    pub picture_type: u32,
    pub picture_struct: u32,
    pub frame_avg_qp: u32,
    pub frame_satd: u32,
    pub ltr_frame_idx: u32,
    pub ltr_frame_bitmap: u32,
    pub temporal_id: u32,
    pub reserved: [u32; 240],
    pub reserved2: [*mut c_void; 64],
}
zeroed_versioned!(NV_ENC_LOCK_BITSTREAM, NV_ENC_LOCK_BITSTREAM_VER);

type Unused = *mut c_void;

/// `NV_ENCODE_API_FUNCTION_LIST`
#[repr(C)]
pub struct NV_ENCODE_API_FUNCTION_LIST {
    pub version: u32,
    pub reserved: u32,
    pub nv_enc_open_encode_session: Unused,
    pub nv_enc_get_encode_guid_count: Unused,
    pub nv_enc_get_encode_profile_guid_count: Unused,
    pub nv_enc_get_encode_profile_guids: Unused,
    pub nv_enc_get_encode_guids: Unused,
    pub nv_enc_get_input_format_count: Unused,
    pub nv_enc_get_input_formats: Unused,
    pub nv_enc_get_encode_caps: Unused,
    pub nv_enc_get_encode_preset_count: Unused,
    pub nv_enc_get_encode_preset_guids: Unused,
    pub nv_enc_get_encode_preset_config: Unused,
    pub nv_enc_initialize_encoder:
        Option<unsafe extern "system" fn(*mut c_void, *mut NV_ENC_INITIALIZE_PARAMS) -> NVENCSTATUS>,
    pub nv_enc_create_input_buffer: Unused,
    pub nv_enc_destroy_input_buffer: Unused,
    pub nv_enc_create_bitstream_buffer: Option<
        unsafe extern "system" fn(*mut c_void, *mut NV_ENC_CREATE_BITSTREAM_BUFFER) -> NVENCSTATUS,
    >,
    pub nv_enc_destroy_bitstream_buffer:
        Option<unsafe extern "system" fn(*mut c_void, *mut c_void) -> NVENCSTATUS>,
    pub nv_enc_encode_picture:
        Option<unsafe extern "system" fn(*mut c_void, *mut NV_ENC_PIC_PARAMS) -> NVENCSTATUS>,
    pub nv_enc_lock_bitstream:
        Option<unsafe extern "system" fn(*mut c_void, *mut NV_ENC_LOCK_BITSTREAM) -> NVENCSTATUS>,
    pub nv_enc_unlock_bitstream:
        Option<unsafe extern "system" fn(*mut c_void, *mut c_void) -> NVENCSTATUS>,
    pub nv_enc_lock_input_buffer: Unused,
    pub nv_enc_unlock_input_buffer: Unused,
    pub nv_enc_get_encode_stats: Unused,
    pub nv_enc_get_sequence_params: Unused,
    pub nv_enc_register_async_event: Unused,
    pub nv_enc_unregister_async_event: Unused,
    pub nv_enc_map_input_resource: Option<
        unsafe extern "system" fn(*mut c_void, *mut NV_ENC_MAP_INPUT_RESOURCE) -> NVENCSTATUS,
    >,
    pub nv_enc_unmap_input_resource:
        Option<unsafe extern "system" fn(*mut c_void, *mut c_void) -> NVENCSTATUS>,
    pub nv_enc_destroy_encoder: Option<unsafe extern "system" fn(*mut c_void) -> NVENCSTATUS>,
    pub nv_enc_invalidate_ref_frames: Unused,
    pub nv_enc_open_encode_session_ex: Option<
        unsafe extern "system" fn(
            *mut NV_ENC_OPEN_ENCODE_SESSION_EX_PARAMS,
            *mut *mut c_void,
        ) -> NVENCSTATUS,
    >,
    pub nv_enc_register_resource: Option<
        unsafe extern "system" fn(*mut c_void, *mut NV_ENC_REGISTER_RESOURCE) -> NVENCSTATUS,
    >,
    pub nv_enc_unregister_resource:
        Option<unsafe extern "system" fn(*mut c_void, *mut c_void) -> NVENCSTATUS>,
    pub nv_enc_reconfigure_encoder: Unused,
    pub reserved1: Unused,
    pub nv_enc_create_mv_buffer: Unused,
    pub nv_enc_destroy_mv_buffer: Unused,
    pub nv_enc_run_motion_estimation_only: Unused,
    pub nv_enc_get_last_error_string: Unused,
    pub nv_enc_set_io_cuda_streams: Unused,
    pub nv_enc_get_encode_preset_config_ex: Option<
        unsafe extern "system" fn(
            *mut c_void,
            GUID,
            GUID,
            u32,
            *mut NV_ENC_PRESET_CONFIG,
        ) -> NVENCSTATUS,
    >,
    pub nv_enc_get_sequence_param_ex: Unused,
    pub reserved2: [Unused; 277],
}
zeroed_versioned!(NV_ENCODE_API_FUNCTION_LIST, NV_ENCODE_API_FUNCTION_LIST_VER);

type NvEncodeApiCreateInstanceFn =
    unsafe extern "system" fn(*mut NV_ENCODE_API_FUNCTION_LIST) -> NVENCSTATUS;

/// Driver library plus its populated function table
pub struct NvencLibrary {
    _lib: Library,
    pub api: NV_ENCODE_API_FUNCTION_LIST,
}

// SAFETY: the table holds driver entry points that are valid on any thread
// while `_lib` keeps the library loaded.
unsafe impl Send for NvencLibrary {}

pub const NVENC_LIBRARY_NAME: &str = "nvEncodeAPI64.dll";

impl NvencLibrary {
    pub fn load() -> Result<Self, String> {
        // SAFETY: loading the NVIDIA driver's encode library runs no
        // initialization beyond registering its exports.
        let lib = unsafe { Library::new(NVENC_LIBRARY_NAME) }
            .map_err(|e| format!("failed to load {NVENC_LIBRARY_NAME}: {e}"))?;

        let mut api = NV_ENCODE_API_FUNCTION_LIST::default();
        {
            // SAFETY: symbol type matches the SDK declaration.
            let create: libloading::Symbol<'_, NvEncodeApiCreateInstanceFn> =
                unsafe { lib.get(b"NvEncodeAPICreateInstance\0") }
                    .map_err(|e| format!("NvEncodeAPICreateInstance: {e}"))?;
            let status = unsafe { create(&mut api) };
            check(status, "NvEncodeAPICreateInstance")?;
        }

        debug!("NVENC function table populated");
        Ok(Self { _lib: lib, api })
    }
}

/// Map a status code to a descriptive error string
pub fn check(status: NVENCSTATUS, call: &str) -> Result<(), String> {
    if status == NV_ENC_SUCCESS {
        Ok(())
    } else {
        Err(format!("{call} failed: {} ({status})", status_name(status)))
    }
}

pub fn status_name(status: NVENCSTATUS) -> &'static str {
    match status {
        0 => "NV_ENC_SUCCESS",
        1 => "NV_ENC_ERR_NO_ENCODE_DEVICE",
        2 => "NV_ENC_ERR_UNSUPPORTED_DEVICE",
        3 => "NV_ENC_ERR_INVALID_ENCODERDEVICE",
        4 => "NV_ENC_ERR_INVALID_DEVICE",
        5 => "NV_ENC_ERR_DEVICE_NOT_EXIST",
        6 => "NV_ENC_ERR_INVALID_PTR",
        7 => "NV_ENC_ERR_INVALID_EVENT",
        8 => "NV_ENC_ERR_INVALID_PARAM",
        9 => "NV_ENC_ERR_INVALID_CALL",
        10 => "NV_ENC_ERR_OUT_OF_MEMORY",
        11 => "NV_ENC_ERR_ENCODER_NOT_INITIALIZED",
        12 => "NV_ENC_ERR_UNSUPPORTED_PARAM",
        13 => "NV_ENC_ERR_LOCK_BUSY",
        14 => "NV_ENC_ERR_NOT_ENOUGH_BUFFER",
        15 => "NV_ENC_ERR_INVALID_VERSION",
        16 => "NV_ENC_ERR_MAP_FAILED",
        17 => "NV_ENC_ERR_NEED_MORE_INPUT",
        18 => "NV_ENC_ERR_ENCODER_BUSY",
        19 => "NV_ENC_ERR_EVENT_NOT_REGISTERD",
        20 => "NV_ENC_ERR_GENERIC",
        _ => "NV_ENC_ERR_UNKNOWN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{offset_of, size_of};

    #[test]
    fn test_struct_version_packing() {
        assert_eq!(struct_version(1), 12 | (1 << 16) | (0x7 << 28));
        assert_ne!(NV_ENC_CONFIG_VER & (1 << 31), 0);
    }

    #[test]
    fn test_layout_offsets() {
        assert_eq!(size_of::<NV_ENC_RC_PARAMS>(), 128);
        assert_eq!(offset_of!(NV_ENC_CONFIG, rc_params), 40);
        assert_eq!(offset_of!(NV_ENC_CONFIG, encode_codec_config), 168);
        assert_eq!(offset_of!(NV_ENC_PRESET_CONFIG, preset_cfg), 8);
        assert_eq!(offset_of!(NV_ENC_INITIALIZE_PARAMS, enable_ptd), 64);
        assert_eq!(offset_of!(NV_ENC_INITIALIZE_PARAMS, encode_config), 88);
        assert_eq!(offset_of!(NV_ENC_INITIALIZE_PARAMS, tuning_info), 136);
        assert_eq!(offset_of!(NV_ENC_PIC_PARAMS, input_buffer), 40);
        assert_eq!(offset_of!(NV_ENC_PIC_PARAMS, picture_type), 72);
        assert_eq!(offset_of!(NV_ENC_LOCK_BITSTREAM, bitstream_size_in_bytes), 36);
        assert_eq!(offset_of!(NV_ENC_LOCK_BITSTREAM, bitstream_buffer_ptr), 56);
        assert_eq!(offset_of!(NV_ENC_REGISTER_RESOURCE, registered_resource), 32);
        assert_eq!(offset_of!(NV_ENC_MAP_INPUT_RESOURCE, mapped_resource), 24);
    }

    #[test]
    fn test_function_list_slots() {
        let slot = size_of::<*mut c_void>();
        assert_eq!(
            offset_of!(NV_ENCODE_API_FUNCTION_LIST, nv_enc_initialize_encoder),
            8 + 11 * slot
        );
        assert_eq!(
            offset_of!(NV_ENCODE_API_FUNCTION_LIST, nv_enc_open_encode_session_ex),
            8 + 29 * slot
        );
        assert_eq!(
            offset_of!(NV_ENCODE_API_FUNCTION_LIST, nv_enc_get_encode_preset_config_ex),
            8 + 39 * slot
        );
    }

    #[test]
    fn test_codec_config_bits() {
        let mut config = NV_ENC_CONFIG::default();
        let codec = &mut config.encode_codec_config;
        codec.write_bit(h264::FLAGS, h264::REPEAT_SPS_PPS_BIT, true);
        codec.write_u32(h264::IDR_PERIOD, 30);
        assert_eq!(codec.read_u32(h264::FLAGS), 1 << 12);
        assert!(codec.read_bit(h264::FLAGS, h264::REPEAT_SPS_PPS_BIT));
        codec.write_bit(h264::FLAGS, h264::REPEAT_SPS_PPS_BIT, false);
        assert_eq!(codec.read_u32(h264::FLAGS), 0);
        assert_eq!(codec.read_u32(h264::IDR_PERIOD), 30);
    }
}
