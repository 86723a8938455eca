//! Hardware encoder backend abstraction

use std::ffi::c_void;

use capture::{ChannelOrder, EncodableTexture};
use shared_protocol::VideoCodec;

use crate::{EncoderResult, PresetConfig};

/// Texture registered with the hardware session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegisteredResource(pub usize);

/// Registered texture mapped as encoder input for one picture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MappedInput(pub usize);

/// Output bitstream buffer owned by the hardware session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitstreamBuffer(pub usize);

/// Session initialization parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitializeParams {
    pub codec: VideoCodec,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub preset: PresetConfig,
}

/// One encode submission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PictureParams {
    /// Mapped input, `None` for the end-of-stream signal
    pub input: Option<MappedInput>,
    pub output: BitstreamBuffer,
    pub width: u32,
    pub height: u32,
    pub order: ChannelOrder,
    /// Capture time in native ticks
    pub timestamp: i64,
    pub force_idr: bool,
    pub end_of_stream: bool,
}

/// Hardware encoder backend
///
/// Mirrors the call sequence of a hardware encode session. The session
/// layer drives it and owns the registration cache; backends only hold the
/// native session.
pub trait EncoderBackend: Send {
    /// Backend name for logging
    fn name(&self) -> &'static str;

    /// Load the encoder entry points
    fn load_api(&mut self) -> EncoderResult<()>;

    /// Open a session bound to a native graphics device
    fn open_session(&mut self, device: *mut c_void) -> EncoderResult<()>;

    /// Low-latency preset for the codec
    fn preset_config(&mut self, codec: VideoCodec) -> EncoderResult<PresetConfig>;

    /// Initialize the session with an adjusted preset
    fn initialize(&mut self, params: &InitializeParams) -> EncoderResult<()>;

    fn create_bitstream_buffer(&mut self) -> EncoderResult<BitstreamBuffer>;

    fn register_resource(&mut self, texture: &EncodableTexture)
    -> EncoderResult<RegisteredResource>;

    fn map_input(&mut self, resource: RegisteredResource) -> EncoderResult<MappedInput>;

    fn unmap_input(&mut self, input: MappedInput) -> EncoderResult<()>;

    fn encode_picture(&mut self, params: &PictureParams) -> EncoderResult<()>;

    /// Block until the buffer holds the encoded picture and expose its bytes
    fn lock_bitstream(&mut self, buffer: BitstreamBuffer) -> EncoderResult<&[u8]>;

    fn unlock_bitstream(&mut self, buffer: BitstreamBuffer) -> EncoderResult<()>;

    fn unregister_resource(&mut self, resource: RegisteredResource);

    fn destroy_bitstream_buffer(&mut self, buffer: BitstreamBuffer);

    /// Close the native session; safe to call when none is open
    fn destroy(&mut self);
}

/// Encoder statistics
#[derive(Debug, Clone, Default)]
pub struct EncoderStats {
    /// Pictures submitted
    pub frames_submitted: u64,
    /// Packets emitted
    pub packets: u64,
    /// Total bytes output
    pub bytes_output: u64,
    /// Keyframes emitted
    pub keyframes: u64,
    /// Submissions that produced no packet because of an error
    pub failures: u64,
    /// Textures registered with the hardware session
    pub registrations: u64,
}
