//! Test doubles shared by the stream scenario tests

#![allow(dead_code)]

use std::ffi::c_void;
use std::sync::Arc;
use std::time::{Duration, Instant};

use capture::{CaptureResult, EncodableTexture, GpuDevice, TextureDesc, TextureFormat, TextureHandle};
use encoder::{
    BitstreamBuffer, EncoderBackend, EncoderError, EncoderResult, InitializeParams, MappedInput,
    PictureParams, PresetConfig, RegisteredResource,
};
use net_transport::{
    MuxerBackend, OutboundFrame, TrackParams, TransportConfig, TransportError, TransportResult,
};
use parking_lot::Mutex;
use shared_protocol::{StreamConfig, VideoCodec};
use streamer::{HostContext, StreamController};

pub const IDR: &[u8] = &[0, 0, 0, 1, 0x65, 0x88, 0x84, 0x00];
pub const NON_IDR: &[u8] = &[0, 0, 0, 1, 0x41, 0x9A, 0x02, 0x00];
pub const TAIL: &[u8] = &[0, 0, 1, 0x41, 0xEE];

/// Behaviour switches and the shared call log
#[derive(Debug, Default)]
pub struct Script {
    pub events: Vec<String>,
    pub fail_init: bool,
    pub open_failures: usize,
    pub write_failures: usize,
    pub encoders_created: usize,
    pub muxers_created: usize,
}

impl Script {
    pub fn count(&self, event: &str) -> usize {
        self.events.iter().filter(|e| e.as_str() == event).count()
    }

    pub fn position(&self, event: &str) -> Option<usize> {
        self.events.iter().position(|e| e.as_str() == event)
    }

    /// Frames written, as (keyframe, has_pts, len)
    pub fn frames(&self) -> Vec<(bool, bool, usize)> {
        self.events
            .iter()
            .filter_map(|e| e.strip_prefix("mux:frame:"))
            .map(|rest| {
                let parts: Vec<&str> = rest.split(':').collect();
                (parts[0] == "key", parts[1] == "pts", parts[2].parse().unwrap())
            })
            .collect()
    }
}

pub type SharedScript = Arc<Mutex<Script>>;

pub struct FakeDevice;

impl GpuDevice for FakeDevice {
    fn describe(&self, _texture: TextureHandle) -> CaptureResult<TextureDesc> {
        Ok(TextureDesc::simple(640, 480, TextureFormat::Bgra8Unorm))
    }

    fn create_texture(&self, _desc: &TextureDesc) -> CaptureResult<TextureHandle> {
        Ok(TextureHandle::from_id(0x7000).unwrap())
    }

    fn copy_texture(&self, _dst: TextureHandle, _src: TextureHandle) -> CaptureResult<()> {
        Ok(())
    }

    fn release_texture(&self, _texture: TextureHandle) {}

    fn native_device(&self) -> *mut c_void {
        std::ptr::null_mut()
    }
}

pub struct FakeEncoder {
    script: SharedScript,
    output: Vec<u8>,
}

impl FakeEncoder {
    fn record(&self, event: &str) {
        self.script.lock().events.push(format!("enc:{event}"));
    }
}

impl EncoderBackend for FakeEncoder {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn load_api(&mut self) -> EncoderResult<()> {
        Ok(())
    }

    fn open_session(&mut self, _device: *mut c_void) -> EncoderResult<()> {
        self.record("open");
        Ok(())
    }

    fn preset_config(&mut self, codec: VideoCodec) -> EncoderResult<PresetConfig> {
        Ok(PresetConfig::new(codec))
    }

    fn initialize(&mut self, _params: &InitializeParams) -> EncoderResult<()> {
        if self.script.lock().fail_init {
            return Err(EncoderError::InitFailed("no capable GPU".to_string()));
        }
        self.record("init");
        Ok(())
    }

    fn create_bitstream_buffer(&mut self) -> EncoderResult<BitstreamBuffer> {
        Ok(BitstreamBuffer(1))
    }

    fn register_resource(
        &mut self,
        texture: &EncodableTexture,
    ) -> EncoderResult<RegisteredResource> {
        self.record("register");
        Ok(RegisteredResource(texture.handle.id()))
    }

    fn map_input(&mut self, resource: RegisteredResource) -> EncoderResult<MappedInput> {
        Ok(MappedInput(resource.0))
    }

    fn unmap_input(&mut self, _input: MappedInput) -> EncoderResult<()> {
        Ok(())
    }

    fn encode_picture(&mut self, params: &PictureParams) -> EncoderResult<()> {
        if params.end_of_stream {
            self.record("eos");
            self.output = TAIL.to_vec();
        } else {
            self.record("encode");
            self.output = if params.force_idr {
                IDR.to_vec()
            } else {
                NON_IDR.to_vec()
            };
        }
        Ok(())
    }

    fn lock_bitstream(&mut self, _buffer: BitstreamBuffer) -> EncoderResult<&[u8]> {
        Ok(&self.output)
    }

    fn unlock_bitstream(&mut self, _buffer: BitstreamBuffer) -> EncoderResult<()> {
        Ok(())
    }

    fn unregister_resource(&mut self, _resource: RegisteredResource) {
        self.record("unregister");
    }

    fn destroy_bitstream_buffer(&mut self, _buffer: BitstreamBuffer) {}

    fn destroy(&mut self) {
        self.record("destroy");
    }
}

pub struct FakeMuxer {
    script: SharedScript,
}

impl FakeMuxer {
    fn record(&self, event: &str) {
        self.script.lock().events.push(format!("mux:{event}"));
    }
}

impl MuxerBackend for FakeMuxer {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn prepare(
        &mut self,
        _destination: &str,
        track: &TrackParams,
        _config: &TransportConfig,
    ) -> TransportResult<()> {
        assert_eq!(track.clock_rate, 90_000);
        self.record("prepare");
        Ok(())
    }

    fn write_header(&mut self, _config: &TransportConfig) -> TransportResult<()> {
        let mut script = self.script.lock();
        if script.open_failures > 0 {
            script.open_failures -= 1;
            script.events.push("mux:header_failed".to_string());
            return Err(TransportError::HeaderFailed("connection refused".to_string()));
        }
        script.events.push("mux:header".to_string());
        Ok(())
    }

    fn write_frame(&mut self, frame: &OutboundFrame<'_>) -> TransportResult<()> {
        let mut script = self.script.lock();
        if script.write_failures > 0 {
            script.write_failures -= 1;
            script.events.push("mux:frame_failed".to_string());
            return Err(TransportError::WriteFailed("broken pipe".to_string()));
        }
        script.events.push(format!(
            "mux:frame:{}:{}:{}",
            if frame.keyframe { "key" } else { "delta" },
            if frame.pts.is_some() { "pts" } else { "nopts" },
            frame.data.len()
        ));
        Ok(())
    }

    fn write_trailer(&mut self) -> TransportResult<()> {
        self.record("trailer");
        Ok(())
    }

    fn release(&mut self) {
        self.record("release");
    }
}

/// Controller wired to the fakes plus the script that drives them
pub fn harness() -> (SharedScript, StreamController) {
    let script: SharedScript = Arc::new(Mutex::new(Script::default()));

    let encoders = script.clone();
    let muxers = script.clone();
    let context = HostContext::new(
        Arc::new(FakeDevice),
        move || {
            encoders.lock().encoders_created += 1;
            Ok(Box::new(FakeEncoder {
                script: encoders.clone(),
                output: Vec::new(),
            }) as Box<dyn EncoderBackend>)
        },
        move || {
            muxers.lock().muxers_created += 1;
            Ok(Box::new(FakeMuxer {
                script: muxers.clone(),
            }) as Box<dyn MuxerBackend>)
        },
    );

    (script, StreamController::new(context))
}

pub fn config(fps: u32) -> StreamConfig {
    StreamConfig {
        width: 640,
        height: 480,
        fps,
        bitrate_kbps: 2000,
        codec: VideoCodec::H264,
        destination: "rtsp://host/test".to_string(),
        ..Default::default()
    }
}

pub fn texture() -> Option<TextureHandle> {
    TextureHandle::from_id(0x1000)
}

/// Poll `condition` until it holds or `timeout` passes
pub fn wait_for(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    condition()
}
