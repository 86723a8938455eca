//! Per-stream hardware encoder session

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use capture::{EncodableTexture, GpuDevice, ResourceAdapter, TextureHandle};
use shared_protocol::EncodedPacket;
use tracing::{debug, info, warn};

use crate::{
    BitstreamBuffer, CodecPolicy, EncoderBackend, EncoderConfig, EncoderError, EncoderResult,
    EncoderStats, InitializeParams, PictureParams, RegisteredResource, policy_for,
};

/// One hardware encode session plus its registration cache
///
/// Textures are registered with the hardware session the first time they
/// are seen and stay registered until the session is torn down.
pub struct EncoderSession {
    backend: Box<dyn EncoderBackend>,
    adapter: ResourceAdapter,
    config: EncoderConfig,
    policy: &'static CodecPolicy,
    registrations: HashMap<TextureHandle, RegisteredResource>,
    bitstream: Option<BitstreamBuffer>,
    session_open: bool,
    initialized: bool,
    force_idr: bool,
    flushed: bool,
    stats: EncoderStats,
}

impl EncoderSession {
    /// Create an uninitialized session
    pub fn new(
        backend: Box<dyn EncoderBackend>,
        device: Arc<dyn GpuDevice>,
        config: EncoderConfig,
    ) -> Self {
        Self {
            backend,
            adapter: ResourceAdapter::new(device),
            policy: policy_for(config.codec),
            config,
            registrations: HashMap::new(),
            bitstream: None,
            session_open: false,
            initialized: false,
            force_idr: true,
            flushed: false,
            stats: EncoderStats::default(),
        }
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn stats(&self) -> EncoderStats {
        self.stats.clone()
    }

    /// Open and configure the hardware session
    ///
    /// Any failing step tears down what was built so far; the session is
    /// left unusable and the error is returned without retrying.
    pub fn initialize(&mut self) -> EncoderResult<()> {
        if self.initialized {
            return Ok(());
        }

        if let Err(e) = self.try_initialize() {
            warn!("{} encoder initialization failed: {}", self.backend.name(), e);
            self.teardown();
            return Err(e);
        }

        info!(
            "Initialized {} {} encoder: {}x{} @ {} fps, {} kbps CBR",
            self.backend.name(),
            self.config.codec,
            self.config.width,
            self.config.height,
            self.config.fps,
            self.config.bitrate_kbps
        );
        Ok(())
    }

    fn try_initialize(&mut self) -> EncoderResult<()> {
        self.config.validate()?;

        self.backend.load_api()?;

        let device = self.adapter.device().native_device();
        self.backend.open_session(device)?;
        self.session_open = true;

        let mut preset = self.backend.preset_config(self.config.codec)?;
        preset.rate_control.apply_cbr(self.config.bitrate_kbps);
        self.policy.configure(&mut preset, self.config.fps);

        self.backend.initialize(&InitializeParams {
            codec: self.config.codec,
            width: self.config.width,
            height: self.config.height,
            fps: self.config.fps,
            preset,
        })?;

        self.bitstream = Some(self.backend.create_bitstream_buffer()?);
        self.initialized = true;
        self.force_idr = true;
        self.flushed = false;
        Ok(())
    }

    /// Adapt a host texture and encode it
    pub fn encode_texture(
        &mut self,
        source: TextureHandle,
        timestamp: i64,
    ) -> EncoderResult<Vec<EncodedPacket>> {
        if !self.initialized {
            return Err(EncoderError::NotInitialized);
        }
        let texture = self.adapter.ensure_encodable(source)?;
        self.encode(&texture, timestamp)
    }

    /// Encode one adapted texture
    ///
    /// Returns an empty list when the hardware produced no output for this
    /// submission.
    pub fn encode(
        &mut self,
        texture: &EncodableTexture,
        timestamp: i64,
    ) -> EncoderResult<Vec<EncodedPacket>> {
        let output = match self.bitstream {
            Some(buffer) if self.initialized => buffer,
            _ => return Err(EncoderError::NotInitialized),
        };

        let result = self.submit(texture, output, timestamp);
        if result.is_err() {
            self.stats.failures += 1;
        }
        result
    }

    fn submit(
        &mut self,
        texture: &EncodableTexture,
        output: BitstreamBuffer,
        timestamp: i64,
    ) -> EncoderResult<Vec<EncodedPacket>> {
        let resource = self.registration_for(texture)?;
        let input = self.backend.map_input(resource)?;

        let force_idr = std::mem::replace(&mut self.force_idr, false);
        let picture = PictureParams {
            input: Some(input),
            output,
            width: texture.width,
            height: texture.height,
            order: texture.order,
            timestamp,
            force_idr,
            end_of_stream: false,
        };

        if let Err(e) = self.backend.encode_picture(&picture) {
            let _ = self.backend.unmap_input(input);
            return Err(e);
        }
        self.stats.frames_submitted += 1;

        let data = match self.backend.lock_bitstream(output) {
            Ok(bytes) => Bytes::copy_from_slice(bytes),
            Err(e) => {
                let _ = self.backend.unmap_input(input);
                return Err(e);
            }
        };

        if let Err(e) = self.backend.unlock_bitstream(output) {
            debug!("Bitstream unlock failed: {}", e);
        }
        if let Err(e) = self.backend.unmap_input(input) {
            debug!("Input unmap failed: {}", e);
        }

        Ok(self.emit(data, Some(timestamp)).into_iter().collect())
    }

    fn registration_for(&mut self, texture: &EncodableTexture) -> EncoderResult<RegisteredResource> {
        if let Some(resource) = self.registrations.get(&texture.handle) {
            return Ok(*resource);
        }

        let resource = self.backend.register_resource(texture)?;
        self.registrations.insert(texture.handle, resource);
        self.stats.registrations += 1;
        debug!(
            "Registered {}x{} texture {:#x} with encoder",
            texture.width,
            texture.height,
            texture.handle.id()
        );
        Ok(resource)
    }

    fn emit(&mut self, data: Bytes, timestamp: Option<i64>) -> Option<EncodedPacket> {
        if data.is_empty() {
            return None;
        }
        let is_keyframe = self.policy.packet_is_keyframe(&data);
        self.stats.packets += 1;
        self.stats.bytes_output += data.len() as u64;
        if is_keyframe {
            self.stats.keyframes += 1;
        }
        Some(EncodedPacket::new(data, is_keyframe, timestamp))
    }

    /// Signal end of stream and drain buffered output
    ///
    /// Only the first call submits anything. Drained packets carry no
    /// timestamp.
    pub fn flush(&mut self) -> EncoderResult<Vec<EncodedPacket>> {
        let output = match self.bitstream {
            Some(buffer) if self.initialized && !self.flushed => buffer,
            _ => return Ok(Vec::new()),
        };
        self.flushed = true;

        let picture = PictureParams {
            input: None,
            output,
            width: self.config.width,
            height: self.config.height,
            order: capture::ChannelOrder::Abgr,
            timestamp: 0,
            force_idr: false,
            end_of_stream: true,
        };
        self.backend.encode_picture(&picture)?;

        let data = Bytes::copy_from_slice(self.backend.lock_bitstream(output)?);
        if let Err(e) = self.backend.unlock_bitstream(output) {
            debug!("Bitstream unlock failed: {}", e);
        }

        Ok(self.emit(data, None).into_iter().collect())
    }

    /// Release every hardware resource; the session must be re-created to
    /// encode again
    pub fn release(&mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if !self.session_open {
            return;
        }

        for (_, resource) in self.registrations.drain() {
            self.backend.unregister_resource(resource);
        }
        if let Some(buffer) = self.bitstream.take() {
            self.backend.destroy_bitstream_buffer(buffer);
        }
        self.backend.destroy();
        // Conversion textures outlive their registrations.
        self.adapter.release();

        self.session_open = false;
        self.initialized = false;
        debug!("{} encoder session destroyed", self.backend.name());
    }
}

impl Drop for EncoderSession {
    fn drop(&mut self) {
        self.teardown();
    }
}
