//! Host-supplied collaborators shared by every stream

use std::sync::Arc;

use capture::GpuDevice;
use encoder::{EncoderBackend, EncoderResult};
use net_transport::{MuxerBackend, TransportResult};

type EncoderFactory = dyn Fn() -> EncoderResult<Box<dyn EncoderBackend>> + Send + Sync;
type MuxerFactory = dyn Fn() -> TransportResult<Box<dyn MuxerBackend>> + Send + Sync;

/// GPU device plus the factories that build per-stream backends
///
/// Created once by the host bootstrap and handed to the controller.
#[derive(Clone)]
pub struct HostContext {
    device: Arc<dyn GpuDevice>,
    encoders: Arc<EncoderFactory>,
    muxers: Arc<MuxerFactory>,
}

impl HostContext {
    pub fn new<E, M>(device: Arc<dyn GpuDevice>, encoders: E, muxers: M) -> Self
    where
        E: Fn() -> EncoderResult<Box<dyn EncoderBackend>> + Send + Sync + 'static,
        M: Fn() -> TransportResult<Box<dyn MuxerBackend>> + Send + Sync + 'static,
    {
        Self {
            device,
            encoders: Arc::new(encoders),
            muxers: Arc::new(muxers),
        }
    }

    /// Context using the hardware encoder and muxer built into this binary
    pub fn with_platform_backends(device: Arc<dyn GpuDevice>) -> Self {
        Self::new(device, encoder::create_backend, net_transport::create_muxer)
    }

    pub fn device(&self) -> &Arc<dyn GpuDevice> {
        &self.device
    }

    pub fn create_encoder(&self) -> EncoderResult<Box<dyn EncoderBackend>> {
        (self.encoders)()
    }

    pub fn create_muxer(&self) -> TransportResult<Box<dyn MuxerBackend>> {
        (self.muxers)()
    }
}

impl std::fmt::Debug for HostContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostContext")
            .field("device", &self.device.native_device())
            .finish_non_exhaustive()
    }
}
