//! Conversion of host textures into encoder inputs

use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    CaptureError, CaptureResult, EncodableTexture, GpuDevice, TextureDesc, TextureFormat,
    TextureHandle,
};

struct ScratchTexture {
    handle: TextureHandle,
    width: u32,
    height: u32,
    format: TextureFormat,
}

/// Adapter statistics
#[derive(Debug, Clone, Default)]
pub struct AdapterStats {
    /// Scratch textures allocated
    pub allocations: u64,
    /// Frames copied into the scratch texture
    pub copies: u64,
}

/// Turns arbitrary host textures into textures the encoder accepts
///
/// Typeless sources are copied every frame into a scratch texture with a
/// concrete format. The scratch texture is reused until the source size
/// changes. Replaced scratch textures are retired, not freed: the encoder
/// may still hold a registration for them, so they live until `release`
/// or drop.
pub struct ResourceAdapter {
    device: Arc<dyn GpuDevice>,
    scratch: Option<ScratchTexture>,
    retired: Vec<ScratchTexture>,
    stats: AdapterStats,
}

impl ResourceAdapter {
    pub fn new(device: Arc<dyn GpuDevice>) -> Self {
        Self {
            device,
            scratch: None,
            retired: Vec::new(),
            stats: AdapterStats::default(),
        }
    }

    pub fn device(&self) -> &Arc<dyn GpuDevice> {
        &self.device
    }

    pub fn stats(&self) -> AdapterStats {
        self.stats.clone()
    }

    /// Resolve `source` into an encodable texture
    pub fn ensure_encodable(&mut self, source: TextureHandle) -> CaptureResult<EncodableTexture> {
        let desc = self.device.describe(source)?;

        if !desc.is_simple() {
            return Err(CaptureError::UnsupportedResourceLayout {
                samples: desc.sample_count,
                array_size: desc.array_size,
                mip_levels: desc.mip_levels,
            });
        }

        let (handle, format) = if desc.format.is_typeless() {
            let concrete = desc.format.concrete();
            let scratch = self.scratch_for(desc.width, desc.height, concrete)?;
            self.device.copy_texture(scratch, source)?;
            self.stats.copies += 1;
            (scratch, concrete)
        } else {
            (source, desc.format)
        };

        let order = format
            .channel_order()
            .ok_or(CaptureError::UnsupportedFormat(format))?;

        Ok(EncodableTexture {
            handle,
            width: desc.width,
            height: desc.height,
            order,
        })
    }

    fn scratch_for(
        &mut self,
        width: u32,
        height: u32,
        format: TextureFormat,
    ) -> CaptureResult<TextureHandle> {
        if let Some(scratch) = &self.scratch {
            if scratch.width == width && scratch.height == height && scratch.format == format {
                return Ok(scratch.handle);
            }
        }

        if let Some(old) = self.scratch.take() {
            debug!("Retiring {}x{} conversion texture", old.width, old.height);
            self.retired.push(old);
        }

        let handle = self
            .device
            .create_texture(&TextureDesc::simple(width, height, format))?;
        self.stats.allocations += 1;
        info!("Allocated {}x{} {:?} conversion texture", width, height, format);

        self.scratch = Some(ScratchTexture {
            handle,
            width,
            height,
            format,
        });
        Ok(handle)
    }

    /// Free every conversion texture, current and retired
    ///
    /// Call only once nothing refers to them any more (after the encoder
    /// has unregistered its resources).
    pub fn release(&mut self) {
        for old in self.retired.drain(..).chain(self.scratch.take()) {
            debug!("Releasing {}x{} conversion texture", old.width, old.height);
            self.device.release_texture(old.handle);
        }
    }
}

impl Drop for ResourceAdapter {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChannelOrder;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeDevice {
        textures: Mutex<HashMap<usize, TextureDesc>>,
        next_id: Mutex<usize>,
        created: Mutex<u32>,
        released: Mutex<Vec<usize>>,
        copies: Mutex<u32>,
    }

    impl FakeDevice {
        fn add(&self, desc: TextureDesc) -> TextureHandle {
            let mut next = self.next_id.lock();
            *next += 1;
            let id = 0x1000 + *next;
            self.textures.lock().insert(id, desc);
            TextureHandle::from_id(id).unwrap()
        }

        fn resize(&self, handle: TextureHandle, width: u32, height: u32) {
            let mut textures = self.textures.lock();
            let desc = textures.get_mut(&handle.id()).unwrap();
            desc.width = width;
            desc.height = height;
        }
    }

    impl GpuDevice for FakeDevice {
        fn describe(&self, texture: TextureHandle) -> CaptureResult<TextureDesc> {
            self.textures
                .lock()
                .get(&texture.id())
                .copied()
                .ok_or(CaptureError::NullTexture)
        }

        fn create_texture(&self, desc: &TextureDesc) -> CaptureResult<TextureHandle> {
            *self.created.lock() += 1;
            Ok(self.add(*desc))
        }

        fn copy_texture(&self, _dst: TextureHandle, _src: TextureHandle) -> CaptureResult<()> {
            *self.copies.lock() += 1;
            Ok(())
        }

        fn release_texture(&self, texture: TextureHandle) {
            self.released.lock().push(texture.id());
        }

        fn native_device(&self) -> *mut std::ffi::c_void {
            std::ptr::null_mut()
        }
    }

    fn setup() -> (Arc<FakeDevice>, ResourceAdapter) {
        let device = Arc::new(FakeDevice::default());
        let adapter = ResourceAdapter::new(device.clone());
        (device, adapter)
    }

    #[test]
    fn test_concrete_source_passes_through() {
        let (device, mut adapter) = setup();
        let src = device.add(TextureDesc::simple(640, 480, TextureFormat::Bgra8UnormSrgb));

        let out = adapter.ensure_encodable(src).unwrap();
        assert_eq!(out.handle, src);
        assert_eq!(out.order, ChannelOrder::Argb);
        assert_eq!(*device.created.lock(), 0);
        assert_eq!(*device.copies.lock(), 0);
    }

    #[test]
    fn test_typeless_allocates_once() {
        let (device, mut adapter) = setup();
        let src = device.add(TextureDesc::simple(640, 480, TextureFormat::Rgba8Typeless));

        let first = adapter.ensure_encodable(src).unwrap();
        let second = adapter.ensure_encodable(src).unwrap();

        assert_ne!(first.handle, src);
        assert_eq!(first.handle, second.handle);
        assert_eq!(first.order, ChannelOrder::Abgr);
        assert_eq!(*device.created.lock(), 1);
        assert_eq!(*device.copies.lock(), 2);
        assert_eq!(adapter.stats().allocations, 1);
    }

    #[test]
    fn test_typeless_reallocates_on_resize() {
        let (device, mut adapter) = setup();
        let src = device.add(TextureDesc::simple(640, 480, TextureFormat::Rgba8Typeless));

        let first = adapter.ensure_encodable(src).unwrap();
        device.resize(src, 1280, 720);
        let second = adapter.ensure_encodable(src).unwrap();
        let third = adapter.ensure_encodable(src).unwrap();

        assert_ne!(first.handle, second.handle);
        assert_eq!(second.handle, third.handle);
        assert_eq!(second.width, 1280);
        assert_eq!(*device.created.lock(), 2);
        assert!(device.released.lock().is_empty());

        drop(adapter);
        assert_eq!(
            *device.released.lock(),
            vec![first.handle.id(), second.handle.id()]
        );
    }

    #[test]
    fn test_release_frees_all_and_restarts() {
        let (device, mut adapter) = setup();
        let src = device.add(TextureDesc::simple(64, 64, TextureFormat::Bgra8Typeless));

        let first = adapter.ensure_encodable(src).unwrap().handle;
        adapter.release();
        assert_eq!(*device.released.lock(), vec![first.id()]);

        let second = adapter.ensure_encodable(src).unwrap().handle;
        assert_ne!(first, second);
        drop(adapter);
        assert_eq!(*device.released.lock(), vec![first.id(), second.id()]);
    }

    #[test]
    fn test_rejects_multisampled() {
        let (device, mut adapter) = setup();
        let mut desc = TextureDesc::simple(640, 480, TextureFormat::Rgba8Unorm);
        desc.sample_count = 4;
        let src = device.add(desc);

        assert!(matches!(
            adapter.ensure_encodable(src),
            Err(CaptureError::UnsupportedResourceLayout { samples: 4, .. })
        ));
    }

    #[test]
    fn test_rejects_mips_and_arrays() {
        let (device, mut adapter) = setup();
        let mut desc = TextureDesc::simple(64, 64, TextureFormat::Rgba8Unorm);
        desc.mip_levels = 3;
        let mipped = device.add(desc);
        let mut desc = TextureDesc::simple(64, 64, TextureFormat::Rgba8Unorm);
        desc.array_size = 2;
        let layered = device.add(desc);

        assert!(adapter.ensure_encodable(mipped).is_err());
        assert!(adapter.ensure_encodable(layered).is_err());
    }

    #[test]
    fn test_rejects_unknown_format() {
        let (device, mut adapter) = setup();
        let src = device.add(TextureDesc::simple(64, 64, TextureFormat::Other(10)));

        assert!(matches!(
            adapter.ensure_encodable(src),
            Err(CaptureError::UnsupportedFormat(TextureFormat::Other(10)))
        ));
    }

    #[test]
    fn test_drop_releases_scratch() {
        let (device, mut adapter) = setup();
        let src = device.add(TextureDesc::simple(64, 64, TextureFormat::Bgra8Typeless));
        let scratch = adapter.ensure_encodable(src).unwrap().handle;

        drop(adapter);
        assert_eq!(*device.released.lock(), vec![scratch.id()]);
    }
}
