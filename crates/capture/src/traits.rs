//! GPU device trait abstraction

use crate::{CaptureResult, TextureDesc, TextureHandle};

/// Graphics device the pipeline reads host textures through
///
/// Implementations wrap a device shared with the host renderer, so every
/// method may be called from a stream's worker thread.
pub trait GpuDevice: Send + Sync {
    /// Describe a texture
    fn describe(&self, texture: TextureHandle) -> CaptureResult<TextureDesc>;

    /// Allocate a texture bindable as shader resource and render target
    fn create_texture(&self, desc: &TextureDesc) -> CaptureResult<TextureHandle>;

    /// Copy the full contents of `src` into `dst`
    fn copy_texture(&self, dst: TextureHandle, src: TextureHandle) -> CaptureResult<()>;

    /// Release a texture returned by `create_texture`
    fn release_texture(&self, texture: TextureHandle);

    /// Native device pointer the hardware encoder binds its session to
    fn native_device(&self) -> *mut std::ffi::c_void;
}
