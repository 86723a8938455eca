//! GPU texture access for the NVRTSP pipeline
//!
//! Provides the device abstraction the encoder reads frames through and
//! the resource adapter that turns host textures into encoder inputs:
//! - Windows: Direct3D 11 (shared with the host renderer)

mod adapter;
mod error;
mod texture;
mod traits;

#[cfg(target_os = "windows")]
mod d3d11;

pub use adapter::*;
pub use error::*;
pub use texture::*;
pub use traits::*;

#[cfg(target_os = "windows")]
pub use d3d11::D3D11Device;

/// Wrap the host's native device pointer in the platform device
///
/// # Safety
/// `native_device` must be null or a live device pointer of the platform's
/// graphics API that stays valid for the returned value's lifetime.
pub unsafe fn device_from_raw(
    native_device: *mut std::ffi::c_void,
) -> CaptureResult<std::sync::Arc<dyn GpuDevice>> {
    if native_device.is_null() {
        return Err(CaptureError::DeviceUnavailable);
    }

    #[cfg(target_os = "windows")]
    {
        let device = unsafe { D3D11Device::from_raw(native_device) }?;
        Ok(std::sync::Arc::new(device))
    }

    #[cfg(not(target_os = "windows"))]
    {
        Err(CaptureError::UnsupportedPlatform)
    }
}
