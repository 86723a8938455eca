//! Direct3D 11 device shared with the host renderer

use std::ffi::c_void;

use tracing::{debug, info};
use windows::Win32::Foundation::BOOL;
use windows::Win32::Graphics::Direct3D11::{
    D3D11_BIND_RENDER_TARGET, D3D11_BIND_SHADER_RESOURCE, D3D11_TEXTURE2D_DESC,
    D3D11_USAGE_DEFAULT, ID3D11Device, ID3D11DeviceContext, ID3D11Multithread, ID3D11Texture2D,
};
use windows::Win32::Graphics::Dxgi::Common::{DXGI_FORMAT, DXGI_SAMPLE_DESC};
use windows::core::Interface;

use crate::{CaptureError, CaptureResult, GpuDevice, TextureDesc, TextureFormat, TextureHandle};

/// D3D11 device plus its immediate context
pub struct D3D11Device {
    device: ID3D11Device,
    context: ID3D11DeviceContext,
}

// SAFETY: multithread protection is enabled on the context in `from_raw`,
// which serializes immediate-context calls made from worker threads.
unsafe impl Send for D3D11Device {}
unsafe impl Sync for D3D11Device {}

fn device_error(e: windows::core::Error) -> CaptureError {
    CaptureError::Device(e.to_string())
}

impl D3D11Device {
    /// Take a reference on the host's device
    ///
    /// # Safety
    /// `raw` must point to a live `ID3D11Device`.
    pub unsafe fn from_raw(raw: *mut c_void) -> CaptureResult<Self> {
        let device = unsafe { ID3D11Device::from_raw_borrowed(&raw) }
            .ok_or(CaptureError::DeviceUnavailable)?
            .clone();

        let context = unsafe { device.GetImmediateContext() }.map_err(device_error)?;

        let multithread: ID3D11Multithread = context.cast().map_err(device_error)?;
        let _ = unsafe { multithread.SetMultithreadProtected(BOOL::from(true)) };

        info!("Bound to host D3D11 device with multithread protection");

        Ok(Self { device, context })
    }

    fn texture(handle: TextureHandle) -> CaptureResult<ID3D11Texture2D> {
        let raw = handle.as_ptr();
        unsafe { ID3D11Texture2D::from_raw_borrowed(&raw) }
            .cloned()
            .ok_or(CaptureError::NullTexture)
    }
}

impl GpuDevice for D3D11Device {
    fn describe(&self, texture: TextureHandle) -> CaptureResult<TextureDesc> {
        let texture = Self::texture(texture)?;
        let mut desc = D3D11_TEXTURE2D_DESC::default();
        unsafe { texture.GetDesc(&mut desc) };

        Ok(TextureDesc {
            width: desc.Width,
            height: desc.Height,
            format: TextureFormat::from_dxgi(desc.Format.0 as u32),
            sample_count: desc.SampleDesc.Count,
            array_size: desc.ArraySize,
            mip_levels: desc.MipLevels,
        })
    }

    fn create_texture(&self, desc: &TextureDesc) -> CaptureResult<TextureHandle> {
        let native = D3D11_TEXTURE2D_DESC {
            Width: desc.width,
            Height: desc.height,
            MipLevels: 1,
            ArraySize: 1,
            Format: DXGI_FORMAT(desc.format.to_dxgi() as i32),
            SampleDesc: DXGI_SAMPLE_DESC {
                Count: 1,
                Quality: 0,
            },
            Usage: D3D11_USAGE_DEFAULT,
            BindFlags: (D3D11_BIND_SHADER_RESOURCE.0 | D3D11_BIND_RENDER_TARGET.0) as u32,
            CPUAccessFlags: 0,
            MiscFlags: 0,
        };

        let mut texture: Option<ID3D11Texture2D> = None;
        unsafe { self.device.CreateTexture2D(&native, None, Some(&mut texture)) }
            .map_err(|e| CaptureError::AllocationFailed(e.to_string()))?;
        let texture = texture
            .ok_or_else(|| CaptureError::AllocationFailed("no texture returned".to_string()))?;

        debug!("Created {}x{} D3D11 texture", desc.width, desc.height);

        // Ownership of the COM reference moves into the handle until
        // `release_texture`.
        TextureHandle::from_raw(texture.into_raw()).ok_or(CaptureError::NullTexture)
    }

    fn copy_texture(&self, dst: TextureHandle, src: TextureHandle) -> CaptureResult<()> {
        let dst = Self::texture(dst)?;
        let src = Self::texture(src)?;
        unsafe { self.context.CopyResource(&dst, &src) };
        Ok(())
    }

    fn release_texture(&self, texture: TextureHandle) {
        // SAFETY: handles passed here were produced by `into_raw` above.
        drop(unsafe { ID3D11Texture2D::from_raw(texture.as_ptr()) });
    }

    fn native_device(&self) -> *mut c_void {
        self.device.as_raw()
    }
}
