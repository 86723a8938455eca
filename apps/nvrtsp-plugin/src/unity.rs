//! Unity native plugin bootstrap

use std::ffi::c_void;

use anyhow::{Context, bail};
use tracing::{info, warn};

use crate::api::guard;
use crate::host;

/// `IUnityGraphicsD3D11` interface GUID
const UNITY_GRAPHICS_D3D11: (u64, u64) = (0xAAB3_7EF8_7A87_D748, 0xBF76_967F_07EF_B177);

#[repr(C)]
#[derive(Clone, Copy)]
pub struct UnityInterfaceGuid {
    high: u64,
    low: u64,
}

/// Interface registry handed to `UnityPluginLoad`
#[repr(C)]
pub struct IUnityInterfaces {
    get_interface: Option<unsafe extern "system" fn(UnityInterfaceGuid) -> *mut c_void>,
    #[allow(dead_code)]
    register_interface: Option<unsafe extern "system" fn(UnityInterfaceGuid, *mut c_void)>,
    get_interface_split: Option<unsafe extern "system" fn(u64, u64) -> *mut c_void>,
    #[allow(dead_code)]
    register_interface_split: Option<unsafe extern "system" fn(u64, u64, *mut c_void)>,
}

/// Leading slot of `IUnityGraphicsD3D11`; the remaining slots are unused
#[repr(C)]
struct IUnityGraphicsD3D11 {
    get_device: Option<unsafe extern "system" fn() -> *mut c_void>,
}

unsafe fn load(interfaces: *mut IUnityInterfaces) -> anyhow::Result<()> {
    // SAFETY: Unity passes a valid registry or null.
    let interfaces = unsafe { interfaces.as_ref() }.context("null IUnityInterfaces")?;

    let graphics = match interfaces.get_interface_split {
        // SAFETY: registry function called with a well-formed GUID.
        Some(get) => unsafe { get(UNITY_GRAPHICS_D3D11.0, UNITY_GRAPHICS_D3D11.1) },
        None => {
            let get = interfaces.get_interface.context("GetInterface missing")?;
            let guid = UnityInterfaceGuid {
                high: UNITY_GRAPHICS_D3D11.0,
                low: UNITY_GRAPHICS_D3D11.1,
            };
            // SAFETY: as above.
            unsafe { get(guid) }
        }
    };

    // SAFETY: a non-null result is an IUnityGraphicsD3D11 table.
    let graphics = unsafe { graphics.cast::<IUnityGraphicsD3D11>().as_ref() }
        .context("IUnityGraphicsD3D11 not available")?;
    let get_device = graphics.get_device.context("GetDevice missing")?;

    // SAFETY: Unity owns the device for the process lifetime.
    let device = unsafe { get_device() };
    if device.is_null() {
        bail!("GetDevice returned null");
    }

    unsafe { host::install_device(device) }
}

/// Called by Unity when the plugin is loaded
///
/// # Safety
/// `interfaces` must be the registry Unity passes to native plugins.
#[allow(non_snake_case)]
#[unsafe(no_mangle)]
pub unsafe extern "system" fn UnityPluginLoad(interfaces: *mut IUnityInterfaces) {
    guard("UnityPluginLoad", (), || match unsafe { load(interfaces) } {
        Ok(()) => info!("UnityPluginLoad OK"),
        Err(e) => warn!("UnityPluginLoad: {:#}", e),
    })
}

/// Called by Unity before the plugin is unloaded
#[allow(non_snake_case)]
#[unsafe(no_mangle)]
pub extern "system" fn UnityPluginUnload() {
    guard("UnityPluginUnload", (), host::shutdown)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ptr;

    unsafe extern "system" fn no_interface(_high: u64, _low: u64) -> *mut c_void {
        ptr::null_mut()
    }

    #[test]
    fn test_null_registry_rejected() {
        assert!(unsafe { load(ptr::null_mut()) }.is_err());
    }

    #[test]
    fn test_missing_d3d11_interface() {
        let mut interfaces = IUnityInterfaces {
            get_interface: None,
            register_interface: None,
            get_interface_split: Some(no_interface),
            register_interface_split: None,
        };

        let err = unsafe { load(&mut interfaces) }.unwrap_err();
        assert!(err.to_string().contains("IUnityGraphicsD3D11"));
    }
}
