//! Exported C entry points
//!
//! Every entry point swallows panics and reports failure through its return
//! value; details go to the log callback.

#![allow(non_snake_case)]

use std::ffi::{CStr, c_char, c_int, c_void};
use std::panic::{self, AssertUnwindSafe};

use anyhow::Context;
use capture::TextureHandle;
use shared_protocol::{StreamConfig, VideoCodec};
use streamer::StreamHandle;
use tracing::{error, info, warn};

use crate::host;
use crate::logging::{self, LogCallback};
use crate::wide::{self, WChar};

/// Run an entry point body, mapping a panic to `fallback`
pub(crate) fn guard<T>(name: &str, fallback: T, body: impl FnOnce() -> T) -> T {
    logging::init();
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(value) => value,
        Err(_) => {
            error!("{} panicked", name);
            fallback
        }
    }
}

fn dimension(value: c_int) -> u32 {
    // Negative values become 0 and fail validation.
    u32::try_from(value).unwrap_or(0)
}

fn create(source: *mut c_void, config: StreamConfig) -> anyhow::Result<u64> {
    let controller = host::controller()?;
    let handle = controller.create(config, TextureHandle::from_raw(source))?;
    Ok(handle.as_raw())
}

fn with_handle<T: Copy>(
    name: &str,
    raw: u64,
    fallback: T,
    op: impl FnOnce(StreamHandle) -> anyhow::Result<T>,
) -> T {
    guard(name, fallback, || {
        let result = StreamHandle::from_raw(raw)
            .context("null handle")
            .and_then(op);
        match result {
            Ok(value) => value,
            Err(e) => {
                warn!("{}: {:#}", name, e);
                fallback
            }
        }
    })
}

/// Register the host log sink; null silences logging
#[unsafe(no_mangle)]
pub extern "C" fn NVRTSP_SetLogCallback(callback: Option<LogCallback>) {
    logging::init();
    logging::set_callback(callback);
}

/// Hand over the host's `ID3D11Device*` (non-Unity hosts)
///
/// # Safety
/// `device` must be null or a live `ID3D11Device*` that outlives the plugin.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn NVRTSP_InitWithDevice(device: *mut c_void) -> bool {
    guard("NVRTSP_InitWithDevice", false, || {
        match unsafe { host::install_device(device) } {
            Ok(()) => true,
            Err(e) => {
                warn!("NVRTSP_InitWithDevice: {:#}", e);
                false
            }
        }
    })
}

/// Create a stream for `texture`; returns 0 on failure
///
/// # Safety
/// `texture` must be an `ID3D11Texture2D*` that stays alive while the stream
/// runs. `url` must be null or a NUL-terminated `wchar_t` string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn NVRTSP_Create(
    texture: *mut c_void,
    width: c_int,
    height: c_int,
    fps: c_int,
    bitrate_kbps: c_int,
    codec: c_int,
    url: *const WChar,
) -> u64 {
    guard("NVRTSP_Create", 0, || {
        let result = VideoCodec::from_raw(codec)
            .map_err(anyhow::Error::from)
            .and_then(|codec| {
                let config = StreamConfig {
                    width: dimension(width),
                    height: dimension(height),
                    fps: dimension(fps),
                    bitrate_kbps: dimension(bitrate_kbps),
                    codec,
                    destination: unsafe { wide::to_string(url) },
                    ..Default::default()
                };
                create(texture, config)
            });

        match result {
            Ok(handle) => {
                info!("NVRTSP_Create OK");
                handle
            }
            Err(e) => {
                warn!("NVRTSP_Create: {:#}", e);
                0
            }
        }
    })
}

/// Create a stream from a JSON configuration; returns 0 on failure
///
/// # Safety
/// As [`NVRTSP_Create`]; `config_json` must be null or NUL-terminated UTF-8.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn NVRTSP_CreateWithConfig(
    texture: *mut c_void,
    config_json: *const c_char,
) -> u64 {
    guard("NVRTSP_CreateWithConfig", 0, || {
        let result = (|| {
            if config_json.is_null() {
                anyhow::bail!("null configuration");
            }
            // SAFETY: non-null and NUL-terminated per the contract above.
            let json = unsafe { CStr::from_ptr(config_json) }
                .to_str()
                .context("configuration is not UTF-8")?;
            let config = StreamConfig::from_json(json).context("parsing configuration")?;
            create(texture, config)
        })();

        match result {
            Ok(handle) => {
                info!("NVRTSP_CreateWithConfig OK");
                handle
            }
            Err(e) => {
                warn!("NVRTSP_CreateWithConfig: {:#}", e);
                0
            }
        }
    })
}

/// Start streaming; false if already running or the handle is invalid
#[unsafe(no_mangle)]
pub extern "C" fn NVRTSP_Start(handle: u64) -> bool {
    with_handle("NVRTSP_Start", handle, false, |handle| {
        host::controller()?.start(handle)?;
        Ok(true)
    })
}

/// Stop streaming; the handle stays valid
#[unsafe(no_mangle)]
pub extern "C" fn NVRTSP_Stop(handle: u64) {
    with_handle("NVRTSP_Stop", handle, (), |handle| {
        host::controller()?.stop(handle)?;
        Ok(())
    })
}

/// Stop and free the stream; the handle is invalid afterwards
#[unsafe(no_mangle)]
pub extern "C" fn NVRTSP_Destroy(handle: u64) {
    with_handle("NVRTSP_Destroy", handle, (), |handle| {
        host::controller()?.destroy(handle)?;
        Ok(())
    })
}

/// Point a stream at another texture
///
/// # Safety
/// As for the texture passed to [`NVRTSP_Create`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn NVRTSP_SetTexture(handle: u64, texture: *mut c_void) -> bool {
    with_handle("NVRTSP_SetTexture", handle, false, |handle| {
        host::controller()?.set_source(handle, TextureHandle::from_raw(texture))?;
        Ok(true)
    })
}

/// Stream state: 0 created, 1 running, 2 stopped, 3 faulted, -1 invalid
#[unsafe(no_mangle)]
pub extern "C" fn NVRTSP_GetState(handle: u64) -> i32 {
    guard("NVRTSP_GetState", -1, || {
        let Some(handle) = StreamHandle::from_raw(handle) else {
            return -1;
        };
        host::controller()
            .ok()
            .and_then(|controller| controller.state(handle).ok())
            .map_or(-1, |state| state.as_raw())
    })
}
