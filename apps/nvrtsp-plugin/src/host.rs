//! Process-wide host context

use std::ffi::c_void;
use std::sync::Arc;

use anyhow::{Context, bail};
use parking_lot::{RwLock, const_rwlock};
use streamer::{HostContext, StreamController};
use tracing::info;

static CONTROLLER: RwLock<Option<Arc<StreamController>>> = const_rwlock(None);

/// Wrap the host's device and build the controller every stream lives in
///
/// # Safety
/// `native_device` must be null or a live `ID3D11Device*` that outlives
/// the plugin.
pub unsafe fn install_device(native_device: *mut c_void) -> anyhow::Result<()> {
    let mut slot = CONTROLLER.write();
    if slot.is_some() {
        bail!("host device already installed");
    }

    let device = unsafe { capture::device_from_raw(native_device) }
        .context("wrapping host graphics device")?;
    let context = HostContext::with_platform_backends(device);
    *slot = Some(Arc::new(StreamController::new(context)));

    info!("Host device installed");
    Ok(())
}

/// Controller for the installed device, if any
pub fn controller() -> anyhow::Result<Arc<StreamController>> {
    CONTROLLER
        .read()
        .clone()
        .context("no graphics device; load the plugin through the host first")
}

/// Drop the controller, stopping and destroying every stream
pub fn shutdown() {
    let controller = CONTROLLER.write().take();
    if let Some(controller) = controller {
        info!("Host shutting down with {} stream(s)", controller.len());
    }
}
