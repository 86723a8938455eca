//! NVRTSP plugin
//!
//! C ABI over the stream controller. The host hands over its Direct3D 11
//! device once (Unity's `UnityPluginLoad` or `NVRTSP_InitWithDevice`),
//! then creates one stream per render texture:
//!
//! ```c
//! uint64_t h = NVRTSP_Create(tex, 1920, 1080, 30, 4000, 0, L"rtsp://127.0.0.1:8554/cam0");
//! NVRTSP_Start(h);
//! /* ... */
//! NVRTSP_Destroy(h);
//! ```

mod api;
mod host;
mod logging;
mod unity;
mod wide;

pub use api::*;
pub use logging::LogCallback;
pub use unity::{UnityPluginLoad, UnityPluginUnload};
pub use wide::WChar;
