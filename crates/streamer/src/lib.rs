//! Stream lifecycle for NVRTSP
//!
//! Owns every stream created by the host: one encoder session, one
//! outbound transport and one paced worker thread per stream. Streams are
//! addressed through generation-checked handles.

mod context;
mod controller;
mod error;
mod handle;
mod pacer;
mod stats;
mod stream;
mod worker;

pub use context::*;
pub use controller::*;
pub use error::*;
pub use handle::StreamHandle;
pub use pacer::*;
pub use stats::StreamStats;
pub use stream::StreamState;
