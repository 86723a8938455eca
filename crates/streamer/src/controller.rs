//! Stream lifecycle controller

use std::sync::Arc;

use capture::TextureHandle;
use parking_lot::RwLock;
use shared_protocol::StreamConfig;
use tracing::{info, warn};

use crate::handle::Arena;
use crate::stream::Stream;
use crate::{HostContext, StreamError, StreamHandle, StreamResult, StreamState, StreamStats};

/// Owner of every stream created through one host context
///
/// Operations on different streams never contend: the arena lock is only
/// held long enough to resolve a handle.
pub struct StreamController {
    context: HostContext,
    streams: RwLock<Arena<Arc<Stream>>>,
}

impl StreamController {
    pub fn new(context: HostContext) -> Self {
        Self {
            context,
            streams: RwLock::new(Arena::new()),
        }
    }

    pub fn context(&self) -> &HostContext {
        &self.context
    }

    /// Number of live streams
    pub fn len(&self) -> usize {
        self.streams.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, handle: StreamHandle) -> StreamResult<Arc<Stream>> {
        self.streams
            .read()
            .get(handle)
            .cloned()
            .ok_or(StreamError::InvalidHandle)
    }

    /// Validate, build and initialize a stream
    ///
    /// Nothing is registered unless the encoder session initialized.
    pub fn create(
        &self,
        config: StreamConfig,
        source: Option<TextureHandle>,
    ) -> StreamResult<StreamHandle> {
        let source = source.ok_or(StreamError::NullTexture)?;
        config.validate()?;

        let stream = Stream::new(&self.context, config, source).inspect_err(|e| {
            warn!("Stream create failed: {}", e);
        })?;

        let destination = stream.config().destination.clone();
        let handle = self.streams.write().insert(Arc::new(stream));
        info!("Stream {} created for {}", handle, destination);
        Ok(handle)
    }

    /// Start the worker; rejected while already running
    pub fn start(&self, handle: StreamHandle) -> StreamResult<()> {
        let stream = self.lookup(handle)?;
        stream.start(&self.context).inspect_err(|e| {
            warn!("Stream {} start rejected: {}", handle, e);
        })?;
        info!("Stream {} started", handle);
        Ok(())
    }

    /// Stop the worker, drain the encoder and close the transport
    pub fn stop(&self, handle: StreamHandle) -> StreamResult<()> {
        self.lookup(handle)?.stop();
        Ok(())
    }

    /// Stop if needed and forget the handle
    pub fn destroy(&self, handle: StreamHandle) -> StreamResult<()> {
        let stream = self
            .streams
            .write()
            .remove(handle)
            .ok_or(StreamError::InvalidHandle)?;
        stream.shutdown();
        info!("Stream {} destroyed", handle);
        Ok(())
    }

    /// Point the stream at another source texture
    pub fn set_source(&self, handle: StreamHandle, source: Option<TextureHandle>) -> StreamResult<()> {
        let source = source.ok_or(StreamError::NullTexture)?;
        self.lookup(handle)?.set_source(Some(source));
        Ok(())
    }

    /// Withdraw the source texture; a running worker faults on its next tick
    pub fn detach_source(&self, handle: StreamHandle) -> StreamResult<()> {
        self.lookup(handle)?.set_source(None);
        Ok(())
    }

    pub fn state(&self, handle: StreamHandle) -> StreamResult<StreamState> {
        Ok(self.lookup(handle)?.state())
    }

    pub fn stats(&self, handle: StreamHandle) -> StreamResult<StreamStats> {
        Ok(self.lookup(handle)?.stats())
    }

    pub fn config(&self, handle: StreamHandle) -> StreamResult<StreamConfig> {
        Ok(self.lookup(handle)?.config().clone())
    }
}

impl Drop for StreamController {
    fn drop(&mut self) {
        let streams = self.streams.get_mut().drain();
        for stream in streams {
            stream.shutdown();
        }
    }
}
