//! Per-handle stream state

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use capture::TextureHandle;
use crossbeam_channel::{Sender, bounded};
use encoder::{EncoderConfig, EncoderSession};
use net_transport::{StreamTransport, TransportConfig};
use parking_lot::{Mutex, RwLock};
use shared_protocol::StreamConfig;
use tracing::{debug, error, info};

use crate::stats::StreamCounters;
use crate::{HostContext, StreamError, StreamResult, StreamStats, worker};

/// Observable stream lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Encoder initialized, worker not started yet
    Created,
    Running,
    /// Stopped by the host; encoder released until the next start
    Stopped,
    /// Worker exited on its own after losing its source or encoder
    Faulted,
}

impl StreamState {
    pub fn as_raw(&self) -> i32 {
        match self {
            Self::Created => 0,
            Self::Running => 1,
            Self::Stopped => 2,
            Self::Faulted => 3,
        }
    }
}

/// State shared between the controlling side and the worker
pub(crate) struct StreamShared {
    pub(crate) running: AtomicBool,
    pub(crate) source: Mutex<Option<TextureHandle>>,
    pub(crate) counters: StreamCounters,
    state: RwLock<StreamState>,
}

impl StreamShared {
    fn new(source: TextureHandle) -> Self {
        Self {
            running: AtomicBool::new(false),
            source: Mutex::new(Some(source)),
            counters: StreamCounters::default(),
            state: RwLock::new(StreamState::Created),
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub(crate) fn state(&self) -> StreamState {
        *self.state.read()
    }

    fn set_state(&self, state: StreamState) {
        *self.state.write() = state;
    }

    /// Self-stop after fatal precondition loss
    pub(crate) fn fault(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.set_state(StreamState::Faulted);
    }
}

/// Everything the worker needs exclusive access to
pub(crate) struct WorkerParts {
    pub(crate) encoder: Option<EncoderSession>,
    pub(crate) transport: StreamTransport,
}

#[derive(Default)]
struct WorkerSlot {
    parts: Option<WorkerParts>,
    thread: Option<JoinHandle<WorkerParts>>,
    wakeup: Option<Sender<()>>,
    closed: bool,
}

/// One stream: configuration, shared state and the worker slot
///
/// The slot mutex serializes start/stop/destroy. The worker never takes
/// it, so holding it while joining is safe.
pub(crate) struct Stream {
    config: StreamConfig,
    shared: Arc<StreamShared>,
    slot: Mutex<WorkerSlot>,
}

impl Stream {
    /// Build and initialize the encoder and transport for a new stream
    pub(crate) fn new(
        context: &HostContext,
        config: StreamConfig,
        source: TextureHandle,
    ) -> StreamResult<Self> {
        let encoder = build_encoder(context, &config)?;
        let transport = StreamTransport::new(
            context.create_muxer()?,
            TransportConfig::from(&config.transport),
        );

        Ok(Self {
            shared: Arc::new(StreamShared::new(source)),
            slot: Mutex::new(WorkerSlot {
                parts: Some(WorkerParts {
                    encoder: Some(encoder),
                    transport,
                }),
                ..Default::default()
            }),
            config,
        })
    }

    pub(crate) fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub(crate) fn state(&self) -> StreamState {
        self.shared.state()
    }

    pub(crate) fn stats(&self) -> StreamStats {
        self.shared.counters.snapshot()
    }

    pub(crate) fn set_source(&self, source: Option<TextureHandle>) {
        *self.shared.source.lock() = source;
    }

    /// Spawn the worker
    ///
    /// A stream whose encoder was released by an earlier stop (or lost to a
    /// fault) gets a freshly initialized session first.
    pub(crate) fn start(&self, context: &HostContext) -> StreamResult<()> {
        let mut slot = self.slot.lock();
        if slot.closed {
            return Err(StreamError::InvalidHandle);
        }
        if self.shared.is_running() {
            return Err(StreamError::AlreadyRunning);
        }

        // A faulted worker is still parked in the slot.
        self.finish(&mut slot);

        let mut parts = match slot.parts.take() {
            Some(parts) => parts,
            None => WorkerParts {
                encoder: None,
                transport: StreamTransport::new(
                    context.create_muxer()?,
                    TransportConfig::from(&self.config.transport),
                ),
            },
        };

        if parts.encoder.is_none() {
            match build_encoder(context, &self.config) {
                Ok(encoder) => parts.encoder = Some(encoder),
                Err(e) => {
                    slot.parts = Some(parts);
                    return Err(e);
                }
            }
        }

        let (wakeup_tx, wakeup_rx) = bounded(1);
        let shared = self.shared.clone();
        let config = self.config.clone();

        let previous = self.shared.state();
        self.shared.running.store(true, Ordering::SeqCst);
        self.shared.set_state(StreamState::Running);
        let spawned = thread::Builder::new()
            .name("nvrtsp-worker".to_string())
            .spawn(move || worker::run(shared, config, parts, wakeup_rx));

        match spawned {
            Ok(thread) => {
                slot.thread = Some(thread);
                slot.wakeup = Some(wakeup_tx);
                Ok(())
            }
            Err(e) => {
                self.shared.running.store(false, Ordering::SeqCst);
                self.shared.set_state(previous);
                error!("Failed to spawn stream worker: {}", e);
                Err(StreamError::Spawn(e))
            }
        }
    }

    /// Stop the worker and release the encoder
    ///
    /// Safe to call repeatedly and before `start`. A faulted stream is still
    /// joined and torn down here.
    pub(crate) fn stop(&self) {
        let mut slot = self.slot.lock();
        self.stop_locked(&mut slot);
    }

    /// Stop and refuse any further start
    pub(crate) fn shutdown(&self) {
        let mut slot = self.slot.lock();
        self.stop_locked(&mut slot);
        slot.closed = true;
        slot.parts = None;
    }

    fn stop_locked(&self, slot: &mut WorkerSlot) {
        let was_running = self
            .shared
            .running
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();

        if !was_running && slot.thread.is_none() {
            return;
        }

        self.finish(slot);
        self.shared.set_state(StreamState::Stopped);
        info!("Stream to {} stopped", self.config.destination);
    }

    /// Join the worker, then flush the encoder into the transport and
    /// close both
    fn finish(&self, slot: &mut WorkerSlot) {
        if let Some(wakeup) = slot.wakeup.take() {
            let _ = wakeup.try_send(());
        }

        let Some(thread) = slot.thread.take() else {
            return;
        };

        let mut parts = match thread.join() {
            Ok(parts) => parts,
            Err(_) => {
                error!("Stream worker for {} panicked", self.config.destination);
                return;
            }
        };

        if let Some(mut encoder) = parts.encoder.take() {
            match encoder.flush() {
                Ok(tail) => {
                    for packet in tail {
                        if let Err(e) = parts.transport.send(&packet) {
                            debug!("Dropping flushed packet: {}", e);
                            break;
                        }
                        self.shared.counters.packet_sent(packet.len());
                    }
                }
                Err(e) => debug!("Encoder flush failed: {}", e),
            }
            encoder.release();
        }

        parts.transport.close();
        slot.parts = Some(parts);
    }
}

fn build_encoder(context: &HostContext, config: &StreamConfig) -> StreamResult<EncoderSession> {
    let backend = context.create_encoder()?;
    let mut session = EncoderSession::new(
        backend,
        context.device().clone(),
        EncoderConfig::from(config),
    );
    session.initialize()?;
    Ok(session)
}
