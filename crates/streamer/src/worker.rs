//! Per-stream worker loop

use std::sync::Arc;
use std::sync::atomic::Ordering;

use crossbeam_channel::Receiver;
use shared_protocol::{StreamConfig, now_ticks};
use tracing::{debug, info, warn};

use crate::Pacer;
use crate::stream::{StreamShared, WorkerParts};

/// Pace, encode and send until the running flag clears
///
/// The transport is (re)opened lazily on the tick it is needed and a failed
/// open or send only costs that tick; the encoder session is left alone.
/// Losing the source texture or the encoder faults the stream. The parts
/// are handed back so the controlling side can flush and release them.
pub(crate) fn run(
    shared: Arc<StreamShared>,
    config: StreamConfig,
    mut parts: WorkerParts,
    wakeup: Receiver<()>,
) -> WorkerParts {
    info!(
        "Stream worker started: {} {}x{}@{} {}",
        config.destination, config.width, config.height, config.fps, config.codec
    );

    let mut pacer = Pacer::new(config.frame_interval());

    while shared.running.load(Ordering::SeqCst) {
        let (deadline, skipped) = pacer.advance();
        shared.counters.ticks_dropped(skipped);

        let source = {
            let source = shared.source.lock();
            if !shared.running.load(Ordering::SeqCst) {
                break;
            }
            *source
        };

        let encoder = parts.encoder.as_mut().filter(|e| e.is_initialized());
        let (Some(source), Some(encoder)) = (source, encoder) else {
            warn!("Stream worker lost its source texture or encoder, stopping");
            shared.fault();
            parts.transport.close();
            break;
        };

        if !parts.transport.is_open() {
            match parts.transport.open(
                &config.destination,
                config.width,
                config.height,
                config.codec,
            ) {
                Ok(()) => shared.counters.transport_opened(),
                Err(e) => {
                    shared.counters.transport_failed();
                    warn!("Transport open failed, retrying next tick: {}", e);
                    Pacer::wait_until(deadline, &wakeup);
                    continue;
                }
            }
        }

        let timestamp = now_ticks();
        match encoder.encode_texture(source, timestamp) {
            Ok(packets) => {
                shared.counters.frame_encoded();
                for packet in &packets {
                    if let Err(e) = parts.transport.send(packet) {
                        warn!("Send failed, closing transport: {}", e);
                        shared.counters.transport_failed();
                        parts.transport.close();
                        break;
                    }
                    shared.counters.packet_sent(packet.len());
                }
            }
            Err(e) => {
                shared.counters.encode_failed();
                debug!("Frame encode failed: {}", e);
            }
        }

        Pacer::wait_until(deadline, &wakeup);
    }

    info!("Stream worker finished: {}", config.destination);
    parts
}
