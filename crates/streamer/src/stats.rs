//! Per-stream counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Stream statistics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamStats {
    pub frames_encoded: u64,
    pub encode_failures: u64,
    pub packets_sent: u64,
    pub bytes_sent: u64,
    pub transport_opens: u64,
    pub transport_failures: u64,
    pub dropped_ticks: u64,
}

/// Live counters, written by the worker and read by anyone
#[derive(Debug, Default)]
pub(crate) struct StreamCounters {
    frames_encoded: AtomicU64,
    encode_failures: AtomicU64,
    packets_sent: AtomicU64,
    bytes_sent: AtomicU64,
    transport_opens: AtomicU64,
    transport_failures: AtomicU64,
    dropped_ticks: AtomicU64,
}

impl StreamCounters {
    pub(crate) fn frame_encoded(&self) {
        self.frames_encoded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn encode_failed(&self) {
        self.encode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn packet_sent(&self, bytes: usize) {
        self.packets_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub(crate) fn transport_opened(&self) {
        self.transport_opens.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn transport_failed(&self) {
        self.transport_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn ticks_dropped(&self, count: u64) {
        if count > 0 {
            self.dropped_ticks.fetch_add(count, Ordering::Relaxed);
        }
    }

    pub(crate) fn snapshot(&self) -> StreamStats {
        StreamStats {
            frames_encoded: self.frames_encoded.load(Ordering::Relaxed),
            encode_failures: self.encode_failures.load(Ordering::Relaxed),
            packets_sent: self.packets_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            transport_opens: self.transport_opens.load(Ordering::Relaxed),
            transport_failures: self.transport_failures.load(Ordering::Relaxed),
            dropped_ticks: self.dropped_ticks.load(Ordering::Relaxed),
        }
    }
}
