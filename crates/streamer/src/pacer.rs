//! Fixed-rate frame pacing

use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};

/// Deadline clock for one worker
///
/// Deadlines advance by one interval per tick. When a tick overruns, the
/// ticks already in the past are skipped instead of being replayed.
#[derive(Debug)]
pub struct Pacer {
    interval: Duration,
    deadline: Instant,
    dropped: u64,
}

impl Pacer {
    pub fn new(interval: Duration) -> Self {
        Self::starting_at(interval, Instant::now())
    }

    pub fn starting_at(interval: Duration, start: Instant) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            deadline: start,
            dropped: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Total ticks skipped so far
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Move to the next deadline; returns it and the ticks skipped
    pub fn advance(&mut self) -> (Instant, u64) {
        self.advance_at(Instant::now())
    }

    pub fn advance_at(&mut self, now: Instant) -> (Instant, u64) {
        let mut next = self.deadline + self.interval;
        let mut skipped = 0;

        if next <= now {
            let behind = now.duration_since(next).as_nanos() / self.interval.as_nanos();
            skipped = u64::try_from(behind).unwrap_or(u64::MAX).saturating_add(1);
            next += self.interval * u32::try_from(skipped).unwrap_or(u32::MAX);
        }

        self.deadline = next;
        self.dropped += skipped;
        (next, skipped)
    }

    /// Sleep until `deadline` unless a wake-up arrives first
    ///
    /// Returns `true` when woken early, including when the sending side
    /// has gone away.
    pub fn wait_until(deadline: Instant, wakeup: &Receiver<()>) -> bool {
        !matches!(
            wakeup.recv_deadline(deadline),
            Err(RecvTimeoutError::Timeout)
        )
    }
}
