//! Capture clock and timebase conversion

use std::sync::OnceLock;
use std::time::Instant;

/// Native capture ticks per second (100ns units)
pub const NATIVE_TICKS_PER_SECOND: i64 = 10_000_000;

static CLOCK_EPOCH: OnceLock<Instant> = OnceLock::new();

/// Monotonic capture time in native ticks
///
/// Ticks count from the first call in this process, so they are always
/// positive after the first frame and never go backwards.
pub fn now_ticks() -> i64 {
    let epoch = *CLOCK_EPOCH.get_or_init(Instant::now);
    let ticks = epoch.elapsed().as_nanos() / 100;
    // Keep the first frame strictly positive so it is never mistaken for an
    // untimed packet.
    i64::try_from(ticks).unwrap_or(i64::MAX).max(1)
}

/// Convert native ticks to the 90 kHz transport timebase
pub fn native_to_90k(ticks: i64) -> i64 {
    ticks * 9 / 1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_to_90k() {
        assert_eq!(native_to_90k(1_000_000), 9_000);
        assert_eq!(native_to_90k(NATIVE_TICKS_PER_SECOND), 90_000);
    }

    #[test]
    fn test_truncates_toward_zero() {
        assert_eq!(native_to_90k(111), 0);
        assert_eq!(native_to_90k(112), 1);
    }

    #[test]
    fn test_now_ticks_monotonic() {
        let a = now_ticks();
        let b = now_ticks();
        assert!(a >= 1);
        assert!(b >= a);
    }
}
