//! Process-wide monotonic clock.
//!
//! All stages, and every timestamp written to a lane record, come from
//! this single source: nanoseconds elapsed since a process-global
//! anchor captured on first use. Latency attribution subtracts two
//! readings of the same clock, so values are meaningful only within
//! one process, which is exactly the deployment (the three stage
//! workers share the trader process).

use std::sync::OnceLock;
use std::time::Instant;

static ANCHOR: OnceLock<Instant> = OnceLock::new();

fn anchor() -> Instant {
    *ANCHOR.get_or_init(Instant::now)
}

/// Pin the clock anchor now instead of on first read. Binaries call
/// this at startup; safe to call more than once.
pub fn init_clock() {
    let _ = anchor();
}

/// Monotonic nanoseconds since the process anchor.
#[inline]
pub fn now_ns() -> i64 {
    anchor().elapsed().as_nanos() as i64
}

/// Monotonic microseconds since the process anchor.
#[inline]
pub fn now_micros() -> i64 {
    now_ns() / 1_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_is_monotonic() {
        init_clock();
        let a = now_ns();
        let b = now_ns();
        let c = now_ns();
        assert!(a <= b && b <= c);
    }

    #[test]
    fn micros_track_nanos() {
        let us = now_micros();
        let ns = now_ns();
        assert!(ns / 1_000 >= us);
    }
}
