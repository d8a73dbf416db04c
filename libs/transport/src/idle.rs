//! Idle strategies for cooperative poll loops.

use std::time::Duration;

/// What a worker does when a poll returns no work.
///
/// `BusySpin` trades a core for the lowest wake-up latency; `Sleeping`
/// bounds idle CPU at the cost of up to one sleep interval of added
/// latency. The stage workers default to a 1 ms sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleStrategy {
    BusySpin,
    Sleeping(Duration),
}

impl IdleStrategy {
    /// The pipeline default: sleep up to 1 ms when idle.
    pub fn sleeping_default() -> Self {
        IdleStrategy::Sleeping(Duration::from_millis(1))
    }

    /// Apply the strategy for one loop iteration. A non-zero work
    /// count resets to full speed (no idling).
    #[inline]
    pub fn idle(&self, work_count: usize) {
        if work_count > 0 {
            return;
        }
        match self {
            IdleStrategy::BusySpin => std::hint::spin_loop(),
            IdleStrategy::Sleeping(interval) => std::thread::sleep(*interval),
        }
    }
}
