//! Shared latency statistics for the stage workers.

use serde::Serialize;

/// EMA smoothing factor: new_avg = 0.9·old + 0.1·sample.
const EMA_ALPHA: f64 = 0.1;

/// Running latency statistics over nanosecond samples.
///
/// The first sample seeds the average; afterwards the average is an
/// exponential moving average with α = 0.1. The maximum is a lifetime
/// maximum.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct LatencyStats {
    pub avg_ns: f64,
    pub max_ns: i64,
    pub samples: u64,
}

impl LatencyStats {
    pub fn record(&mut self, sample_ns: i64) {
        self.samples += 1;
        if self.samples == 1 {
            self.avg_ns = sample_ns as f64;
        } else {
            self.avg_ns = self.avg_ns * (1.0 - EMA_ALPHA) + sample_ns as f64 * EMA_ALPHA;
        }
        if sample_ns > self.max_ns {
            self.max_ns = sample_ns;
        }
    }
}
