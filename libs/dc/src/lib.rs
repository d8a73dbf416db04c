//! # Directional-Change Detection
//!
//! ## Purpose
//!
//! Online detection of directional-change (DC) events in a tick
//! stream: a DC event is a confirmed trend reversal, declared when the
//! price has retraced at least a relative threshold θ from the running
//! extreme of the current trend. Each event carries derived analytics:
//! the extent of the closed trend in threshold units (TMV), its
//! duration, and a time-adjusted return.
//!
//! ## Architecture Role
//!
//! The detector is the analytical core of the market-data stage. It is
//! strictly single-owner: one instrument, one detector, state advanced
//! only by `process_tick`, no interior locking. Throughput on a
//! commodity core is millions of ticks per second; the hot path is a
//! handful of compares and at most one event construction.
//!
//! ## Numerical Policy
//!
//! The detector never fails on finite input. Non-finite prices are
//! ignored (no event, state untouched); degenerate arithmetic
//! (zero previous extreme, non-positive duration) yields zeroed
//! analytics instead of NaN/∞.

mod detector;

pub use detector::{DcDetector, DcError, DcEvent, Trend, DEFAULT_THETA};
pub use tickflow_types::DcEventKind;
