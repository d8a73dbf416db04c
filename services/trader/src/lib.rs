//! # Tickflow Trader
//!
//! ## Purpose
//!
//! The trading process: three single-threaded stage workers connected
//! by lanes, supervised from the `trading-system` binary.
//!
//! ```text
//!   ticks            dc signals           orders
//!  ───────►  MDP  ─────────────►  SE  ─────────────►  EE
//! ```
//!
//! * **MDP** ([`MarketDataProcessor`]) deserializes ticks, drives the
//!   DC detector, and publishes DC signals.
//! * **SE** ([`StrategyEngine`]) converts DC signals into sized
//!   orders, optionally modulated by a volatility-regime classifier.
//! * **EE** ([`ExecutionEngine`]) simulates fills and feeds the
//!   running performance accumulator.
//!
//! Every worker follows the same discipline: poll its input lane in
//! batches of at most ten fragments, sleep up to a millisecond when
//! idle, drop (never retry) on back-pressure, and convert every
//! recoverable per-record failure into a logged skip. Statistics are
//! snapshotted behind short mutexes for the supervisor; the hot path
//! never blocks on anything else.

pub mod config;
pub mod execution;
pub mod market_data;
pub mod performance;
pub mod stats;
pub mod strategy;

pub use config::SystemConfig;
pub use execution::{ExecutionEngine, ExecutionMode, TradeExecution};
pub use market_data::{MarketDataProcessor, MdpStats};
pub use performance::{PerformanceMetrics, PerformanceTracker};
pub use stats::LatencyStats;
pub use strategy::{MarketRegime, SeStats, StrategyEngine};
