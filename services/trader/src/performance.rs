//! # Performance Accumulator
//!
//! Position-aware P&L book plus running performance statistics over
//! filled trades: totals, win rate, drawdown against the capital peak,
//! execution-latency EMA, and a Sharpe ratio over a bounded window of
//! recent per-trade returns.
//!
//! The book keeps a signed position with a volume-weighted average
//! entry price. Fills that extend the position realize nothing; fills
//! against it realize (price − entry) on the covered quantity, and any
//! excess flips the position at the executed price. This keeps the sum
//! of realized trade P&L equal to the change in realized capital.

use std::collections::VecDeque;

use parking_lot::Mutex;
use serde::Serialize;
use tickflow_types::{ExecutionStatus, SignalType};
use tracing::info;

use crate::execution::TradeExecution;
use crate::stats::LatencyStats;

/// Recent per-trade returns kept for the Sharpe ratio.
const RETURNS_WINDOW: usize = 252;

/// Snapshot of the accumulator, exposed to the supervisor and written
/// to the final report.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PerformanceMetrics {
    pub total_pnl: f64,
    pub win_rate: f64,
    pub total_trades: u64,
    pub winning_trades: u64,
    pub losing_trades: u64,
    pub max_drawdown: f64,
    pub sharpe_ratio: f64,
    pub avg_trade_pnl: f64,
    pub avg_execution_latency_ns: f64,
    pub max_execution_latency_ns: i64,
}

#[derive(Debug)]
struct PerformanceState {
    metrics: PerformanceMetrics,
    latency: LatencyStats,
    current_capital: f64,
    peak_capital: f64,
    /// Signed: positive long, negative short.
    position_qty: f64,
    avg_entry_price: f64,
    recent_returns: VecDeque<f64>,
}

impl PerformanceState {
    fn fresh(initial_capital: f64) -> Self {
        Self {
            metrics: PerformanceMetrics::default(),
            latency: LatencyStats::default(),
            current_capital: initial_capital,
            peak_capital: initial_capital,
            position_qty: 0.0,
            avg_entry_price: 0.0,
            recent_returns: VecDeque::with_capacity(RETURNS_WINDOW),
        }
    }
}

/// Thread-safe accumulator. The EE worker writes on the hot path with
/// a short critical section; external readers snapshot.
#[derive(Debug)]
pub struct PerformanceTracker {
    initial_capital: f64,
    state: Mutex<PerformanceState>,
}

impl PerformanceTracker {
    pub fn new(initial_capital: f64) -> Self {
        Self {
            initial_capital,
            state: Mutex::new(PerformanceState::fresh(initial_capital)),
        }
    }

    /// Fold one execution into the book and the statistics. Only
    /// filled trades move the accumulator.
    pub fn record_fill(&self, execution: &TradeExecution) {
        if execution.status != ExecutionStatus::Filled {
            return;
        }

        let mut guard = self.state.lock();
        let state = &mut *guard;
        let trade_pnl = apply_fill(
            state,
            execution.signal,
            execution.executed_price,
            execution.executed_quantity,
        );

        let m = &mut state.metrics;
        m.total_pnl += trade_pnl;
        m.total_trades += 1;
        if trade_pnl > 0.0 {
            m.winning_trades += 1;
        } else if trade_pnl < 0.0 {
            m.losing_trades += 1;
        }
        m.win_rate = m.winning_trades as f64 / m.total_trades as f64;
        m.avg_trade_pnl = m.total_pnl / m.total_trades as f64;

        state.current_capital += trade_pnl;
        if state.current_capital > state.peak_capital {
            state.peak_capital = state.current_capital;
        }
        let drawdown = (state.peak_capital - state.current_capital) / state.peak_capital;
        if drawdown > state.metrics.max_drawdown {
            state.metrics.max_drawdown = drawdown;
        }

        if execution.execution_latency_ns > 0 {
            state.latency.record(execution.execution_latency_ns);
        }

        let trade_return = trade_pnl / self.initial_capital;
        if state.recent_returns.len() == RETURNS_WINDOW {
            state.recent_returns.pop_front();
        }
        state.recent_returns.push_back(trade_return);
        state.metrics.sharpe_ratio = sharpe_ratio(&state.recent_returns);
    }

    /// Snapshot the metrics, folding in the latency statistics.
    pub fn metrics(&self) -> PerformanceMetrics {
        let state = self.state.lock();
        let mut metrics = state.metrics.clone();
        metrics.avg_execution_latency_ns = state.latency.avg_ns;
        metrics.max_execution_latency_ns = state.latency.max_ns;
        metrics
    }

    /// Open position (signed quantity, average entry price).
    pub fn position(&self) -> (f64, f64) {
        let state = self.state.lock();
        (state.position_qty, state.avg_entry_price)
    }

    pub fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    pub fn current_capital(&self) -> f64 {
        self.state.lock().current_capital
    }

    /// Zero the accumulator and restore the initial capital.
    pub fn reset(&self) {
        *self.state.lock() = PerformanceState::fresh(self.initial_capital);
        info!("performance tracking reset");
    }
}

/// Advance the position book by one fill; returns the realized P&L.
fn apply_fill(state: &mut PerformanceState, signal: SignalType, price: f64, quantity: f64) -> f64 {
    let direction = match signal {
        SignalType::Buy => 1.0,
        SignalType::Sell => -1.0,
        SignalType::None | SignalType::Hold => return 0.0,
    };

    // Same direction as the open position (or flat): extend at a
    // volume-weighted entry, realize nothing.
    if state.position_qty == 0.0 || state.position_qty.signum() == direction {
        let total = state.position_qty.abs() + quantity;
        state.avg_entry_price =
            (state.avg_entry_price * state.position_qty.abs() + price * quantity) / total;
        state.position_qty += direction * quantity;
        return 0.0;
    }

    // Opposing fill: realize on the covered quantity.
    let covered = quantity.min(state.position_qty.abs());
    let trade_pnl = if state.position_qty > 0.0 {
        (price - state.avg_entry_price) * covered
    } else {
        (state.avg_entry_price - price) * covered
    };
    state.position_qty += direction * covered;

    let excess = quantity - covered;
    if state.position_qty == 0.0 {
        state.avg_entry_price = 0.0;
        if excess > 0.0 {
            // Flip: the remainder opens a fresh position at the
            // executed price.
            state.position_qty = direction * excess;
            state.avg_entry_price = price;
        }
    }
    trade_pnl
}

/// Sample-mean over sample-stddev (Bessel correction). The √252
/// annualization of numerator and denominator cancels, so the ratio is
/// computed directly; zero when fewer than two samples or flat
/// returns.
fn sharpe_ratio(returns: &VecDeque<f64>) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std_dev = variance.sqrt();
    if std_dev > 0.0 {
        mean / std_dev
    } else {
        0.0
    }
}
