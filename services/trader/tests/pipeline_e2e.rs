//! Full pipeline test: ticks in, simulated fills out.
//!
//! Spins up the three stage workers over lanes in a temporary
//! directory, feeds a deterministic tick sequence whose recovery leg
//! confirms an upturn, and verifies the resulting order was filled and
//! folded into the performance accumulator.

use std::time::{Duration, Instant};

use tickflow_trader::{
    config::SystemConfig, ExecutionEngine, MarketDataProcessor, StrategyEngine,
};
use tickflow_transport::{time, LaneDriver, LanePublisher};
use tickflow_types::{ExecutionStatus, SignalType, Symbol, TickMessage};
use zerocopy::AsBytes;

fn test_config(dir: &std::path::Path) -> SystemConfig {
    let mut config = SystemConfig::default();
    for lane in [
        &mut config.aeron.market_data,
        &mut config.aeron.strategy,
        &mut config.aeron.execution,
    ] {
        lane.directory = dir.to_path_buf();
        lane.timeout_ms = 2000;
    }
    config.dc_strategy.theta = 0.01;
    config
}

#[test]
fn upturn_tick_sequence_produces_a_filled_buy() {
    time::init_clock();
    let dir = tempfile::tempdir().expect("tempdir");
    let config = test_config(dir.path());
    let driver = LaneDriver::new();

    // Wire back to front so every subscriber is bound before its
    // publisher connects.
    let mut execution = ExecutionEngine::initialize(&driver, &config).expect("execution init");
    let mut strategy = StrategyEngine::initialize(&driver, &config).expect("strategy init");
    let mut market_data = MarketDataProcessor::initialize(&driver, &config).expect("mdp init");

    market_data.start();
    strategy.start();
    execution.start();

    let mut ticks = driver
        .publisher(&config.aeron.market_data.address())
        .expect("tick publisher");

    // Decline to 97.0, then a recovery to 98.5 (~1.55 % off the low).
    // The exact 1 % drop to 99.0 already confirms a degenerate
    // downturn off the seed (zero extent and time-adjusted return, so
    // it never becomes an order); the upturn has a positive
    // time-adjusted return → exactly one buy.
    let symbol = Symbol::new("EURUSD");
    for (i, price) in [100.0, 99.0, 98.0, 97.0, 98.5].iter().enumerate() {
        let tick = TickMessage::new(i as i64 * 1_000_000, *price, 1_000.0, symbol);
        assert!(ticks.offer(tick.as_bytes()).is_ok(), "tick {} dropped", i);
    }

    // The fill includes a simulated broker delay; give the pipeline a
    // bounded window to drain.
    let deadline = Instant::now() + Duration::from_secs(5);
    while execution.trade_history().is_empty() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }

    market_data.stop();
    strategy.stop();
    execution.stop();

    let md_stats = market_data.stats();
    assert_eq!(md_stats.messages_processed, 5);
    assert_eq!(md_stats.dc_events_detected, 2);
    assert_eq!(md_stats.events_published, 2);

    let se_stats = strategy.stats();
    assert_eq!(se_stats.signals_processed, 2);
    assert_eq!(se_stats.orders_generated, 1);
    assert_eq!(se_stats.buy_signals, 1);

    let trades = execution.trade_history();
    assert_eq!(trades.len(), 1, "expected exactly one fill");
    let trade = &trades[0];
    assert_eq!(trade.signal, SignalType::Buy);
    assert_eq!(trade.status, ExecutionStatus::Filled);
    assert_eq!(trade.symbol.as_str(), "EURUSD");
    // Base quantity 100, well under the notional cap at this price.
    assert_eq!(trade.executed_quantity, 100.0);
    // Slippage is bounded at ±1 bp around the order price of 98.5.
    assert!((trade.executed_price - 98.5).abs() <= 98.5 * 0.0001 + 1e-9);
    assert!(trade.order_id.starts_with("ORDER_1_"));
    assert!(trade.execution_latency_ns >= 10_000);

    let metrics = execution.performance_metrics();
    assert_eq!(metrics.total_trades, 1);
    // A buy opens the position; nothing is realized yet.
    assert_eq!(metrics.total_pnl, 0.0);
    assert!(metrics.avg_execution_latency_ns >= 10_000.0);

    // Reset clears the history and the accumulator.
    execution.reset_performance_tracking();
    assert!(execution.trade_history().is_empty());
    assert_eq!(execution.performance_metrics().total_trades, 0);
}

#[test]
fn shallow_stream_produces_no_orders() {
    time::init_clock();
    let dir = tempfile::tempdir().expect("tempdir");
    let config = test_config(dir.path());
    let driver = LaneDriver::new();

    let mut execution = ExecutionEngine::initialize(&driver, &config).expect("execution init");
    let mut strategy = StrategyEngine::initialize(&driver, &config).expect("strategy init");
    let mut market_data = MarketDataProcessor::initialize(&driver, &config).expect("mdp init");

    market_data.start();
    strategy.start();
    execution.start();

    let mut ticks = driver
        .publisher(&config.aeron.market_data.address())
        .expect("tick publisher");

    // Largest retracement ~0.49 %, below theta = 1 %.
    let symbol = Symbol::new("EURUSD");
    let prices = [100.0, 100.5, 101.0, 100.8, 101.2, 101.8, 101.5, 102.0];
    for (i, price) in prices.iter().enumerate() {
        let tick = TickMessage::new(i as i64 * 1_000_000, *price, 1_000.0, symbol);
        assert!(ticks.offer(tick.as_bytes()).is_ok());
    }

    let deadline = Instant::now() + Duration::from_secs(5);
    while market_data.stats().messages_processed < prices.len() as u64
        && Instant::now() < deadline
    {
        std::thread::sleep(Duration::from_millis(10));
    }

    market_data.stop();
    strategy.stop();
    execution.stop();

    assert_eq!(market_data.stats().dc_events_detected, 0);
    assert_eq!(strategy.stats().orders_generated, 0);
    assert!(execution.trade_history().is_empty());
}
