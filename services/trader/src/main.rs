//! Trading system entry point.
//!
//! Wires the three stage workers onto their lanes, supervises them
//! with a periodic statistics report, and shuts the pipeline down in
//! order on SIGINT/SIGTERM. Exit code 0 on clean shutdown, 1 when
//! initialization fails.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tickflow_trader::{
    ExecutionEngine, MarketDataProcessor, PerformanceMetrics, StrategyEngine, SystemConfig,
};
use tickflow_transport::{time, LaneDriver};

#[derive(Debug, Parser)]
#[command(name = "trading-system", about = "DC trading pipeline")]
struct Args {
    /// Path to the system configuration file.
    #[arg(default_value = "config/system_config.json")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    time::init_clock();

    let args = Args::parse();
    info!("starting trading system");

    let config = SystemConfig::from_file(&args.config)
        .with_context(|| format!("failed to load configuration from {:?}", args.config))?;
    config.validate().context("invalid configuration")?;
    info!(config_file = ?args.config, "configuration loaded");

    let driver = LaneDriver::new();

    // Per lane, the subscribing stage binds the socket before the
    // publishing stage connects, so wire the pipeline back to front.
    let mut execution =
        ExecutionEngine::initialize(&driver, &config).context("failed to initialize execution engine")?;
    let mut strategy =
        StrategyEngine::initialize(&driver, &config).context("failed to initialize strategy engine")?;
    let mut market_data = MarketDataProcessor::initialize(&driver, &config)
        .context("failed to initialize market data processor")?;

    market_data.start();
    strategy.start();
    execution.start();
    info!("all components started; press Ctrl+C to stop");

    supervise(&market_data, &strategy, &execution).await?;

    info!("shutting down components");
    market_data.stop();
    strategy.stop();
    execution.stop();

    let final_metrics = execution.performance_metrics();
    log_final_report(&final_metrics);
    if config.performance.enable_performance_metrics {
        if let Err(e) = write_report(&config, &final_metrics) {
            error!(error = %e, "failed to write performance report");
        }
    }

    info!("trading system shutdown complete");
    Ok(())
}

/// Monitoring loop: report statistics every ten seconds until a
/// termination signal arrives.
async fn supervise(
    market_data: &MarketDataProcessor,
    strategy: &StrategyEngine,
    execution: &ExecutionEngine,
) -> anyhow::Result<()> {
    let mut sigterm =
        signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;
    let mut report_timer = tokio::time::interval(std::time::Duration::from_secs(10));
    report_timer.tick().await; // immediate first tick

    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.context("failed to listen for shutdown signal")?;
                info!("received SIGINT, shutting down");
                return Ok(());
            }
            _ = sigterm.recv() => {
                info!("received SIGTERM, shutting down");
                return Ok(());
            }
            _ = report_timer.tick() => {
                log_statistics(market_data, strategy, execution);
            }
        }
    }
}

fn log_statistics(
    market_data: &MarketDataProcessor,
    strategy: &StrategyEngine,
    execution: &ExecutionEngine,
) {
    let md = market_data.stats();
    let se = strategy.stats();
    let perf = execution.performance_metrics();

    info!(
        messages = md.messages_processed,
        dc_events = md.dc_events_detected,
        published = md.events_published,
        dropped = md.events_dropped,
        avg_latency_ns = md.latency.avg_ns as i64,
        max_latency_ns = md.latency.max_ns,
        "market data statistics"
    );
    info!(
        signals = se.signals_processed,
        orders = se.orders_generated,
        buys = se.buy_signals,
        sells = se.sell_signals,
        regime = ?se.current_regime,
        avg_latency_ns = se.latency.avg_ns as i64,
        "strategy statistics"
    );
    info!(
        trades = perf.total_trades,
        total_pnl = perf.total_pnl,
        win_rate = perf.win_rate,
        max_drawdown = perf.max_drawdown,
        avg_exec_latency_ns = perf.avg_execution_latency_ns as i64,
        "execution statistics"
    );
}

fn log_final_report(metrics: &PerformanceMetrics) {
    info!(
        total_trades = metrics.total_trades,
        total_pnl = metrics.total_pnl,
        win_rate = metrics.win_rate,
        sharpe_ratio = metrics.sharpe_ratio,
        max_drawdown = metrics.max_drawdown,
        avg_execution_latency_ns = metrics.avg_execution_latency_ns as i64,
        max_execution_latency_ns = metrics.max_execution_latency_ns,
        "final performance report"
    );
}

fn write_report(config: &SystemConfig, metrics: &PerformanceMetrics) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(metrics)?;
    std::fs::write(&config.performance.output_file, json)?;
    info!(file = ?config.performance.output_file, "performance report written");
    Ok(())
}
