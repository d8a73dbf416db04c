//! # Strategy Engine (SE)
//!
//! Second pipeline stage: converts DC signals into trading orders.
//!
//! Baseline rule: an upturn with positive time-adjusted return is a
//! buy, a downturn with negative time-adjusted return is a sell,
//! anything else produces no order. Quantity starts from a base of
//! 100 units, scaled by the configured leverage factor and (when
//! enabled) the volatility-regime multiplier, capped at 10 000 in
//! notional and floored at one unit.
//!
//! The regime classifier is a plain threshold rule on the signal's
//! extent-per-second, with hysteresis: values between the thresholds
//! carry the previous classification.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::Context;
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};
use zerocopy::AsBytes;

use tickflow_transport::{
    time, IdleStrategy, LaneDriver, LanePublisher, LaneSubscriber, OfferOutcome, SocketPublisher,
    SocketSubscriber,
};
use tickflow_types::{decode_record, DcEventKind, DcSignalMessage, OrderMessage, SignalType};

use crate::config::SystemConfig;
use crate::stats::LatencyStats;

const POLL_BATCH: usize = 10;
const BASE_QUANTITY: f64 = 100.0;
const MAX_NOTIONAL: f64 = 10_000.0;
const LOW_VOLATILITY_THRESHOLD: f64 = 0.1;
const HIGH_VOLATILITY_THRESHOLD: f64 = 0.5;
const NANOS_PER_SEC: f64 = 1e9;

/// Volatility regime as classified from incoming DC signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarketRegime {
    #[default]
    Unknown,
    LowVolatility,
    HighVolatility,
}

impl MarketRegime {
    /// Quantity multiplier applied when the regime modifier is
    /// enabled: lean in when quiet, pull back when volatile.
    pub fn leverage_multiplier(self) -> f64 {
        match self {
            MarketRegime::LowVolatility => 1.5,
            MarketRegime::HighVolatility => 0.5,
            MarketRegime::Unknown => 1.0,
        }
    }
}

/// Threshold classifier over extent-per-second.
#[derive(Debug, Default)]
pub(crate) struct RegimeClassifier {
    current: MarketRegime,
}

impl RegimeClassifier {
    /// Classify one signal; returns the regime and whether it changed.
    fn observe(&mut self, signal: &DcSignalMessage) -> (MarketRegime, bool) {
        // Degenerate durations carry the previous classification
        // rather than propagating an infinite rate.
        if signal.duration > 0 {
            let rate = signal.tmv_ext.abs() / (signal.duration as f64 / NANOS_PER_SEC);
            let next = if rate < LOW_VOLATILITY_THRESHOLD {
                MarketRegime::LowVolatility
            } else if rate > HIGH_VOLATILITY_THRESHOLD {
                MarketRegime::HighVolatility
            } else {
                self.current
            };
            if next != self.current {
                let previous = self.current;
                self.current = next;
                info!(?previous, current = ?next, "market regime changed");
                return (next, true);
            }
        }
        (self.current, false)
    }
}

/// Strategy statistics, snapshotted by the supervisor.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeStats {
    pub signals_processed: u64,
    pub orders_generated: u64,
    pub buy_signals: u64,
    pub sell_signals: u64,
    pub regime_changes: u64,
    pub current_regime: MarketRegime,
    pub latency: LatencyStats,
}

struct SeEndpoints {
    subscription: SocketSubscriber,
    publication: SocketPublisher,
    params: StrategyParams,
}

#[derive(Debug, Clone)]
struct StrategyParams {
    leverage_factor: f64,
    regime_modifier_enabled: bool,
}

/// The SE stage worker.
pub struct StrategyEngine {
    running: Arc<AtomicBool>,
    stats: Arc<Mutex<SeStats>>,
    endpoints: Option<SeEndpoints>,
    worker: Option<JoinHandle<()>>,
}

impl StrategyEngine {
    pub fn initialize(driver: &LaneDriver, config: &SystemConfig) -> anyhow::Result<Self> {
        let subscription = driver
            .subscriber(&config.aeron.strategy.address())
            .context("failed to subscribe to the DC signal lane")?;
        let publication = driver
            .publisher(&config.aeron.execution.address())
            .context("failed to publish on the order lane")?;

        info!(
            strategy = %config.strategy_settings.name,
            leverage = config.strategy_settings.leverage_factor,
            regime_modifier = config.strategy_settings.enable_hmm,
            "strategy engine initialized"
        );
        Ok(Self {
            running: Arc::new(AtomicBool::new(false)),
            stats: Arc::new(Mutex::new(SeStats::default())),
            endpoints: Some(SeEndpoints {
                subscription,
                publication,
                params: StrategyParams {
                    leverage_factor: config.strategy_settings.leverage_factor,
                    regime_modifier_enabled: config.strategy_settings.enable_hmm,
                },
            }),
            worker: None,
        })
    }

    /// Spawn the processing thread. Idempotent.
    pub fn start(&mut self) {
        if self.worker.is_some() {
            warn!("strategy engine is already running");
            return;
        }
        let Some(endpoints) = self.endpoints.take() else {
            warn!("strategy engine cannot restart after stop");
            return;
        };

        self.running.store(true, Ordering::Release);
        let running = Arc::clone(&self.running);
        let stats = Arc::clone(&self.stats);
        self.worker = Some(
            std::thread::Builder::new()
                .name("tickflow-se".to_string())
                .spawn(move || run_loop(endpoints, running, stats))
                .expect("failed to spawn SE worker thread"),
        );
        info!("strategy engine started");
    }

    /// Clear the run flag and join the worker. Idempotent.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
            info!("strategy engine stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> SeStats {
        *self.stats.lock()
    }
}

impl Drop for StrategyEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_loop(endpoints: SeEndpoints, running: Arc<AtomicBool>, stats: Arc<Mutex<SeStats>>) {
    info!("strategy processing loop started");

    let SeEndpoints {
        mut subscription,
        mut publication,
        params,
    } = endpoints;
    let mut classifier = RegimeClassifier::default();
    let idle = IdleStrategy::sleeping_default();

    while running.load(Ordering::Acquire) {
        let fragments = subscription.poll(
            &mut |fragment, _header| {
                process_signal_fragment(
                    fragment,
                    &params,
                    &mut classifier,
                    &mut publication,
                    &stats,
                );
            },
            POLL_BATCH,
        );
        idle.idle(fragments);
    }

    info!("strategy processing loop ended");
}

fn process_signal_fragment(
    fragment: &[u8],
    params: &StrategyParams,
    classifier: &mut RegimeClassifier,
    publication: &mut SocketPublisher,
    stats: &Mutex<SeStats>,
) {
    let t_start = time::now_ns();

    let signal: DcSignalMessage = match decode_record(fragment) {
        Ok(signal) => signal,
        Err(e) => {
            error!(error = %e, "invalid DC signal fragment");
            return;
        }
    };
    let kind = match signal.kind() {
        Ok(kind) => kind,
        Err(e) => {
            error!(error = %e, "unknown DC event kind, skipping signal");
            return;
        }
    };

    let (regime, regime_changed) = if params.regime_modifier_enabled {
        classifier.observe(&signal)
    } else {
        (MarketRegime::Unknown, false)
    };

    {
        let mut s = stats.lock();
        s.signals_processed += 1;
        s.current_regime = regime;
        if regime_changed {
            s.regime_changes += 1;
        }
    }

    let trading_signal = trading_signal_for(kind, signal.time_adjusted_return);
    if trading_signal != SignalType::None {
        let now = time::now_ns();
        let order = OrderMessage::new(
            now,
            trading_signal,
            signal.price,
            order_quantity(params, regime, signal.price),
            signal.symbol,
            now - signal.timestamp,
        );

        match publication.offer(order.as_bytes()) {
            OfferOutcome::Ok(_) => {
                let mut s = stats.lock();
                s.orders_generated += 1;
                match trading_signal {
                    SignalType::Buy => s.buy_signals += 1,
                    SignalType::Sell => s.sell_signals += 1,
                    _ => {}
                }
                debug!(
                    signal = ?trading_signal,
                    price = order.price,
                    quantity = order.quantity,
                    "trading order published"
                );
            }
            OfferOutcome::BackPressured => {
                debug!("order lane back-pressured, dropping order");
            }
            OfferOutcome::NotConnected => {
                error!("order lane not connected, dropping order");
            }
            OfferOutcome::Closed => {
                error!("order lane closed, dropping order");
            }
        }
    }

    stats.lock().latency.record(time::now_ns() - t_start);
}

/// The baseline DC rule.
fn trading_signal_for(kind: DcEventKind, time_adjusted_return: f64) -> SignalType {
    match kind {
        DcEventKind::Upturn if time_adjusted_return > 0.0 => SignalType::Buy,
        DcEventKind::Downturn if time_adjusted_return < 0.0 => SignalType::Sell,
        _ => SignalType::None,
    }
}

/// Base quantity, leveraged and regime-adjusted, capped by notional
/// and floored at one unit.
fn order_quantity(params: &StrategyParams, regime: MarketRegime, price: f64) -> f64 {
    let mut quantity = BASE_QUANTITY * params.leverage_factor;
    if params.regime_modifier_enabled {
        quantity *= regime.leverage_multiplier();
    }
    if price > 0.0 {
        quantity = quantity.min(MAX_NOTIONAL / price);
    }
    quantity.max(1.0)
}
