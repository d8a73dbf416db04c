//! # Execution Engine (EE)
//!
//! Final pipeline stage: consumes trading orders and produces
//! executions. Simulation is the fully defined mode: every order
//! fills, with a sampled broker latency (the worker actually sleeps
//! it) and a ±1 bp slippage on the executed price. Live mode is an
//! interface placeholder: orders come back `Pending` and nothing
//! reaches a broker.
//!
//! Each execution is appended to the in-memory trade history and
//! folded into the performance accumulator.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::Context;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, error, info, warn};

use tickflow_transport::{time, IdleStrategy, LaneDriver, LaneSubscriber, SocketSubscriber};
use tickflow_types::{decode_record, ExecutionStatus, OrderMessage, SignalType, Symbol};

use crate::config::SystemConfig;
use crate::performance::{PerformanceMetrics, PerformanceTracker};

const POLL_BATCH: usize = 10;
/// Simulated broker latency band, nanoseconds.
const SIM_LATENCY_NS: std::ops::RangeInclusive<i64> = 10_000..=100_000;
/// Simulated slippage band, relative.
const SIM_SLIPPAGE: std::ops::RangeInclusive<f64> = -0.0001..=0.0001;

/// Execution mode. Live trading is out of scope: the variant exists so
/// configuration can express intent, but orders are not routed
/// anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Simulated,
    Live,
}

/// One execution record.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeExecution {
    pub execution_timestamp: i64,
    pub order_id: String,
    pub signal: SignalType,
    pub executed_price: f64,
    pub executed_quantity: f64,
    pub status: ExecutionStatus,
    pub symbol: Symbol,
    pub execution_latency_ns: i64,
}

struct EeEndpoints {
    subscription: SocketSubscriber,
    mode: ExecutionMode,
}

/// The EE stage worker.
pub struct ExecutionEngine {
    running: Arc<AtomicBool>,
    trades: Arc<Mutex<Vec<TradeExecution>>>,
    performance: Arc<PerformanceTracker>,
    endpoints: Option<EeEndpoints>,
    worker: Option<JoinHandle<()>>,
}

impl ExecutionEngine {
    pub fn initialize(driver: &LaneDriver, config: &SystemConfig) -> anyhow::Result<Self> {
        let subscription = driver
            .subscriber(&config.aeron.execution.address())
            .context("failed to subscribe to the order lane")?;
        let mode = if config.execution.simulation_mode {
            ExecutionMode::Simulated
        } else {
            ExecutionMode::Live
        };

        info!(
            ?mode,
            initial_capital = config.execution.initial_capital,
            "execution engine initialized"
        );
        Ok(Self {
            running: Arc::new(AtomicBool::new(false)),
            trades: Arc::new(Mutex::new(Vec::new())),
            performance: Arc::new(PerformanceTracker::new(config.execution.initial_capital)),
            endpoints: Some(EeEndpoints { subscription, mode }),
            worker: None,
        })
    }

    /// Spawn the processing thread. Idempotent.
    pub fn start(&mut self) {
        if self.worker.is_some() {
            warn!("execution engine is already running");
            return;
        }
        let Some(endpoints) = self.endpoints.take() else {
            warn!("execution engine cannot restart after stop");
            return;
        };

        self.running.store(true, Ordering::Release);
        let running = Arc::clone(&self.running);
        let trades = Arc::clone(&self.trades);
        let performance = Arc::clone(&self.performance);
        self.worker = Some(
            std::thread::Builder::new()
                .name("tickflow-ee".to_string())
                .spawn(move || run_loop(endpoints, running, trades, performance))
                .expect("failed to spawn EE worker thread"),
        );
        info!("execution engine started");
    }

    /// Clear the run flag and join the worker. Idempotent.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
            info!("execution engine stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn performance_metrics(&self) -> PerformanceMetrics {
        self.performance.metrics()
    }

    /// Snapshot of the trade history.
    pub fn trade_history(&self) -> Vec<TradeExecution> {
        self.trades.lock().clone()
    }

    /// Zero the accumulator, clear the trade history, restore the
    /// initial capital. The history lock is held across the reset so
    /// the worker cannot interleave a fill between the two.
    pub fn reset_performance_tracking(&self) {
        let mut trades = self.trades.lock();
        self.performance.reset();
        trades.clear();
    }
}

impl Drop for ExecutionEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

struct EeWorker {
    subscription: SocketSubscriber,
    mode: ExecutionMode,
    rng: StdRng,
    order_counter: u64,
    live_warned: bool,
    trades: Arc<Mutex<Vec<TradeExecution>>>,
    performance: Arc<PerformanceTracker>,
}

fn run_loop(
    endpoints: EeEndpoints,
    running: Arc<AtomicBool>,
    trades: Arc<Mutex<Vec<TradeExecution>>>,
    performance: Arc<PerformanceTracker>,
) {
    info!("execution processing loop started");

    let mut worker = EeWorker {
        subscription: endpoints.subscription,
        mode: endpoints.mode,
        rng: StdRng::from_entropy(),
        order_counter: 0,
        live_warned: false,
        trades,
        performance,
    };
    let idle = IdleStrategy::sleeping_default();
    // Orders are decoded into a scratch queue so the simulated-fill
    // sleep happens outside the fragment handler.
    let mut orders: Vec<OrderMessage> = Vec::with_capacity(POLL_BATCH);

    while running.load(Ordering::Acquire) {
        let fragments = worker.subscription.poll(
            &mut |fragment, _header| match decode_record::<OrderMessage>(fragment) {
                Ok(order) => orders.push(order),
                Err(e) => error!(error = %e, "invalid trading order fragment"),
            },
            POLL_BATCH,
        );
        for order in orders.drain(..) {
            worker.process_order(&order);
        }
        idle.idle(fragments);
    }

    info!("execution processing loop ended");
}

impl EeWorker {
    fn process_order(&mut self, order: &OrderMessage) {
        let signal = match order.signal() {
            Ok(signal) => signal,
            Err(e) => {
                error!(error = %e, "unknown trading signal, skipping order");
                return;
            }
        };
        if !matches!(signal, SignalType::Buy | SignalType::Sell) {
            debug!(?signal, "non-trading order skipped");
            return;
        }

        let execution = match self.mode {
            ExecutionMode::Simulated => self.simulate_execution(order, signal),
            ExecutionMode::Live => self.live_placeholder(order, signal),
        };

        debug!(
            order_id = %execution.order_id,
            signal = ?execution.signal,
            price = execution.executed_price,
            quantity = execution.executed_quantity,
            status = ?execution.status,
            "order executed"
        );

        self.trades.lock().push(execution.clone());
        self.performance.record_fill(&execution);
    }

    /// The simulated fill model: everything fills, after a sampled
    /// broker delay and with a small price slippage.
    fn simulate_execution(&mut self, order: &OrderMessage, signal: SignalType) -> TradeExecution {
        let start = time::now_ns();

        let broker_latency = self.rng.gen_range(SIM_LATENCY_NS);
        std::thread::sleep(Duration::from_nanos(broker_latency as u64));

        let slippage = self.rng.gen_range(SIM_SLIPPAGE);

        TradeExecution {
            execution_timestamp: time::now_ns(),
            order_id: self.next_order_id(),
            signal,
            executed_price: order.price * (1.0 + slippage),
            executed_quantity: order.quantity,
            status: ExecutionStatus::Filled,
            symbol: order.symbol,
            execution_latency_ns: time::now_ns() - start,
        }
    }

    /// Live trading is not wired to any broker; orders are recorded as
    /// pending and never move the accumulator.
    fn live_placeholder(&mut self, order: &OrderMessage, signal: SignalType) -> TradeExecution {
        if !self.live_warned {
            warn!("live execution is not implemented; orders are recorded as pending");
            self.live_warned = true;
        }
        TradeExecution {
            execution_timestamp: time::now_ns(),
            order_id: self.next_order_id(),
            signal,
            executed_price: order.price,
            executed_quantity: order.quantity,
            status: ExecutionStatus::Pending,
            symbol: order.symbol,
            execution_latency_ns: 0,
        }
    }

    fn next_order_id(&mut self) -> String {
        self.order_counter += 1;
        format!("ORDER_{}_{}", self.order_counter, time::now_micros())
    }
}
