//! # Market-Data Processor (MDP)
//!
//! First pipeline stage: polls the tick lane, drives the DC detector,
//! and publishes a DC signal for every confirmed reversal. Maintains
//! per-tick processing-latency statistics.
//!
//! Back-pressure policy: a signal the lane will not accept is dropped,
//! never retried; for this pipeline a stale signal is worse than a
//! missing one.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::Context;
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};
use zerocopy::AsBytes;

use tickflow_dc::DcDetector;
use tickflow_transport::{
    time, IdleStrategy, LaneDriver, LanePublisher, LaneSubscriber, OfferOutcome, SocketPublisher,
    SocketSubscriber,
};
use tickflow_types::{decode_record, DcSignalMessage, TickMessage};

use crate::config::SystemConfig;
use crate::stats::LatencyStats;

const POLL_BATCH: usize = 10;

/// Processing statistics, snapshotted by the supervisor.
#[derive(Debug, Clone, Copy, Default)]
pub struct MdpStats {
    pub messages_processed: u64,
    pub dc_events_detected: u64,
    pub events_published: u64,
    pub events_dropped: u64,
    pub latency: LatencyStats,
}

struct MdpEndpoints {
    subscription: SocketSubscriber,
    publication: SocketPublisher,
    detector: DcDetector,
}

/// The MDP stage worker.
pub struct MarketDataProcessor {
    running: Arc<AtomicBool>,
    stats: Arc<Mutex<MdpStats>>,
    endpoints: Option<MdpEndpoints>,
    worker: Option<JoinHandle<()>>,
}

impl MarketDataProcessor {
    /// Bind the tick subscription, connect the DC signal publication,
    /// and construct the detector. Fails fast: an unreachable lane at
    /// startup is fatal.
    pub fn initialize(driver: &LaneDriver, config: &SystemConfig) -> anyhow::Result<Self> {
        let subscription = driver
            .subscriber(&config.aeron.market_data.address())
            .context("failed to subscribe to the tick lane")?;
        let publication = driver
            .publisher(&config.aeron.strategy.address())
            .context("failed to publish on the DC signal lane")?;
        let detector =
            DcDetector::new(config.dc_strategy.theta).context("invalid DC threshold")?;

        info!(
            theta = config.dc_strategy.theta,
            "market data processor initialized"
        );
        Ok(Self {
            running: Arc::new(AtomicBool::new(false)),
            stats: Arc::new(Mutex::new(MdpStats::default())),
            endpoints: Some(MdpEndpoints {
                subscription,
                publication,
                detector,
            }),
            worker: None,
        })
    }

    /// Spawn the processing thread. Idempotent.
    pub fn start(&mut self) {
        if self.worker.is_some() {
            warn!("market data processor is already running");
            return;
        }
        let Some(endpoints) = self.endpoints.take() else {
            warn!("market data processor cannot restart after stop");
            return;
        };

        self.running.store(true, Ordering::Release);
        let running = Arc::clone(&self.running);
        let stats = Arc::clone(&self.stats);
        self.worker = Some(
            std::thread::Builder::new()
                .name("tickflow-mdp".to_string())
                .spawn(move || run_loop(endpoints, running, stats))
                .expect("failed to spawn MDP worker thread"),
        );
        info!("market data processor started");
    }

    /// Clear the run flag and join the worker. Idempotent.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
            info!("market data processor stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> MdpStats {
        *self.stats.lock()
    }
}

impl Drop for MarketDataProcessor {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_loop(endpoints: MdpEndpoints, running: Arc<AtomicBool>, stats: Arc<Mutex<MdpStats>>) {
    info!("market data processing loop started");

    let MdpEndpoints {
        mut subscription,
        mut publication,
        mut detector,
    } = endpoints;
    let idle = IdleStrategy::sleeping_default();

    while running.load(Ordering::Acquire) {
        let fragments = subscription.poll(
            &mut |fragment, _header| {
                process_tick_fragment(fragment, &mut detector, &mut publication, &stats);
            },
            POLL_BATCH,
        );
        idle.idle(fragments);
    }

    info!("market data processing loop ended");
}

fn process_tick_fragment(
    fragment: &[u8],
    detector: &mut DcDetector,
    publication: &mut SocketPublisher,
    stats: &Mutex<MdpStats>,
) {
    let t_start = time::now_ns();

    let tick: TickMessage = match decode_record(fragment) {
        Ok(tick) => tick,
        Err(e) => {
            error!(error = %e, "invalid market data fragment");
            return;
        }
    };

    // Non-finite prices are rejected inside the detector (no event,
    // state untouched); the tick still counts as processed.
    let event = detector.process_tick(tick.timestamp, tick.price);
    let latency_ns = time::now_ns() - t_start;

    {
        let mut s = stats.lock();
        s.messages_processed += 1;
        s.latency.record(latency_ns);
        if event.is_some() {
            s.dc_events_detected += 1;
        }
    }

    let Some(event) = event else {
        return;
    };

    let signal = DcSignalMessage::new(
        event.timestamp,
        event.kind,
        event.price,
        event.tmv_ext,
        event.duration,
        event.time_adjusted_return,
        tick.symbol,
    );

    match publication.offer(signal.as_bytes()) {
        OfferOutcome::Ok(_) => {
            stats.lock().events_published += 1;
            debug!(
                kind = ?event.kind,
                price = event.price,
                tmv_ext = event.tmv_ext,
                "DC event published"
            );
        }
        OfferOutcome::BackPressured => {
            stats.lock().events_dropped += 1;
            debug!("DC signal lane back-pressured, dropping event");
        }
        OfferOutcome::NotConnected => {
            stats.lock().events_dropped += 1;
            error!("DC signal lane not connected, dropping event");
        }
        OfferOutcome::Closed => {
            stats.lock().events_dropped += 1;
            error!("DC signal lane closed, dropping event");
        }
    }
}
