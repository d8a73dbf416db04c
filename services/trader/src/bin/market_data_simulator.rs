//! Market data simulator.
//!
//! Publishes a random-walk tick stream on the market-data lane at a
//! configurable rate: a trend component with persistence and mean
//! reversion, volatility-scaled noise, a clamp to a sane price band,
//! and an occasional outsized move so the DC detector has reversals to
//! confirm.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use zerocopy::AsBytes;

use tickflow_trader::SystemConfig;
use tickflow_transport::{time, LaneDriver, LanePublisher, OfferOutcome};
use tickflow_types::{Symbol, TickMessage};

#[derive(Debug, Parser)]
#[command(name = "market-data-simulator", about = "Random-walk tick stream generator")]
struct Args {
    /// Path to the system configuration file.
    #[arg(default_value = "config/system_config.json")]
    config: PathBuf,

    /// Publication rate in messages per second.
    #[arg(default_value_t = 1000)]
    rate: u32,

    /// Instrument symbol stamped on every tick.
    #[arg(long, default_value = "EURUSD")]
    symbol: String,
}

/// Price process of the simulator.
struct RandomWalk {
    price: f64,
    trend: f64,
    volatility: f64,
    rng: StdRng,
    noise: Normal<f64>,
    trend_noise: Normal<f64>,
}

impl RandomWalk {
    fn new() -> Self {
        Self {
            price: 150.0,
            trend: 0.0,
            volatility: 0.02,
            rng: StdRng::from_entropy(),
            noise: Normal::new(0.0, 1.0).expect("valid distribution"),
            trend_noise: Normal::new(0.0, 0.001).expect("valid distribution"),
        }
    }

    fn next_price(&mut self) -> f64 {
        // Trend persists with mean reversion toward zero.
        self.trend = self.trend * 0.99 + self.trend_noise.sample(&mut self.rng);

        let z = self.noise.sample(&mut self.rng);
        self.price += self.trend + self.volatility * z * self.price * 0.0001;
        self.price = self.price.clamp(100.0, 200.0);

        // Occasional outsized move, roughly once per hundred ticks.
        if self.noise.sample(&mut self.rng) > 2.5 {
            let sign = if self.noise.sample(&mut self.rng) > 0.0 {
                1.0
            } else {
                -1.0
            };
            let jump = sign * self.price * 0.005;
            self.price += jump;
            debug!(jump, price = self.price, "outsized move injected");
        }
        self.price
    }

    fn next_volume(&mut self) -> f64 {
        self.rng.gen_range(1_000.0..10_000.0)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    time::init_clock();

    let args = Args::parse();
    info!("starting market data simulator");

    let config = SystemConfig::from_file(&args.config)
        .with_context(|| format!("failed to load configuration from {:?}", args.config))?;
    config.validate().context("invalid configuration")?;

    let driver = LaneDriver::new();
    let publisher = driver
        .publisher(&config.aeron.market_data.address())
        .context("failed to connect to the tick lane (is the trading system running?)")?;

    let running = Arc::new(AtomicBool::new(true));
    let stop_flag = Arc::clone(&running);
    let rate = args.rate.max(1);
    let symbol = Symbol::new(&args.symbol);

    info!(rate, symbol = %args.symbol, "simulation starting");
    let generator_task =
        tokio::task::spawn_blocking(move || publish_loop(publisher, symbol, rate, stop_flag));

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    info!("received SIGINT, stopping simulator");
    running.store(false, Ordering::Release);

    let sent = generator_task.await.context("simulator task panicked")?;
    info!(sent, "market data simulation stopped");
    Ok(())
}

fn publish_loop(
    mut publisher: impl LanePublisher,
    symbol: Symbol,
    rate: u32,
    running: Arc<AtomicBool>,
) -> u64 {
    let mut walk = RandomWalk::new();
    let interval = Duration::from_micros(1_000_000 / rate as u64);
    let mut next_send = Instant::now();
    let mut sent: u64 = 0;
    let mut dropped: u64 = 0;

    while running.load(Ordering::Acquire) {
        let tick = TickMessage::new(
            time::now_ns(),
            walk.next_price(),
            walk.next_volume(),
            symbol,
        );

        match publisher.offer(tick.as_bytes()) {
            OfferOutcome::Ok(_) => {
                sent += 1;
                if sent % 1_000 == 0 {
                    info!(sent, price = tick.price, "simulation progress");
                }
            }
            OfferOutcome::BackPressured => {
                dropped += 1;
                // Give the consumer a moment; the tick itself is gone.
                std::thread::sleep(Duration::from_micros(1));
            }
            OfferOutcome::NotConnected => {
                dropped += 1;
                warn!("tick lane not connected, dropping tick");
            }
            OfferOutcome::Closed => {
                warn!("tick lane closed, stopping simulation");
                break;
            }
        }

        next_send += interval;
        let now = Instant::now();
        if next_send > now {
            std::thread::sleep(next_send - now);
        } else {
            // Fell behind; resynchronize instead of bursting.
            next_send = now;
        }
    }

    if dropped > 0 {
        info!(dropped, "ticks dropped during simulation");
    }
    sent
}
