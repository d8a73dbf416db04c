//! # System Configuration
//!
//! JSON configuration for the trading process: lane bindings for the
//! three stages, DC strategy parameters, strategy settings, execution
//! settings, and performance reporting. Every section and key has a
//! production default, so a partial file (or `Default::default()`)
//! yields a runnable system; `validate()` is the single gate between
//! loading and wiring the stages.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tickflow_transport::LaneAddress;

/// Complete configuration for the trading system.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Lane bindings, one per stage input.
    pub aeron: LaneSection,
    /// DC detector parameters.
    pub dc_strategy: DcStrategyConfig,
    /// Strategy engine parameters.
    pub strategy_settings: StrategySettings,
    /// Execution engine parameters.
    pub execution: ExecutionConfig,
    /// Performance reporting parameters.
    pub performance: PerformanceConfig,
}

/// The three lane bindings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LaneSection {
    /// Tick lane (simulator → MDP).
    pub market_data: LaneConfig,
    /// DC signal lane (MDP → SE).
    pub strategy: LaneConfig,
    /// Order lane (SE → EE).
    pub execution: LaneConfig,
}

impl Default for LaneSection {
    fn default() -> Self {
        Self {
            market_data: LaneConfig::with_stream_id(1001),
            strategy: LaneConfig::with_stream_id(1002),
            execution: LaneConfig::with_stream_id(1003),
        }
    }
}

/// One lane binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LaneConfig {
    pub channel: String,
    pub stream_id: i32,
    pub directory: PathBuf,
    /// How long the initial endpoint connect may wait.
    pub timeout_ms: u64,
}

impl LaneConfig {
    fn with_stream_id(stream_id: i32) -> Self {
        Self {
            stream_id,
            ..Default::default()
        }
    }

    pub fn address(&self) -> LaneAddress {
        LaneAddress::new(
            self.channel.clone(),
            self.stream_id,
            self.directory.clone(),
            self.timeout_ms,
        )
    }
}

impl Default for LaneConfig {
    fn default() -> Self {
        Self {
            channel: "ipc".to_string(),
            stream_id: 1001,
            directory: PathBuf::from("/tmp/tickflow"),
            timeout_ms: 5000,
        }
    }
}

/// DC detector parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DcStrategyConfig {
    /// Relative reversal threshold.
    pub theta: f64,
    /// Reserved; must be true.
    pub enable_tmv_calculation: bool,
    /// Reserved; must be true.
    pub enable_time_adjustment: bool,
}

impl Default for DcStrategyConfig {
    fn default() -> Self {
        Self {
            theta: tickflow_dc::DEFAULT_THETA,
            enable_tmv_calculation: true,
            enable_time_adjustment: true,
        }
    }
}

/// Strategy engine parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategySettings {
    pub name: String,
    /// Multiplier on the base order quantity.
    pub leverage_factor: f64,
    /// Enables the volatility-regime quantity modifier.
    pub enable_hmm: bool,
}

impl Default for StrategySettings {
    fn default() -> Self {
        Self {
            name: "dc-baseline".to_string(),
            leverage_factor: 1.0,
            enable_hmm: false,
        }
    }
}

/// Execution engine parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// true → simulated fills; false → live placeholder.
    pub simulation_mode: bool,
    pub initial_capital: f64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            simulation_mode: true,
            initial_capital: 100_000.0,
        }
    }
}

/// Performance reporting parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    pub enable_latency_tracking: bool,
    /// When set, the final performance report is written to
    /// `output_file` at shutdown.
    pub enable_performance_metrics: bool,
    pub output_file: PathBuf,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            enable_latency_tracking: true,
            enable_performance_metrics: true,
            output_file: PathBuf::from("performance_report.json"),
        }
    }
}

impl SystemConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {:?}: {}", path, e))?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| anyhow::anyhow!("failed to parse config file {:?}: {}", path, e))?;
        Ok(config)
    }

    /// Validate parameter ranges and reserved flags.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.dc_strategy.theta.is_finite() || self.dc_strategy.theta <= 0.0 {
            anyhow::bail!(
                "dc_strategy.theta must be a finite positive number, got {}",
                self.dc_strategy.theta
            );
        }
        if !self.dc_strategy.enable_tmv_calculation || !self.dc_strategy.enable_time_adjustment {
            anyhow::bail!(
                "dc_strategy.enable_tmv_calculation and enable_time_adjustment are reserved and must be true"
            );
        }
        if !self.strategy_settings.leverage_factor.is_finite()
            || self.strategy_settings.leverage_factor <= 0.0
        {
            anyhow::bail!(
                "strategy_settings.leverage_factor must be positive, got {}",
                self.strategy_settings.leverage_factor
            );
        }
        if !self.execution.initial_capital.is_finite() || self.execution.initial_capital <= 0.0 {
            anyhow::bail!(
                "execution.initial_capital must be positive, got {}",
                self.execution.initial_capital
            );
        }
        for (name, lane) in [
            ("market_data", &self.aeron.market_data),
            ("strategy", &self.aeron.strategy),
            ("execution", &self.aeron.execution),
        ] {
            if lane.channel.is_empty() {
                anyhow::bail!("aeron.{}.channel must not be empty", name);
            }
        }
        Ok(())
    }
}
