pub mod validate;

pub use validate::validate_config;

use crate::error::ConfigError;
use crate::regime::{MarketType, RegimeEntry, RegimeTable, Timeframe};
use crate::risk::StopRules;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment prefix for overrides, e.g. `MIDAS__ENGINE__FUND=25000`
const ENV_PREFIX: &str = "MIDAS";

/// Parameters of a single simulation run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub stop_loss: Decimal,
    pub trailing_stop: Decimal,
    /// Initial capital
    pub fund: Decimal,
    /// Base dip thresholds before volatility adjustment
    pub buy_thresholds: Vec<Decimal>,
    /// Volatility scaling applied to the dip thresholds
    pub ratio: Decimal,
    pub cycle_hours: u32,
    pub spectrum: String,
    pub sell_strategy: String,
    pub timeframe: Timeframe,
    pub market_type: MarketType,
    pub reallocation_fraction: Decimal,
    pub reallocation_gain_threshold: Decimal,
    pub double_down_multiplier: Decimal,
    pub safety_ratio: Decimal,
    /// Absolute bar move that emits a sell signal
    pub sell_spike: Decimal,
    /// Dip size that emits a double-down buy; defaults to 3x the largest adjusted threshold
    pub double_down_dip: Option<Decimal>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stop_loss: dec!(0.05),
            trailing_stop: dec!(0.03),
            fund: dec!(10000),
            buy_thresholds: vec![dec!(0.001), dec!(0.002), dec!(0.005), dec!(0.008)],
            ratio: dec!(10),
            cycle_hours: 24,
            spectrum: "main".to_string(),
            sell_strategy: "main_first".to_string(),
            timeframe: Timeframe::Daily,
            market_type: MarketType::Small,
            reallocation_fraction: dec!(0.25),
            reallocation_gain_threshold: dec!(0.05),
            double_down_multiplier: dec!(2),
            safety_ratio: dec!(0.1),
            sell_spike: dec!(0.40),
            double_down_dip: None,
        }
    }
}

impl EngineConfig {
    pub fn stop_rules(&self) -> StopRules {
        StopRules::new(self.stop_loss, self.trailing_stop)
    }
}

/// Tracked instrument with its expected per-bar swing baseline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentConfig {
    pub symbol: String,
    pub expected_swing: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketDataConfig {
    pub base_url: String,
    pub period_days: u32,
    pub interval: String,
    pub rate_limit_rpm: u32,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.binance.us".to_string(),
            period_days: 90,
            interval: "1h".to_string(),
            rate_limit_rpm: 600,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayMode {
    #[default]
    Paper,
    Live,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub mode: GatewayMode,
    pub base_url: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            mode: GatewayMode::Paper,
            base_url: "https://api.binance.us".to_string(),
        }
    }
}

/// Complete startup configuration; immutable once validated
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MidasConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    pub regimes: Vec<RegimeEntry>,
    pub instruments: Vec<InstrumentConfig>,
    #[serde(default)]
    pub market_data: MarketDataConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
}

impl MidasConfig {
    /// Expected swing baseline for an instrument
    pub fn expected_swing(&self, symbol: &str) -> Result<Decimal, ConfigError> {
        self.instruments
            .iter()
            .find(|i| i.symbol == symbol)
            .map(|i| i.expected_swing)
            .ok_or_else(|| ConfigError::MissingSwingBaseline(symbol.to_string()))
    }

    pub fn regime_table(&self) -> Result<RegimeTable, ConfigError> {
        RegimeTable::from_entries(&self.regimes)
    }

    pub fn symbols(&self) -> Vec<String> {
        self.instruments.iter().map(|i| i.symbol.clone()).collect()
    }
}

/// Load the TOML config file, apply `MIDAS__*` environment overrides and validate
///
/// # Arguments
/// * `path` - Path to the config file (e.g. `config/midas.toml`)
pub fn load_config(path: &Path) -> Result<MidasConfig, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    let cfg: MidasConfig = settings.try_deserialize()?;
    validate_config(&cfg)?;

    tracing::info!(
        "Loaded config from {}: {} instruments, {} regime entries",
        path.display(),
        cfg.instruments.len(),
        cfg.regimes.len()
    );

    Ok(cfg)
}
