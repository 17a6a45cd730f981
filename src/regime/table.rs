use super::{MarketType, RegimeKey, Timeframe, VolatilityBucket};
use crate::error::ConfigError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Number of partial entries the outer band is split into
const OUTER_BAND_SPLITS: u32 = 3;

/// One row of the regime table as it appears in configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegimeEntry {
    pub market_type: MarketType,
    pub timeframe: Timeframe,
    pub volatility: VolatilityBucket,
    pub outer_trade_size: Decimal,
    pub cascade_ratio: Decimal,
}

impl RegimeEntry {
    pub fn key(&self) -> RegimeKey {
        RegimeKey::new(self.market_type, self.timeframe, self.volatility)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegimeParams {
    pub outer_trade_size: Decimal,
    pub cascade_ratio: Decimal,
}

impl RegimeParams {
    /// Outer band divided into three, leaving room for up to three partial entries
    pub fn base_trade_size(&self) -> Decimal {
        self.outer_trade_size / Decimal::from(OUTER_BAND_SPLITS)
    }
}

/// Immutable sizing/cascade lookup keyed by regime
///
/// Built once from configuration and validated exhaustively; shared read-only across runs.
#[derive(Debug, Clone)]
pub struct RegimeTable {
    entries: HashMap<RegimeKey, RegimeParams>,
}

impl RegimeTable {
    /// Build the table, rejecting duplicates, out-of-range values and missing keys
    pub fn from_entries(entries: &[RegimeEntry]) -> Result<Self, ConfigError> {
        let mut errors = Vec::new();
        let mut map = HashMap::with_capacity(entries.len());

        for entry in entries {
            let key = entry.key();

            if entry.outer_trade_size <= Decimal::ZERO {
                errors.push(format!(
                    "regimes[{key}]: outer_trade_size must be > 0, got {}",
                    entry.outer_trade_size
                ));
            }
            if entry.cascade_ratio < Decimal::ZERO || entry.cascade_ratio > Decimal::ONE {
                errors.push(format!(
                    "regimes[{key}]: cascade_ratio must be in [0, 1], got {}",
                    entry.cascade_ratio
                ));
            }

            let params = RegimeParams {
                outer_trade_size: entry.outer_trade_size,
                cascade_ratio: entry.cascade_ratio,
            };
            if map.insert(key, params).is_some() {
                errors.push(format!("regimes[{key}]: duplicate entry"));
            }
        }

        for key in RegimeKey::all() {
            if !map.contains_key(&key) {
                errors.push(format!("regimes: missing entry for {key}"));
            }
        }

        if !errors.is_empty() {
            return Err(ConfigError::Invalid(errors));
        }

        Ok(Self { entries: map })
    }

    pub fn params(&self, key: RegimeKey) -> Result<RegimeParams, ConfigError> {
        self.entries
            .get(&key)
            .copied()
            .ok_or_else(|| ConfigError::MissingRegime(key.to_string()))
    }

    /// Outer-band trade size for a regime
    pub fn trade_size(&self, key: RegimeKey) -> Result<Decimal, ConfigError> {
        Ok(self.params(key)?.outer_trade_size)
    }

    pub fn cascade_ratio(&self, key: RegimeKey) -> Result<Decimal, ConfigError> {
        Ok(self.params(key)?.cascade_ratio)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
