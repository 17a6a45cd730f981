// Regime classification and parameter lookup
pub mod table;

pub use table::{RegimeEntry, RegimeParams, RegimeTable};

use crate::models::Bar;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Mean volatility must exceed the expected swing by this factor to count as high-vol
pub const HIGH_VOL_FACTOR: Decimal = Decimal::from_parts(15, 0, 0, false, 1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketType {
    Small,
    Medium,
    Large,
}

impl MarketType {
    pub const ALL: [MarketType; 3] = [MarketType::Small, MarketType::Medium, MarketType::Large];

    pub fn as_str(&self) -> &'static str {
        match self {
            MarketType::Small => "small",
            MarketType::Medium => "medium",
            MarketType::Large => "large",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    Hourly,
    Daily,
    Weekly,
}

impl Timeframe {
    pub const ALL: [Timeframe; 3] = [Timeframe::Hourly, Timeframe::Daily, Timeframe::Weekly];

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::Hourly => "hourly",
            Timeframe::Daily => "daily",
            Timeframe::Weekly => "weekly",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolatilityBucket {
    Normal,
    High,
}

impl VolatilityBucket {
    pub const ALL: [VolatilityBucket; 2] = [VolatilityBucket::Normal, VolatilityBucket::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            VolatilityBucket::Normal => "normal",
            VolatilityBucket::High => "high",
        }
    }

    /// Classify a whole series against the instrument's expected swing
    ///
    /// High when `mean(volatility) > expected_swing * 1.5`. An empty series is Normal.
    pub fn classify(bars: &[Bar], expected_swing: Decimal) -> Self {
        if bars.is_empty() {
            return VolatilityBucket::Normal;
        }

        let total: Decimal = bars.iter().map(|b| b.volatility).sum();
        let mean = total / Decimal::from(bars.len());

        if mean > expected_swing * HIGH_VOL_FACTOR {
            VolatilityBucket::High
        } else {
            VolatilityBucket::Normal
        }
    }
}

/// (market type, timeframe, volatility bucket) key selecting sizing/ratio parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegimeKey {
    pub market_type: MarketType,
    pub timeframe: Timeframe,
    pub volatility: VolatilityBucket,
}

impl RegimeKey {
    pub fn new(market_type: MarketType, timeframe: Timeframe, volatility: VolatilityBucket) -> Self {
        Self {
            market_type,
            timeframe,
            volatility,
        }
    }

    /// Every key the table must cover
    pub fn all() -> impl Iterator<Item = RegimeKey> {
        MarketType::ALL.into_iter().flat_map(|market_type| {
            Timeframe::ALL.into_iter().flat_map(move |timeframe| {
                VolatilityBucket::ALL
                    .into_iter()
                    .map(move |volatility| RegimeKey::new(market_type, timeframe, volatility))
            })
        })
    }
}

impl Serialize for RegimeKey {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl fmt::Display for RegimeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.market_type.as_str(),
            self.timeframe.as_str(),
            self.volatility.as_str()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use chrono::Utc;

    fn bars_with_volatility(values: &[Decimal]) -> Vec<Bar> {
        values
            .iter()
            .map(|v| Bar::new(Utc::now(), dec!(1)).with_volatility(*v))
            .collect()
    }

    #[test]
    fn test_classify_high_volatility() {
        // mean = 0.05, threshold = 0.02 * 1.5 = 0.03
        let bars = bars_with_volatility(&[dec!(0.04), dec!(0.06)]);
        assert_eq!(VolatilityBucket::classify(&bars, dec!(0.02)), VolatilityBucket::High);
    }

    #[test]
    fn test_classify_boundary_is_normal() {
        // mean exactly at threshold is not "greater than"
        let bars = bars_with_volatility(&[dec!(0.03), dec!(0.03)]);
        assert_eq!(VolatilityBucket::classify(&bars, dec!(0.02)), VolatilityBucket::Normal);
    }

    #[test]
    fn test_classify_empty_series() {
        assert_eq!(VolatilityBucket::classify(&[], dec!(0.02)), VolatilityBucket::Normal);
    }

    #[test]
    fn test_all_keys_enumerated() {
        let keys: Vec<_> = RegimeKey::all().collect();
        assert_eq!(keys.len(), 18);
        assert_eq!(keys[0].to_string(), "small/hourly/normal");
    }
}
