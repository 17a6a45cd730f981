use crate::models::Bar;
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Market scenario types for synthetic data generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketScenario {
    /// Steady uptrend with noise (+2% daily average)
    Uptrend,
    /// Steady downtrend with noise (-2% daily average)
    Downtrend,
    /// Mean-reverting chop (±1% around the start price)
    Sideways,
    /// ±5% swings per bar
    Volatile,
    /// Slow climb, then a 45% drop over a handful of bars
    Crash,
}

impl MarketScenario {
    pub const ALL: [MarketScenario; 5] = [
        MarketScenario::Uptrend,
        MarketScenario::Downtrend,
        MarketScenario::Sideways,
        MarketScenario::Volatile,
        MarketScenario::Crash,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MarketScenario::Uptrend => "uptrend",
            MarketScenario::Downtrend => "downtrend",
            MarketScenario::Sideways => "sideways",
            MarketScenario::Volatile => "volatile",
            MarketScenario::Crash => "crash",
        }
    }
}

/// Reproducible close-price series for backtests
pub struct SyntheticDataGenerator {
    rng: StdRng,
    base_price: f64,
}

impl SyntheticDataGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            base_price: 0.00002,
        }
    }

    pub fn with_base_price(mut self, base_price: f64) -> Self {
        self.base_price = base_price;
        self
    }

    /// Generate `num_bars` bars spaced `interval_minutes` apart, ending now
    pub fn generate(&mut self, scenario: MarketScenario, num_bars: usize, interval_minutes: i64) -> Vec<Bar> {
        let start_time = Utc::now() - Duration::minutes(num_bars as i64 * interval_minutes);
        let bars_per_day = (24.0 * 60.0 / interval_minutes.max(1) as f64).max(1.0);

        let mut bars = Vec::with_capacity(num_bars);
        let mut price = self.base_price;
        let crash_start = num_bars * 2 / 3;

        for i in 0..num_bars {
            let step = match scenario {
                MarketScenario::Uptrend => 0.02 / bars_per_day + self.rng.gen_range(-0.001..0.001),
                MarketScenario::Downtrend => -0.02 / bars_per_day + self.rng.gen_range(-0.001..0.001),
                MarketScenario::Sideways => {
                    let reversion = (self.base_price - price) / price * 0.1;
                    reversion + self.rng.gen_range(-0.01..0.01)
                }
                MarketScenario::Volatile => self.rng.gen_range(-0.05..0.05),
                MarketScenario::Crash => {
                    if i >= crash_start && i < crash_start + 5 {
                        -0.11
                    } else {
                        self.rng.gen_range(-0.003..0.006)
                    }
                }
            };

            if i > 0 {
                price *= 1.0 + step;
            }
            // keep closes strictly positive
            price = price.max(self.base_price * 0.05);

            let timestamp = start_time + Duration::minutes(i as i64 * interval_minutes);
            bars.push(self.create_bar(price, timestamp, bars.last()));
        }

        bars
    }

    fn create_bar(&self, price: f64, timestamp: DateTime<Utc>, previous: Option<&Bar>) -> Bar {
        let close = Decimal::from_f64(price)
            .map(|d| d.round_dp(12))
            .filter(|d| *d > Decimal::ZERO)
            .or_else(|| previous.map(|b| b.close))
            .unwrap_or(Decimal::ONE);
        Bar::new(timestamp, close)
    }
}
