use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Signal intensity attached to a bar
///
/// 0 = none, >= 1 = buy, exactly -1 = sell, |s| >= 6 = double-down intensity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Signal(pub Decimal);

impl Signal {
    pub const NONE: Signal = Signal(Decimal::ZERO);
    pub const BUY: Signal = Signal(Decimal::ONE);
    pub const SELL: Signal = Signal(Decimal::NEGATIVE_ONE);
    pub const DOUBLE_DOWN: Signal = Signal(Decimal::from_parts(6, 0, 0, false, 0));

    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_buy(&self) -> bool {
        self.0 >= Decimal::ONE
    }

    /// Only an exact -1 schedules a sell
    pub fn is_sell(&self) -> bool {
        self.0 == Decimal::NEGATIVE_ONE
    }

    pub fn is_double_down_buy(&self) -> bool {
        self.0 >= Self::DOUBLE_DOWN.0
    }

    /// Magnitude check used when scaling realized profit
    pub fn is_double_down(&self) -> bool {
        self.0.abs() >= Self::DOUBLE_DOWN.0
    }
}

impl From<i32> for Signal {
    fn from(value: i32) -> Self {
        Self(Decimal::from(value))
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One time-indexed price/signal/volatility observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub close: Decimal,
    pub signal: Signal,
    pub volatility: Decimal,
}

impl Bar {
    /// Bare price bar with no signal or volatility attached yet
    pub fn new(timestamp: DateTime<Utc>, close: Decimal) -> Self {
        Self {
            timestamp,
            close,
            signal: Signal::NONE,
            volatility: Decimal::ZERO,
        }
    }

    pub fn with_signal(mut self, signal: impl Into<Signal>) -> Self {
        self.signal = signal.into();
        self
    }

    pub fn with_volatility(mut self, volatility: Decimal) -> Self {
        self.volatility = volatility;
        self
    }
}

/// Order side sent to the exchange gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "BUY",
            OrderSide::Sell => "SELL",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Converts a dashed ticker (`SHIB-USD`) into an exchange symbol (`SHIBUSD`)
pub fn exchange_symbol(ticker: &str) -> String {
    ticker.replace('-', "")
}
