use crate::config::EngineConfig;
use crate::models::{Bar, Signal};
use rust_decimal::Decimal;

/// Default double-down dip as a multiple of the largest adjusted threshold
const DOUBLE_DOWN_FACTOR: Decimal = Decimal::from_parts(3, 0, 0, false, 0);

/// Configuration for dip/spike signal generation
#[derive(Debug, Clone)]
pub struct SignalConfig {
    /// Base dip thresholds, scaled up by average volatility
    pub buy_thresholds: Vec<Decimal>,
    pub ratio: Decimal,
    /// Absolute bar move that emits a sell
    pub sell_spike: Decimal,
    pub double_down_dip: Option<Decimal>,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self::from_engine(&EngineConfig::default())
    }
}

impl SignalConfig {
    pub fn from_engine(config: &EngineConfig) -> Self {
        Self {
            buy_thresholds: config.buy_thresholds.clone(),
            ratio: config.ratio,
            sell_spike: config.sell_spike,
            double_down_dip: config.double_down_dip,
        }
    }

    /// `base * (1 + avg_volatility * ratio)` for every base threshold
    pub fn adjusted_thresholds(&self, avg_volatility: Decimal) -> Vec<Decimal> {
        let scale = Decimal::ONE + avg_volatility * self.ratio;
        self.buy_thresholds.iter().map(|t| *t * scale).collect()
    }
}

/// `|close / previous - 1|`; zero when the previous close is not positive
pub fn bar_volatility(previous: Decimal, close: Decimal) -> Decimal {
    if previous <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (close / previous - Decimal::ONE).abs()
}

/// Mean bar-over-bar volatility, bar 0 excluded
pub fn average_volatility(bars: &[Bar]) -> Decimal {
    if bars.len() < 2 {
        return Decimal::ZERO;
    }
    let total: Decimal = bars
        .windows(2)
        .map(|pair| bar_volatility(pair[0].close, pair[1].close))
        .sum();
    total / Decimal::from(bars.len() - 1)
}

/// Fill in `volatility` and `signal` for a raw close series
///
/// Returns the adjusted thresholds the signals were derived from.
pub fn annotate(bars: &mut [Bar], config: &SignalConfig) -> Vec<Decimal> {
    let thresholds = config.adjusted_thresholds(average_volatility(bars));
    let double_down_dip = config.double_down_dip.unwrap_or_else(|| {
        thresholds.iter().copied().max().unwrap_or(Decimal::ZERO) * DOUBLE_DOWN_FACTOR
    });

    if let Some(first) = bars.first_mut() {
        first.volatility = Decimal::ZERO;
        first.signal = Signal::NONE;
    }

    for i in 1..bars.len() {
        let previous = bars[i - 1].close;
        let close = bars[i].close;

        let bar = &mut bars[i];
        bar.volatility = bar_volatility(previous, close);
        bar.signal = classify(previous, close, &thresholds, double_down_dip, config.sell_spike);
    }

    tracing::debug!(
        "Annotated {} bars, adjusted thresholds {:?}, double-down dip {}",
        bars.len(),
        thresholds,
        double_down_dip
    );

    thresholds
}

fn classify(
    previous: Decimal,
    close: Decimal,
    thresholds: &[Decimal],
    double_down_dip: Decimal,
    sell_spike: Decimal,
) -> Signal {
    if previous <= Decimal::ZERO {
        return Signal::NONE;
    }

    let change = (close - previous) / previous;
    if change.abs() >= sell_spike {
        return Signal::SELL;
    }

    let dip = -change;
    if double_down_dip > Decimal::ZERO && dip >= double_down_dip {
        return Signal::DOUBLE_DOWN;
    }
    if thresholds.iter().any(|t| dip >= *t) {
        return Signal::BUY;
    }
    Signal::NONE
}
